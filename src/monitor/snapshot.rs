use crate::prelude::*;
use crate::sys::ProcessProbe;
use itertools::Itertools;
use std::collections::BTreeMap;

/// Executable-name fragments that mark a listening process as dev-server-like.
/// Matched case-insensitively as substrings of the lsof command name.
const DEV_SERVER_NAMES: &[&str] = &[
    "node", "deno", "bun", "npm", "pnpm", "yarn", "vite", "next", "nuxt", "astro", "remix",
    "webpack", "esbuild", "turbo", "parcel", "storybook", "python", "uvicorn", "gunicorn", "flask",
    "ruby", "puma", "rails", "php", "java", "gradle", "dotnet", "cargo", "air", "caddy", "serve",
    "http-server", "ngrok", "hugo", "jekyll", "mkdocs",
];

fn is_dev_server(name: &str) -> bool {
    let normalized = name.to_lowercase();
    DEV_SERVER_NAMES
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

/// One coalesced snapshot entry: a listening process and every port it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub pid: u32,
    pub name: String,
    pub ports: Vec<u16>,
}

/// Capture the current set of listening dev-server-like processes.
///
/// Multiple listening sockets for one pid coalesce into a single entry with a
/// deduplicated, sorted port list. A failing underlying query degrades to an
/// empty snapshot with a warning; this function never fails.
pub async fn capture(probe: &dyn ProcessProbe) -> Vec<SnapshotEntry> {
    let sockets = match probe.listening_sockets().await {
        Ok(sockets) => sockets,
        Err(err) => {
            warn!("listening-socket scan failed: {err:#}");
            return Vec::new();
        }
    };

    let mut by_pid: BTreeMap<u32, SnapshotEntry> = BTreeMap::new();
    for socket in sockets {
        by_pid
            .entry(socket.pid)
            .or_insert_with(|| SnapshotEntry {
                pid: socket.pid,
                name: socket.name.clone(),
                ports: Vec::new(),
            })
            .ports
            .push(socket.port);
    }

    by_pid
        .into_values()
        .update(|entry| {
            entry.ports.sort_unstable();
            entry.ports.dedup();
        })
        .filter(|entry| is_dev_server(&entry.name))
        .collect()
}
