use crate::monitor::interfaces::GroupKey;
use crate::prelude::*;
use crate::sys::ProcessProbe;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

struct TerminalApp {
    display_name: &'static str,
    icon: &'static str,
}

lazy_static! {
    /// Known terminal/IDE executables, keyed by the final path segment of
    /// their `comm` value.
    static ref TERMINAL_APPS: HashMap<&'static str, TerminalApp> = {
        let mut apps = HashMap::new();
        let mut register = |comms: &[&'static str], display_name, icon| {
            for comm in comms {
                apps.insert(*comm, TerminalApp { display_name, icon });
            }
        };

        register(&["Terminal"], "Terminal", "terminal.png");
        register(&["iTerm2"], "iTerm2", "iterm.png");
        register(&["WezTerm", "wezterm-gui"], "WezTerm", "wezterm.png");
        register(&["alacritty", "Alacritty"], "Alacritty", "alacritty.png");
        register(&["kitty"], "kitty", "kitty.png");
        register(&["ghostty", "Ghostty"], "Ghostty", "ghostty.png");
        register(&["Hyper"], "Hyper", "hyper.png");
        register(&["warp", "Warp"], "Warp", "warp.png");
        register(&["tmux", "tmux: server"], "tmux", "tmux.png");
        register(
            &["Code", "Code - Insiders", "Code Helper", "Code Helper (Plugin)"],
            "VS Code",
            "vscode.png",
        );
        register(&["Cursor", "Cursor Helper (Plugin)"], "Cursor", "cursor.png");
        register(&["zed", "Zed"], "Zed", "zed.png");
        register(&["idea"], "IntelliJ IDEA", "intellij.png");
        register(&["webstorm"], "WebStorm", "webstorm.png");
        register(&["pycharm"], "PyCharm", "pycharm.png");
        register(&["goland"], "GoLand", "goland.png");

        apps
    };
}

fn lookup_terminal(comm: &str) -> Option<&'static TerminalApp> {
    // comm can be a full executable path on macOS; match on its basename.
    let basename = comm.rsplit('/').next().unwrap_or(comm);
    TERMINAL_APPS.get(basename)
}

/// Walk the parent-pid chain upwards from `parent_pid` (the walk starts one
/// level above the candidate process) looking for a recognized terminal/IDE
/// application.
///
/// The walk stops at pid ≤ 1, on a cycle, or when a step yields no process;
/// exhaustion returns the `Detached` sentinel. The caller stores the result on
/// the record, so ancestry is resolved exactly once per discovered pid.
pub async fn resolve_owning_session(probe: &dyn ProcessProbe, parent_pid: u32) -> GroupKey {
    let mut visited: HashSet<u32> = HashSet::new();
    let mut current = parent_pid;

    while current > 1 && visited.insert(current) {
        let step = match probe.parent_of(current).await {
            Ok(step) => step,
            Err(err) => {
                warn!("ancestry query failed at pid {current}: {err:#}");
                break;
            }
        };

        let Some((ppid, comm)) = step else {
            break;
        };

        if let Some(app) = lookup_terminal(&comm) {
            return GroupKey {
                name: app.display_name.to_string(),
                icon: app.icon.to_string(),
                is_orphaned: false,
            };
        }

        current = ppid;
    }

    GroupKey::detached()
}
