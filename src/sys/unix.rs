//! Production probe backed by the Unix process-table tools.
//!
//! `lsof` enumerates listening sockets and working directories, `ps` answers
//! the batched identity/metrics queries, `pgrep` enumerates direct children,
//! and signals go straight through `nix`. Tools are resolved from `PATH` so
//! the same binary works against macOS and Linux process tables.

use crate::prelude::*;
use crate::sys::{
    IdentityRow, ListeningSocket, MetricsRow, ProcessProbe, SignalClass, parser,
};
use async_trait::async_trait;
use itertools::Itertools;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::process::Command;

pub struct UnixProbe;

impl UnixProbe {
    pub fn new() -> Self {
        Self
    }
}

/// Run a command and capture stdout. `ps`, `lsof` and `pgrep` all exit
/// nonzero when the result set is empty, so the exit status is ignored and
/// only a failure to spawn is an error.
async fn capture_stdout(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("failed to run {program}"))?;

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl From<SignalClass> for Signal {
    fn from(class: SignalClass) -> Self {
        match class {
            SignalClass::Graceful => Signal::SIGTERM,
            SignalClass::Forceful => Signal::SIGKILL,
        }
    }
}

#[async_trait]
impl ProcessProbe for UnixProbe {
    async fn listening_sockets(&self) -> Result<Vec<ListeningSocket>> {
        let output = capture_stdout("lsof", &["-iTCP", "-sTCP:LISTEN", "-P", "-n"]).await?;

        let sockets = output
            .lines()
            .skip(1) // header
            .filter_map(|line| match parser::parse_listening_line(line) {
                Ok(socket) => Some(socket),
                Err(err) => {
                    trace!("dropping lsof line {line:?}: {err}");
                    None
                }
            })
            .collect();

        Ok(sockets)
    }

    async fn identity_batch(&self, pids: &[u32]) -> Result<Vec<IdentityRow>> {
        if pids.is_empty() {
            return Ok(Vec::new());
        }

        let pid_list = pids.iter().join(",");
        let output = capture_stdout(
            "ps",
            &["-p", &pid_list, "-o", "pid=,ppid=,%cpu=,rss=,etime=,args="],
        )
        .await?;

        Ok(drop_unparsable(&output, parser::parse_identity_line))
    }

    async fn metrics_batch(&self, pids: &[u32]) -> Result<Vec<MetricsRow>> {
        if pids.is_empty() {
            return Ok(Vec::new());
        }

        let pid_list = pids.iter().join(",");
        let output =
            capture_stdout("ps", &["-p", &pid_list, "-o", "pid=,%cpu=,rss=,etime="]).await?;

        Ok(drop_unparsable(&output, parser::parse_metrics_line))
    }

    async fn parent_of(&self, pid: u32) -> Result<Option<(u32, String)>> {
        let output = capture_stdout("ps", &["-p", &pid.to_string(), "-o", "ppid=,comm="]).await?;
        if output.trim().is_empty() {
            return Ok(None);
        }

        match parser::parse_parent_line(&output) {
            Ok(parent) => Ok(Some(parent)),
            Err(err) => {
                trace!("dropping ps parent output for pid {pid}: {err}");
                Ok(None)
            }
        }
    }

    async fn children_of(&self, pid: u32) -> Result<Vec<u32>> {
        let output = capture_stdout("pgrep", &["-P", &pid.to_string()]).await?;
        Ok(parser::parse_pid_lines(&output))
    }

    fn is_running(&self, pid: u32) -> bool {
        // Signal 0 probes for existence without delivering anything. EPERM
        // still means the pid exists, it just belongs to someone else.
        match kill(Pid::from_raw(pid as i32), None) {
            Ok(()) => true,
            Err(nix::errno::Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    fn send_signal(&self, pid: u32, class: SignalClass) -> Result<()> {
        kill(Pid::from_raw(pid as i32), Signal::from(class))
            .with_context(|| format!("failed to signal pid {pid}"))
    }

    async fn cwd_of(&self, pid: u32) -> Option<String> {
        let output = capture_stdout("lsof", &["-a", "-p", &pid.to_string(), "-d", "cwd", "-Fn"])
            .await
            .ok()?;
        parser::parse_cwd_records(&output)
    }
}

/// Parse every line of a batched ps result, dropping the ones that do not
/// match the expected shape.
fn drop_unparsable<T>(output: &str, parse: impl Fn(&str) -> Result<T>) -> Vec<T> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse(line) {
            Ok(row) => Some(row),
            Err(err) => {
                trace!("dropping ps line {line:?}: {err}");
                None
            }
        })
        .collect()
}
