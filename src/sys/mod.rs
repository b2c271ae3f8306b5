use crate::prelude::*;
use async_trait::async_trait;

pub mod parser;
pub mod unix;

#[cfg(test)]
pub mod fake;

/// One listening TCP socket, as reported by the socket enumerator. A process
/// listening on several ports yields several entries with the same pid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListeningSocket {
    pub pid: u32,
    pub name: String,
    pub port: u16,
}

/// Identity row for a freshly discovered pid: everything needed to build a
/// process record in a single batched query.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityRow {
    pub pid: u32,
    pub ppid: u32,
    pub cpu: f32,
    pub rss_kb: u64,
    pub etime: String,
    pub command: String,
}

/// Metrics-only row for an already-known pid.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    pub pid: u32,
    pub cpu: f32,
    pub rss_kb: u64,
    pub etime: String,
}

/// Two-tier termination request: a cooperative exit request first, then a
/// compelled, non-ignorable termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalClass {
    Graceful,
    Forceful,
}

/// The single seam between the process-state engine and the operating system.
///
/// All process-table queries the engine issues go through this trait, so the
/// engine can be exercised against a scripted implementation in tests. The
/// production implementation is [`unix::UnixProbe`].
#[async_trait]
pub trait ProcessProbe: Send + Sync {
    /// All processes currently holding a listening TCP socket, one entry per
    /// (pid, port) pair.
    async fn listening_sockets(&self) -> Result<Vec<ListeningSocket>>;

    /// Identity fields for a batch of pids, in one query. Pids that exited
    /// since the caller observed them are silently absent from the result.
    async fn identity_batch(&self, pids: &[u32]) -> Result<Vec<IdentityRow>>;

    /// Volatile fields for a batch of already-known pids, in one query.
    async fn metrics_batch(&self, pids: &[u32]) -> Result<Vec<MetricsRow>>;

    /// `(parent pid, executable name)` of one pid, or `None` if it is gone.
    async fn parent_of(&self, pid: u32) -> Result<Option<(u32, String)>>;

    /// Immediate child pids of one pid; empty if none or unknown.
    async fn children_of(&self, pid: u32) -> Result<Vec<u32>>;

    /// Whether the pid currently exists in the process table.
    fn is_running(&self, pid: u32) -> bool;

    /// Request termination of one pid.
    fn send_signal(&self, pid: u32, class: SignalClass) -> Result<()>;

    /// Best-effort current working directory of one pid.
    async fn cwd_of(&self, pid: u32) -> Option<String>;
}
