use serde::Serialize;
use std::time::SystemTime;

/// Placeholder working directory shown until the background lookup resolves.
pub const CWD_PLACEHOLDER: &str = "~";

/// Identity of the terminal/IDE session that owns a process, resolved once at
/// discovery time and never re-resolved for the life of the pid in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GroupKey {
    pub name: String,
    pub icon: String,
    pub is_orphaned: bool,
}

impl GroupKey {
    /// Sentinel bucket for processes whose ancestry walk found no recognized
    /// owning application before reaching the process-tree root.
    pub fn detached() -> Self {
        Self {
            name: "Detached".to_string(),
            icon: "orphan-icon.png".to_string(),
            is_orphaned: true,
        }
    }
}

/// One cached listening process.
///
/// `ppid`, `name`, `command`, `started_at` and `group` are static: set once at
/// discovery and never overwritten. `cpu`, `memory_mb` and `uptime` are
/// volatile and refresh on every tick; `cwd` starts as [`CWD_PLACEHOLDER`] and
/// may be patched once the background lookup completes.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    pub command: String,
    pub cwd: String,
    pub ports: Vec<u16>,
    pub cpu: f32,
    pub memory_mb: u64,
    #[serde(skip)]
    pub started_at: SystemTime,
    pub uptime: String,
    pub group: GroupKey,
}

/// A session bucket produced by grouping: the owning application plus its
/// member records.
#[derive(Debug, Clone, Serialize)]
pub struct TerminalGroup {
    pub name: String,
    pub icon: String,
    pub is_orphaned: bool,
    pub processes: Vec<ProcessRecord>,
}
