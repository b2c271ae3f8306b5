use crate::monitor::details::rss_kb_to_mb;
use crate::monitor::helpers::etime::format_uptime;
use crate::monitor::interfaces::ProcessRecord;
use crate::monitor::snapshot::SnapshotEntry;
use crate::sys::MetricsRow;
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

/// The authoritative process cache: exactly one record per currently-live
/// matching pid. Owned by one monitoring session and mutated only from its
/// control loop.
#[derive(Debug, Default)]
pub struct ProcessCache {
    records: HashMap<u32, ProcessRecord>,
}

/// Per-tick classification of a fresh snapshot against the cache.
#[derive(Debug, Default)]
pub struct SnapshotDiff {
    /// In the snapshot but not in the cache: needs identity + ancestry.
    pub new: Vec<SnapshotEntry>,
    /// In the cache but not in the snapshot: evicted unconditionally.
    pub removed: Vec<u32>,
    /// In both: only volatile fields refresh.
    pub existing: Vec<u32>,
}

impl ProcessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff a fresh snapshot against the cached pid set.
    pub fn diff(&self, snapshot: &[SnapshotEntry]) -> SnapshotDiff {
        let snapshot_pids: HashSet<u32> = snapshot.iter().map(|entry| entry.pid).collect();

        let mut diff = SnapshotDiff::default();
        for entry in snapshot {
            if self.records.contains_key(&entry.pid) {
                diff.existing.push(entry.pid);
            } else {
                diff.new.push(entry.clone());
            }
        }
        diff.removed = self
            .records
            .keys()
            .filter(|pid| !snapshot_pids.contains(pid))
            .copied()
            .collect();

        diff
    }

    pub fn evict(&mut self, pids: &[u32]) {
        for pid in pids {
            self.records.remove(pid);
        }
    }

    pub fn insert(&mut self, record: ProcessRecord) {
        self.records.insert(record.pid, record);
    }

    /// Refresh volatile fields in place from one metrics batch. Static fields
    /// and the group key are untouched; pids missing from the batch are left
    /// alone (eviction is snapshot-driven, not metrics-driven).
    pub fn refresh_volatile(&mut self, rows: Vec<MetricsRow>) {
        let now = SystemTime::now();
        for row in rows {
            if let Some(record) = self.records.get_mut(&row.pid) {
                record.cpu = row.cpu;
                record.memory_mb = rss_kb_to_mb(row.rss_kb);
                record.uptime =
                    format_uptime(now.duration_since(record.started_at).unwrap_or_default());
            }
        }
    }

    /// Patch the working directory of a cached record. Idempotent and keyed by
    /// pid: patches for evicted pids land on nothing. Returns whether a record
    /// changed.
    pub fn patch_cwd(&mut self, pid: u32, cwd: String) -> bool {
        match self.records.get_mut(&pid) {
            Some(record) if record.cwd != cwd => {
                record.cwd = cwd;
                true
            }
            _ => false,
        }
    }

    /// Recompute every uptime label from the stored start timestamps. Purely
    /// local: no process-table queries are involved.
    pub fn refresh_uptime_labels(&mut self) {
        let now = SystemTime::now();
        for record in self.records.values_mut() {
            record.uptime =
                format_uptime(now.duration_since(record.started_at).unwrap_or_default());
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
impl ProcessCache {
    pub fn get(&self, pid: u32) -> Option<&ProcessRecord> {
        self.records.get(&pid)
    }
}
