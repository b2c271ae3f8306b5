use crate::prelude::*;
use crate::sys::ProcessProbe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub mod ancestry;
pub mod cache;
pub mod details;
pub mod grouping;
pub mod helpers;
pub mod interfaces;
pub mod snapshot;

use cache::ProcessCache;
pub use interfaces::{ProcessRecord, TerminalGroup};

/// Completion of one background working-directory lookup. `cwd` is `None`
/// when the lookup failed; the placeholder stays in place silently.
#[derive(Debug)]
struct CwdPatch {
    pid: u32,
    cwd: Option<String>,
}

/// One monitoring session: owns the authoritative process cache, the derived
/// groups, and the channel that funnels background lookup completions back
/// into the single control flow.
///
/// All cache mutation happens through `&mut self` methods called from one
/// task, so no locking is involved; readers get eventual consistency between
/// ticks.
pub struct MonitorSession {
    probe: Arc<dyn ProcessProbe>,
    cache: ProcessCache,
    groups: Vec<TerminalGroup>,
    cwd_tx: mpsc::UnboundedSender<CwdPatch>,
    cwd_rx: mpsc::UnboundedReceiver<CwdPatch>,
    in_flight_cwd_lookups: usize,
    last_tick_error: Option<String>,
}

impl MonitorSession {
    pub fn new(probe: Arc<dyn ProcessProbe>) -> Self {
        let (cwd_tx, cwd_rx) = mpsc::unbounded_channel();
        Self {
            probe,
            cache: ProcessCache::new(),
            groups: Vec::new(),
            cwd_tx,
            cwd_rx,
            in_flight_cwd_lookups: 0,
            last_tick_error: None,
        }
    }

    /// Run one reconciliation tick. Any unexpected failure is caught here, at
    /// the tick boundary, and surfaced through [`Self::last_tick_error`]; the
    /// periodic loop is never torn down by a failing tick.
    pub async fn tick(&mut self) {
        match self.run_tick().await {
            Ok(()) => self.last_tick_error = None,
            Err(err) => self.last_tick_error = Some(format!("{err:#}")),
        }
        self.rebuild_groups();
    }

    async fn run_tick(&mut self) -> Result<()> {
        let snapshot = snapshot::capture(self.probe.as_ref()).await;
        let diff = self.cache.diff(&snapshot);
        debug!(
            "tick: {} new, {} removed, {} existing",
            diff.new.len(),
            diff.removed.len(),
            diff.existing.len()
        );

        self.cache.evict(&diff.removed);

        if !diff.new.is_empty() {
            let new_pids: Vec<u32> = diff.new.iter().map(|entry| entry.pid).collect();
            let rows = details::fetch_identities(self.probe.as_ref(), &new_pids).await;

            for row in rows {
                let ports = diff
                    .new
                    .iter()
                    .find(|entry| entry.pid == row.pid)
                    .map(|entry| entry.ports.clone())
                    .unwrap_or_default();
                let group =
                    ancestry::resolve_owning_session(self.probe.as_ref(), row.ppid).await;

                let pid = row.pid;
                match details::build_record(row, ports, group) {
                    Ok(record) => {
                        self.cache.insert(record);
                        self.spawn_cwd_lookup(pid);
                    }
                    Err(err) => trace!("dropping identity row for pid {pid}: {err}"),
                }
            }
        }

        if !diff.existing.is_empty() {
            let rows = details::fetch_metrics(self.probe.as_ref(), &diff.existing).await;
            self.cache.refresh_volatile(rows);
        }

        Ok(())
    }

    /// Fire-and-forget working-directory lookup for a newly inserted pid. The
    /// completion comes back through the channel and is applied by whichever
    /// control-loop turn drains it next; ordering relative to later ticks is
    /// irrelevant because patches are idempotent and keyed by pid.
    fn spawn_cwd_lookup(&mut self, pid: u32) {
        let probe = Arc::clone(&self.probe);
        let tx = self.cwd_tx.clone();
        self.in_flight_cwd_lookups += 1;
        tokio::spawn(async move {
            let cwd = probe.cwd_of(pid).await;
            let _ = tx.send(CwdPatch { pid, cwd });
        });
    }

    /// Drain every lookup completion that has arrived so far. Returns whether
    /// any record changed (and the groups were rebuilt).
    pub fn apply_pending_cwd_patches(&mut self) -> bool {
        let mut changed = false;
        while let Ok(patch) = self.cwd_rx.try_recv() {
            self.in_flight_cwd_lookups = self.in_flight_cwd_lookups.saturating_sub(1);
            if let Some(cwd) = patch.cwd {
                changed |= self.cache.patch_cwd(patch.pid, cwd);
            }
        }
        if changed {
            self.rebuild_groups();
        }
        changed
    }

    /// Wait up to `max_wait` for in-flight working-directory lookups, applying
    /// completions as they land. For one-shot listings, where there is no
    /// long-lived loop to drain the channel later.
    pub async fn settle_cwd_patches(&mut self, max_wait: Duration) {
        let deadline = tokio::time::Instant::now() + max_wait;
        let mut changed = false;

        while self.in_flight_cwd_lookups > 0 {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, self.cwd_rx.recv()).await {
                Ok(Some(patch)) => {
                    self.in_flight_cwd_lookups = self.in_flight_cwd_lookups.saturating_sub(1);
                    if let Some(cwd) = patch.cwd {
                        changed |= self.cache.patch_cwd(patch.pid, cwd);
                    }
                }
                _ => break,
            }
        }

        if changed {
            self.rebuild_groups();
        }
    }

    /// Recompute every uptime label from the stored start timestamps. Zero
    /// process-table queries: this runs on its own 1-second cadence, far more
    /// often than the refresh tick.
    pub fn refresh_uptime_labels(&mut self) {
        self.cache.refresh_uptime_labels();
        self.rebuild_groups();
    }

    fn rebuild_groups(&mut self) {
        self.groups = grouping::group_records(self.cache.records());
    }

    pub fn groups(&self) -> &[TerminalGroup] {
        &self.groups
    }

    pub fn process_count(&self) -> usize {
        self.cache.len()
    }

    pub fn last_tick_error(&self) -> Option<&str> {
        self.last_tick_error.as_deref()
    }

    /// Tear the session down: close the patch channel and drop all state. The
    /// cache lives and dies with its session.
    pub fn dispose(&mut self) {
        self.cwd_rx.close();
        self.cache.clear();
        self.groups.clear();
    }
}
