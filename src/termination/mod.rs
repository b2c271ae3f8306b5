//! Tree termination with graceful-then-forceful escalation.
//!
//! Descendants are enumerated breadth-first with an explicit worklist and an
//! owned visited set, then killed in reverse enumeration order before the
//! target itself. Every pid in the ordered list is attempted regardless of
//! earlier failures, and the per-pid steps run strictly sequentially so a
//! parent is never signaled while one of its children is still alive.

use crate::prelude::*;
use crate::sys::{ProcessProbe, SignalClass};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// How long to wait for a graceful exit before escalating.
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(3);
/// Fixed cadence for liveness polls between the two signals.
const LIVENESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of one termination attempt. Aggregated transiently by callers,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillResult {
    pub pid: u32,
    pub success: bool,
    pub error: Option<String>,
    pub was_forced: bool,
}

impl KillResult {
    fn exited(pid: u32, was_forced: bool) -> Self {
        Self {
            pid,
            success: true,
            error: None,
            was_forced,
        }
    }

    fn failed(pid: u32, error: String, was_forced: bool) -> Self {
        Self {
            pid,
            success: false,
            error: Some(error),
            was_forced,
        }
    }
}

/// Enumerate every descendant of `pid`, one direct-children query per node.
///
/// Explicit worklist traversal: the owned visited set bounds the walk even if
/// the reported parent/child relation contains a cycle, and the result comes
/// back flattened in generation order (children of earlier nodes first). A
/// failing child query degrades to "no children known" for that node.
pub async fn collect_descendants(probe: &dyn ProcessProbe, pid: u32) -> Vec<u32> {
    let mut queue = VecDeque::from([pid]);
    let mut visited = HashSet::from([pid]);
    let mut descendants = Vec::new();

    while let Some(current) = queue.pop_front() {
        let children = match probe.children_of(current).await {
            Ok(children) => children,
            Err(err) => {
                warn!("child enumeration failed for pid {current}: {err:#}");
                continue;
            }
        };

        for child in children {
            if visited.insert(child) {
                descendants.push(child);
                queue.push_back(child);
            }
        }
    }

    descendants
}

/// Terminate a single pid with signal escalation.
///
/// A pid that is not running reports success immediately, with no signal
/// sent. Otherwise: graceful signal, liveness polls until `timeout`, then a
/// forceful signal and one more poll interval of grace. A pid recycled
/// between the last poll and the report would yield a false-positive success;
/// that window is not closed here.
pub async fn kill_process(probe: &dyn ProcessProbe, pid: u32, timeout: Duration) -> KillResult {
    if !probe.is_running(pid) {
        return KillResult::exited(pid, false);
    }

    if let Err(err) = probe.send_signal(pid, SignalClass::Graceful) {
        return KillResult::failed(pid, format!("{err:#}"), false);
    }

    let start = Instant::now();
    while start.elapsed() < timeout {
        sleep(LIVENESS_POLL_INTERVAL).await;
        if !probe.is_running(pid) {
            return KillResult::exited(pid, false);
        }
    }

    if let Err(err) = probe.send_signal(pid, SignalClass::Forceful) {
        return KillResult::failed(pid, format!("{err:#}"), true);
    }

    sleep(LIVENESS_POLL_INTERVAL).await;
    if !probe.is_running(pid) {
        return KillResult::exited(pid, true);
    }

    KillResult::failed(
        pid,
        "process did not terminate after forceful signal".to_string(),
        true,
    )
}

/// Terminate `pid` together with its entire descendant tree.
///
/// Kill order: the flattened descendant list in reverse enumeration order,
/// then the target. Reverse-of-BFS approximates most-recently-spawned-first;
/// it is a heuristic, not a verified topological sort. Results are aggregated
/// in kill order with no early abort.
pub async fn kill_process_tree(
    probe: &dyn ProcessProbe,
    pid: u32,
    timeout: Duration,
) -> Vec<KillResult> {
    let descendants = collect_descendants(probe, pid).await;
    debug!("killing pid {pid} with {} descendants", descendants.len());

    let mut results = Vec::with_capacity(descendants.len() + 1);
    for child in descendants.into_iter().rev() {
        results.push(kill_process(probe, child, timeout).await);
    }
    results.push(kill_process(probe, pid, timeout).await);

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::fake::FakeProbe;

    const FAST: Duration = Duration::from_millis(300);

    #[tokio::test]
    async fn test_killing_absent_pid_is_a_no_op() {
        let probe = FakeProbe::new();

        let result = kill_process(&probe, 4242, FAST).await;

        assert_eq!(result, KillResult::exited(4242, false));
        assert!(probe.signal_log().is_empty());
    }

    #[tokio::test]
    async fn test_graceful_exit_is_not_forced() {
        let probe = FakeProbe::new();
        probe.add_process(100, 1, "node", "node server.js");

        let result = kill_process(&probe, 100, FAST).await;

        assert!(result.success);
        assert!(!result.was_forced);
        assert_eq!(probe.signal_log(), vec![(100, SignalClass::Graceful)]);
    }

    #[tokio::test]
    async fn test_term_resistant_process_is_escalated() {
        let probe = FakeProbe::new();
        probe.add_process(100, 1, "node", "node server.js");
        probe.resist_graceful(100);

        let result = kill_process(&probe, 100, FAST).await;

        assert!(result.success);
        assert!(result.was_forced);
        assert_eq!(
            probe.signal_log(),
            vec![(100, SignalClass::Graceful), (100, SignalClass::Forceful)]
        );
    }

    #[tokio::test]
    async fn test_unkillable_process_reports_structured_failure() {
        let probe = FakeProbe::new();
        probe.add_process(100, 1, "node", "node server.js");
        probe.resist_graceful(100);
        probe.resist_forceful(100);

        let result = kill_process(&probe, 100, FAST).await;

        assert!(!result.success);
        assert!(result.was_forced);
        assert!(result.error.as_deref().unwrap().contains("forceful"));
    }

    #[tokio::test]
    async fn test_collect_descendants_walks_generations_and_guards_cycles() {
        let probe = FakeProbe::new();
        probe.set_children(100, &[101, 102]);
        probe.set_children(101, &[103]);
        probe.set_children(103, &[100]); // cycle back to the root

        let descendants = collect_descendants(&probe, 100).await;

        assert_eq!(descendants, vec![101, 102, 103]);
    }

    #[tokio::test]
    async fn test_tree_kill_orders_children_before_parent() {
        let probe = FakeProbe::new();
        probe.add_process(100, 1, "npm", "npm run dev");
        probe.add_process(101, 100, "node", "node server.js");
        probe.add_process(102, 100, "node", "node worker.js");
        probe.set_children(100, &[101, 102]);

        let results = kill_process_tree(&probe, 100, FAST).await;

        let order: Vec<u32> = results.iter().map(|r| r.pid).collect();
        assert_eq!(order.len(), 3);
        assert_eq!(*order.last().unwrap(), 100);
        assert!(order[..2].contains(&101) && order[..2].contains(&102));
        assert!(results.iter().all(|r| r.success));

        // The parent's signal must come after both children were terminated.
        let log = probe.signal_log();
        let parent_at = log.iter().position(|(pid, _)| *pid == 100).unwrap();
        for child in [101, 102] {
            let child_at = log.iter().position(|(pid, _)| *pid == child).unwrap();
            assert!(child_at < parent_at);
        }
    }

    #[tokio::test]
    async fn test_tree_kill_attempts_every_pid_despite_failures() {
        let probe = FakeProbe::new();
        probe.add_process(100, 1, "npm", "npm run dev");
        probe.add_process(101, 100, "node", "node stuck.js");
        probe.add_process(102, 100, "node", "node worker.js");
        probe.set_children(100, &[101, 102]);
        probe.resist_graceful(101);
        probe.resist_forceful(101);

        let results = kill_process_tree(&probe, 100, FAST).await;

        assert_eq!(results.len(), 3);
        let failed: Vec<u32> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.pid)
            .collect();
        assert_eq!(failed, vec![101]);
        // 102 and the parent were still attempted and succeeded.
        assert!(results.iter().any(|r| r.pid == 102 && r.success));
        assert!(results.iter().any(|r| r.pid == 100 && r.success));
    }
}
