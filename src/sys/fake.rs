//! Scripted probe used by the engine tests.
//!
//! Behavior is configured per pid (process table, children, signal
//! resistance), and every signal delivery and async query is recorded so
//! tests can assert on ordering and on the zero-I/O properties.

use crate::prelude::*;
use crate::sys::{IdentityRow, ListeningSocket, MetricsRow, ProcessProbe, SignalClass};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct FakeProcess {
    ppid: u32,
    comm: String,
    args: String,
    cpu: f32,
    rss_kb: u64,
    etime: String,
    alive: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    listeners: Vec<ListeningSocket>,
    listening_fails: bool,
    processes: HashMap<u32, FakeProcess>,
    children: HashMap<u32, Vec<u32>>,
    cwds: HashMap<u32, String>,
    resist_graceful: HashSet<u32>,
    resist_forceful: HashSet<u32>,
    signal_log: Vec<(u32, SignalClass)>,
    query_count: usize,
}

#[derive(Debug, Default)]
pub struct FakeProbe {
    state: Mutex<FakeState>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&self, pid: u32, name: &str, port: u16) {
        self.state.lock().unwrap().listeners.push(ListeningSocket {
            pid,
            name: name.to_string(),
            port,
        });
    }

    pub fn remove_listener(&self, pid: u32) {
        self.state
            .lock()
            .unwrap()
            .listeners
            .retain(|socket| socket.pid != pid);
    }

    pub fn fail_listening_sockets(&self) {
        self.state.lock().unwrap().listening_fails = true;
    }

    pub fn add_process(&self, pid: u32, ppid: u32, comm: &str, args: &str) {
        self.add_process_full(pid, ppid, comm, args, 0.0, 1024, "01:00");
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_process_full(
        &self,
        pid: u32,
        ppid: u32,
        comm: &str,
        args: &str,
        cpu: f32,
        rss_kb: u64,
        etime: &str,
    ) {
        self.state.lock().unwrap().processes.insert(
            pid,
            FakeProcess {
                ppid,
                comm: comm.to_string(),
                args: args.to_string(),
                cpu,
                rss_kb,
                etime: etime.to_string(),
                alive: true,
            },
        );
    }

    /// Drop a process from the table without any signal, as if it exited on
    /// its own.
    pub fn kill_silently(&self, pid: u32) {
        self.state.lock().unwrap().processes.remove(&pid);
    }

    pub fn set_metrics(&self, pid: u32, cpu: f32, rss_kb: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(process) = state.processes.get_mut(&pid) {
            process.cpu = cpu;
            process.rss_kb = rss_kb;
        }
    }

    pub fn set_cwd(&self, pid: u32, cwd: &str) {
        self.state.lock().unwrap().cwds.insert(pid, cwd.to_string());
    }

    pub fn set_children(&self, pid: u32, children: &[u32]) {
        self.state
            .lock()
            .unwrap()
            .children
            .insert(pid, children.to_vec());
    }

    pub fn resist_graceful(&self, pid: u32) {
        self.state.lock().unwrap().resist_graceful.insert(pid);
    }

    pub fn resist_forceful(&self, pid: u32) {
        self.state.lock().unwrap().resist_forceful.insert(pid);
    }

    pub fn signal_log(&self) -> Vec<(u32, SignalClass)> {
        self.state.lock().unwrap().signal_log.clone()
    }

    /// Number of async process-table queries issued so far.
    pub fn query_count(&self) -> usize {
        self.state.lock().unwrap().query_count
    }
}

#[async_trait]
impl ProcessProbe for FakeProbe {
    async fn listening_sockets(&self) -> Result<Vec<ListeningSocket>> {
        let mut state = self.state.lock().unwrap();
        state.query_count += 1;
        if state.listening_fails {
            bail!("scripted lsof failure");
        }
        Ok(state.listeners.clone())
    }

    async fn identity_batch(&self, pids: &[u32]) -> Result<Vec<IdentityRow>> {
        let mut state = self.state.lock().unwrap();
        state.query_count += 1;
        Ok(pids
            .iter()
            .filter_map(|pid| {
                state
                    .processes
                    .get(pid)
                    .filter(|process| process.alive)
                    .map(|process| IdentityRow {
                        pid: *pid,
                        ppid: process.ppid,
                        cpu: process.cpu,
                        rss_kb: process.rss_kb,
                        etime: process.etime.clone(),
                        command: process.args.clone(),
                    })
            })
            .collect())
    }

    async fn metrics_batch(&self, pids: &[u32]) -> Result<Vec<MetricsRow>> {
        let mut state = self.state.lock().unwrap();
        state.query_count += 1;
        Ok(pids
            .iter()
            .filter_map(|pid| {
                state
                    .processes
                    .get(pid)
                    .filter(|process| process.alive)
                    .map(|process| MetricsRow {
                        pid: *pid,
                        cpu: process.cpu,
                        rss_kb: process.rss_kb,
                        etime: process.etime.clone(),
                    })
            })
            .collect())
    }

    async fn parent_of(&self, pid: u32) -> Result<Option<(u32, String)>> {
        let mut state = self.state.lock().unwrap();
        state.query_count += 1;
        Ok(state
            .processes
            .get(&pid)
            .filter(|process| process.alive)
            .map(|process| (process.ppid, process.comm.clone())))
    }

    async fn children_of(&self, pid: u32) -> Result<Vec<u32>> {
        let mut state = self.state.lock().unwrap();
        state.query_count += 1;
        Ok(state.children.get(&pid).cloned().unwrap_or_default())
    }

    fn is_running(&self, pid: u32) -> bool {
        self.state
            .lock()
            .unwrap()
            .processes
            .get(&pid)
            .is_some_and(|process| process.alive)
    }

    fn send_signal(&self, pid: u32, class: SignalClass) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.signal_log.push((pid, class));

        let survives = match class {
            SignalClass::Graceful => state.resist_graceful.contains(&pid),
            SignalClass::Forceful => state.resist_forceful.contains(&pid),
        };
        if !survives && let Some(process) = state.processes.get_mut(&pid) {
            process.alive = false;
        }

        Ok(())
    }

    async fn cwd_of(&self, pid: u32) -> Option<String> {
        let mut state = self.state.lock().unwrap();
        state.query_count += 1;
        state.cwds.get(&pid).cloned()
    }
}
