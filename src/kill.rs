use std::sync::Arc;
use std::time::Duration;

use crate::config::HunterConfig;
use crate::prelude::*;
use crate::sys::ProcessProbe;
use crate::termination;
use clap::Args;

#[derive(Args, Debug)]
pub struct KillArgs {
    /// Process ids to terminate, each together with its entire descendant tree
    #[arg(required = true)]
    pub pids: Vec<u32>,
}

pub async fn run(args: KillArgs, config: &HunterConfig, probe: Arc<dyn ProcessProbe>) -> Result<()> {
    let timeout = Duration::from_secs(config.kill_timeout_secs);

    let mut killed = 0usize;
    let mut failed = 0usize;

    // A selected pid may have vanished since it was picked; the engine
    // reports that as a clean success with no signal sent.
    for &pid in &args.pids {
        let results = termination::kill_process_tree(probe.as_ref(), pid, timeout).await;

        for result in &results {
            if result.success {
                let how = if result.was_forced {
                    "forcefully"
                } else {
                    "gracefully"
                };
                debug!("pid {} terminated {how}", result.pid);
            } else {
                error!(
                    "pid {} survived: {}",
                    result.pid,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        if results.iter().all(|result| result.success) {
            info!("Killed pid {pid} ({} process(es) in its tree)", results.len());
            killed += 1;
        } else {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("failed to terminate {failed} of {} process tree(s)", args.pids.len());
    }

    info!("Killed {killed} process tree(s)");
    Ok(())
}
