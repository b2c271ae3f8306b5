use std::sync::Arc;
use std::time::Duration;

use crate::config::HunterConfig;
use crate::list::build_group_table;
use crate::monitor::MonitorSession;
use crate::prelude::*;
use crate::sys::ProcessProbe;
use tokio::time::{self, Interval};

/// Cadence of the uptime-label recompute. Independent of the refresh
/// interval and free of external queries.
const UPTIME_TICK: Duration = Duration::from_secs(1);

pub async fn run(config: &HunterConfig, probe: Arc<dyn ProcessProbe>) -> Result<()> {
    let mut session = MonitorSession::new(probe);

    let mut refresh_ticker = match config.refresh_interval_secs {
        0 => {
            info!("Periodic refresh is disabled; showing one scan, Ctrl-C to exit");
            None
        }
        secs => Some(time::interval(Duration::from_secs(secs))),
    };
    let mut uptime_ticker = time::interval(UPTIME_TICK);

    // With periodic refresh disabled there is still one initial scan.
    if refresh_ticker.is_none() {
        session.tick().await;
        render(&session, config);
    }

    loop {
        tokio::select! {
            _ = next_refresh(refresh_ticker.as_mut()) => {
                session.tick().await;
                session.apply_pending_cwd_patches();
                render(&session, config);
            }
            _ = uptime_ticker.tick() => {
                session.refresh_uptime_labels();
                if session.apply_pending_cwd_patches() {
                    render(&session, config);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.dispose();
    info!("Stopped watching");
    Ok(())
}

async fn next_refresh(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => futures::future::pending().await,
    }
}

fn render(session: &MonitorSession, config: &HunterConfig) {
    if let Some(err) = session.last_tick_error() {
        warn!("refresh failed, showing stale data: {err}");
    }

    let groups = session.groups();
    if groups.is_empty() {
        info!("No listening dev servers found");
        return;
    }

    println!("{}", build_group_table(groups, &config.display));
    info!(
        "{} dev server(s) across {} session(s)",
        session.process_count(),
        groups.len()
    );
}
