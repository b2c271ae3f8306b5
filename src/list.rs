use std::sync::Arc;
use std::time::Duration;

use crate::config::{DisplayConfig, HunterConfig};
use crate::monitor::helpers::display::{truncate_command, truncate_path};
use crate::monitor::{MonitorSession, TerminalGroup};
use crate::prelude::*;
use crate::sys::ProcessProbe;
use clap::Args;
use itertools::Itertools;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Grace window for background working-directory lookups in one-shot mode.
const CWD_SETTLE_WINDOW: Duration = Duration::from_millis(300);

const CELL_MAX_LEN: usize = 40;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print the session groups as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run(
    args: ListArgs,
    config: &HunterConfig,
    probe: Arc<dyn ProcessProbe>,
) -> Result<()> {
    let mut session = MonitorSession::new(probe);

    if args.json {
        session.tick().await;
    } else {
        start_group!("Scanning listening processes");
        session.tick().await;
        end_group!();
    }
    session.settle_cwd_patches(CWD_SETTLE_WINDOW).await;

    if let Some(err) = session.last_tick_error() {
        warn!("scan incomplete: {err}");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(session.groups())?);
    } else if session.groups().is_empty() {
        info!("No listening dev servers found");
    } else {
        println!("{}", build_group_table(session.groups(), &config.display));
    }

    session.dispose();
    Ok(())
}

/// Render session groups as a table, with the CPU and memory columns governed
/// by the display toggles.
pub(crate) fn build_group_table(groups: &[TerminalGroup], display: &DisplayConfig) -> String {
    let mut builder = Builder::default();

    let mut header = vec!["Session", "PID", "Name", "Ports", "Uptime"];
    if display.show_cpu {
        header.push("CPU");
    }
    if display.show_memory {
        header.push("Memory");
    }
    header.push("Directory");
    header.push("Command");
    builder.push_record(header);

    for group in groups {
        for process in &group.processes {
            let mut row = vec![
                group.name.clone(),
                process.pid.to_string(),
                process.name.clone(),
                process.ports.iter().map(u16::to_string).join(", "),
                process.uptime.clone(),
            ];
            if display.show_cpu {
                row.push(format!("{:.1}%", process.cpu));
            }
            if display.show_memory {
                row.push(format!("{} MB", process.memory_mb));
            }
            row.push(truncate_path(&process.cwd, CELL_MAX_LEN));
            row.push(truncate_command(&process.command, CELL_MAX_LEN));
            builder.push_record(row);
        }
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}
