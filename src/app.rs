use std::sync::Arc;

use crate::{
    config::HunterConfig,
    kill, list,
    local_logger::{PORTHUNTER_U8_COLOR_CODE, init_local_logger},
    prelude::*,
    sys::{ProcessProbe, unix::UnixProbe},
    watch,
};
use clap::{
    Parser, Subcommand,
    builder::{Styles, styling},
};

fn create_styles() -> Styles {
    styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(
            styling::Ansi256Color(PORTHUNTER_U8_COLOR_CODE).on_default() | styling::Effects::BOLD,
        )
        .placeholder(styling::AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(version, about = "Find and kill stray development servers", styles = create_styles())]
pub struct Cli {
    /// The configuration name to use
    /// If provided, the configuration will be loaded from ~/.config/porthunter/{config-name}.yaml
    /// Otherwise, loads from ~/.config/porthunter/config.yaml
    #[arg(long, env = "PORTHUNTER_CONFIG_NAME", global = true)]
    pub config_name: Option<String>,

    /// Seconds between refresh ticks in watch mode. 0 disables periodic refresh.
    #[arg(long, global = true)]
    pub refresh_interval: Option<u64>,

    /// Seconds to wait for a graceful exit before escalating to a forceful signal
    #[arg(long, global = true)]
    pub kill_timeout: Option<u64>,

    /// Hide the CPU column
    #[arg(long, global = true)]
    pub hide_cpu: bool,

    /// Hide the memory column
    #[arg(long, global = true)]
    pub hide_memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List listening dev-server processes grouped by their terminal session
    List(list::ListArgs),
    /// Watch listening dev-server processes, refreshing periodically
    Watch,
    /// Terminate processes together with their entire descendant trees
    Kill(kill::KillArgs),
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_local_logger()?;

    let mut config = HunterConfig::load_with_override(
        cli.config_name.as_deref(),
        cli.refresh_interval,
        cli.kill_timeout,
    )?;
    if cli.hide_cpu {
        config.display.show_cpu = false;
    }
    if cli.hide_memory {
        config.display.show_memory = false;
    }
    debug!("config: {config:#?}");

    let probe: Arc<dyn ProcessProbe> = Arc::new(UnixProbe::new());

    match cli.command {
        Commands::List(args) => list::run(args, &config, probe).await,
        Commands::Watch => watch::run(&config, probe).await,
        Commands::Kill(args) => kill::run(args, &config, probe).await,
    }
}
