use std::{env, fs, path::PathBuf};

use crate::prelude::*;
use nestify::nest;
use serde::{Deserialize, Serialize};

nest! {
    #[derive(Debug, Clone, Deserialize, Serialize)]*
    #[serde(rename_all = "kebab-case", default)]*
    /// Persistent configuration for the porthunter CLI.
    ///
    /// Stored in the filesystem following the XDG Base Directory Specification,
    /// typically at `~/.config/porthunter/config.yaml`. A missing file yields the
    /// defaults; CLI flags are folded in with [`HunterConfig::load_with_override`].
    pub struct HunterConfig {
        /// Seconds between refresh ticks in watch mode. 0 disables periodic refresh.
        pub refresh_interval_secs: u64,
        /// Seconds to wait after the graceful signal before escalating to a
        /// forceful one.
        pub kill_timeout_secs: u64,
        pub display: pub struct DisplayConfig {
            pub show_cpu: bool,
            pub show_memory: bool,
        }
    }
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 3,
            kill_timeout_secs: crate::termination::DEFAULT_KILL_TIMEOUT.as_secs(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_cpu: true,
            show_memory: true,
        }
    }
}

/// Get the path to the configuration file, following the XDG Base Directory
/// Specification at https://specifications.freedesktop.org/basedir-spec/basedir-spec-latest.html
///
/// If config_name is None, returns ~/.config/porthunter/config.yaml (default)
/// If config_name is Some, returns ~/.config/porthunter/{config_name}.yaml
fn get_configuration_file_path(config_name: Option<&str>) -> PathBuf {
    let config_dir = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = env::var("HOME").expect("HOME env variable not set");
            PathBuf::from(home).join(".config")
        });
    let config_dir = config_dir.join("porthunter");

    match config_name {
        Some(name) => config_dir.join(format!("{name}.yaml")),
        None => config_dir.join("config.yaml"),
    }
}

impl HunterConfig {
    /// Load the configuration. If it does not exist, return a default configuration.
    ///
    /// Values provided on the command line take precedence over the loaded file.
    pub fn load_with_override(
        config_name: Option<&str>,
        refresh_interval_override: Option<u64>,
        kill_timeout_override: Option<u64>,
    ) -> Result<Self> {
        let config_path = get_configuration_file_path(config_name);

        let mut config = match fs::read(&config_path) {
            Ok(config_str) => {
                let config: HunterConfig = serde_yaml::from_slice(&config_str).context(format!(
                    "Failed to parse porthunter config at {}",
                    config_path.display()
                ))?;
                debug!("Config loaded from {}", config_path.display());
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Config file not found at {}", config_path.display());
                HunterConfig::default()
            }
            Err(e) => bail!("Failed to load config: {e}"),
        };

        if let Some(refresh_interval_secs) = refresh_interval_override {
            config.refresh_interval_secs = refresh_interval_secs;
        }
        if let Some(kill_timeout_secs) = kill_timeout_override {
            config.kill_timeout_secs = kill_timeout_secs;
        }

        Ok(config)
    }
}
