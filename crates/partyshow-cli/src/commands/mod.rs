//! CLI subcommands

pub mod classify;
pub mod config;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use partyshow_core::config::Config;
use tracing::info;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Options shared by every subcommand
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config_path: PathBuf,
}

impl CommandContext {
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    /// Loads the configuration file, falling back to defaults
    pub fn load_config(&self) -> Config {
        let config = Config::load_or_default(&self.config_path);
        info!(config_path = %self.config_path.display(), "Loaded configuration");
        config
    }
}
