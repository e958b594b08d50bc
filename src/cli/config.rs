//! Conversion of CLI arguments into a validated `ToolConfig`

use crate::cli::main_impl::{Cli, Command};
use crate::{config::ToolConfig, types::BackgroundSpec};
use anyhow::{Context, Result};

pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Start from `--config` (or defaults) and apply command-line overrides
    pub(crate) fn from_cli(cli: &Cli) -> Result<ToolConfig> {
        let mut config = match &cli.config {
            Some(path) => ToolConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => ToolConfig::default(),
        };

        config.debug = config.debug || cli.verbose >= 2;

        match &cli.command {
            Command::Resize { quality, .. } | Command::Convert { quality, .. } => {
                if let Some(quality) = quality {
                    config.jpeg_quality = *quality;
                }
            },
            Command::Remove {
                background,
                timeout_ms,
                ..
            } => {
                if let Some(background) = background {
                    config.default_background = background
                        .parse::<BackgroundSpec>()
                        .with_context(|| format!("Invalid --background value '{}'", background))?;
                }
                if let Some(timeout_ms) = timeout_ms {
                    config.ready_timeout_ms = *timeout_ms;
                }
            },
            Command::Cache { .. } => {},
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}
