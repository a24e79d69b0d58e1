pub use quickadd_core::config::*;

use crate::cli::Cli;

/// Environment configuration with command-line overrides applied.
pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::discover()?;
    if cli.no_ai {
        config.use_ai = false;
    }
    if let Some(model) = cli.model.as_ref().filter(|m| !m.trim().is_empty()) {
        config.remote.model = model.trim().to_string();
    }
    Ok(config)
}
