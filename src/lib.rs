pub mod cli;
pub mod commands;
pub mod config;

pub use quickadd_core as core;
pub use quickadd_core::{capture, dates, model, parser};
pub use quickadd_remote as remote;
pub use quickadd_session as session;

use anyhow::Result;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. `RUST_LOG` still wins over the default
/// directive when set.
pub fn init_tracing(filter: Option<&str>) -> Result<()> {
    let directive: Directive = filter.unwrap_or("warn").parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}
