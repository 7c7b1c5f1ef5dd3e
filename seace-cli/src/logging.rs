//! Tracing subscriber setup.

use color_eyre::eyre::{eyre, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seace_core::LogSettings;

const DEFAULT_FILTER: &str =
    "seace_cli=info,seace_client=info,seace_cache=info,seace_history=info,warn";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
/// Logs go to stderr so command output on stdout stays parseable.
pub fn init(settings: &LogSettings) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if settings.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| eyre!("failed to init subscriber: {}", e))
}
