//! Tracing setup
//!
//! The engine logs through `tracing`; hosts that do not install their own
//! subscriber can call [`init_tracing`] with the `[logging]` section of
//! their [`EngineConfig`](crate::config::EngineConfig).

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// `EnvFilter` directives for a logging section.
///
/// The base level comes first, then one directive per component in name
/// order, scoped to this crate.
///
/// ```
/// use agent_router::config::LoggingConfig;
/// use agent_router::logging::build_filter_directives;
/// use std::collections::BTreeMap;
///
/// let config = LoggingConfig {
///     components: BTreeMap::from([("routing".to_string(), "debug".to_string())]),
///     ..Default::default()
/// };
/// assert_eq!(build_filter_directives(&config), "info,agent_router::routing=debug");
/// ```
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut directives = vec![config.level.to_lowercase()];
    directives.extend(
        config
            .components
            .iter()
            .map(|(component, level)| format!("{}::{}={}", env!("CARGO_CRATE_NAME"), component, level.to_lowercase())),
    );
    directives.join(",")
}

/// Install a global subscriber for the configured format.
///
/// `RUST_LOG`, when set, takes precedence over the configured levels.
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(build_filter_directives(config)));
    let fmt = tracing_subscriber::fmt::layer().with_target(config.show_targets);
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Pretty => registry.with(fmt.pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt.compact()).try_init(),
        LogFormat::Json => registry.with(fmt.json().flatten_event(true)).try_init(),
    }
}
