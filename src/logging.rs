//! Tracing subscriber setup for the binary

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Level used when the configuration names none
pub const DEFAULT_TRACE_LEVEL: &str = "warn";

/// Build the filter for a configured level
///
/// An unparsable directive falls back to [`DEFAULT_TRACE_LEVEL`].
pub fn filter_for(level: Option<&str>) -> EnvFilter {
    let level = level.unwrap_or(DEFAULT_TRACE_LEVEL);
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_TRACE_LEVEL))
}

/// Install a stderr subscriber filtered by `config.trace_level`
///
/// Only the first call takes effect.
pub fn init_tracing(config: &Config) {
    let subscriber = tracing_subscriber::registry()
        .with(filter_for(config.trace_level.as_deref()))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false));

    let _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_for() {
        assert_eq!(filter_for(None).to_string(), "warn");
        assert_eq!(filter_for(Some("debug")).to_string(), "debug");
        assert_eq!(filter_for(Some("tmregistry=trace")).to_string(), "tmregistry=trace");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = Config::default();
        init_tracing(&config);
        init_tracing(&config);
        tracing::debug!("still fine");
    }
}
