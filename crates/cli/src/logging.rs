use std::env;

use anyhow::{anyhow, Result};
use ims_tracker_core::config::{AppConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Events go to stderr so stdout stays a
/// clean command payload.
pub fn init(config: &AppConfig) -> Result<()> {
    let filter = filter_for(&config.logging.level, env::var(EnvFilter::DEFAULT_ENV).ok())?;
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|error| anyhow!("failed to initialize logging: {error}"))
}

/// `RUST_LOG` directives win over the configured level when present.
fn filter_for(level: &str, directives: Option<String>) -> Result<EnvFilter> {
    let directives = directives
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| level.trim().to_ascii_lowercase());

    EnvFilter::try_new(&directives)
        .map_err(|error| anyhow!("invalid log filter `{directives}`: {error}"))
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::filter_for;

    #[test]
    fn configured_level_is_used_without_directives() {
        let filter = filter_for("WARN", None).expect("valid level");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn directives_override_the_configured_level() {
        let filter =
            filter_for("info", Some("ims_tracker_client=debug".to_string())).expect("valid directives");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let blank = filter_for("error", Some("  ".to_string())).expect("blank falls back");
        assert_eq!(blank.max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn malformed_directives_are_reported() {
        let error = filter_for("info", Some("ims_tracker_client=loudest".to_string())).expect_err("invalid directive");
        assert!(error.to_string().contains("invalid log filter"));
    }
}
