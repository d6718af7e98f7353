//! Tracing subscriber setup for the `specflow` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary so embedders keep control of their own logging.

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding an `EnvFilter` directive string.
pub const LOG_ENV: &str = "SPECFLOW_LOG";

const DEFAULT_FILTER: &str = "warn,spec_workflow=info,specflow=info";
const VERBOSE_FILTER: &str = "info,spec_workflow=debug,specflow=debug";

/// Directive used when `SPECFLOW_LOG` is unset or unparsable.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

fn build_filter(env_value: Option<&str>, verbose: bool) -> EnvFilter {
    env_value
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directives(verbose)))
}

/// Install the global subscriber, writing to stderr so stdout stays clean for
/// command output. A second call is a no-op.
pub fn init(verbose: bool) {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = build_filter(env_value.as_deref(), verbose);

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_thread_ids(false)
        .with_line_number(verbose)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_value_overrides_default() {
        let filter = build_filter(Some("spec_workflow=trace"), false);
        assert_eq!(filter.to_string(), "spec_workflow=trace");
    }

    #[test]
    fn test_blank_or_invalid_env_falls_back() {
        assert_eq!(build_filter(Some("  "), false).to_string(), EnvFilter::new(DEFAULT_FILTER).to_string());
        assert_eq!(
            build_filter(Some("spec_workflow=loud"), true).to_string(),
            EnvFilter::new(VERBOSE_FILTER).to_string()
        );
        assert_eq!(build_filter(None, false).to_string(), EnvFilter::new(DEFAULT_FILTER).to_string());
    }
}
