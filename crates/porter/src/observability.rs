//! Log subscriber setup for the `porter` binary.

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used in verbose mode when `RUST_LOG` is unset.
const VERBOSE_FILTER: &str = "info,porter=debug";

/// Filter used otherwise when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// How the binary writes its logs.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Debug output from every porter crate
    pub verbose: bool,
    /// One JSON object per event instead of human-readable lines
    pub json_logs: bool,
}

impl LoggingConfig {
    /// Create a configuration with plain, non-verbose output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable debug output from every porter crate.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Filter directive applied when `RUST_LOG` is unset.
    ///
    /// `porter` matches every workspace crate (`porter_core`,
    /// `porter_orchestrator`, ...) by target prefix.
    pub fn default_filter(&self) -> &'static str {
        if self.verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over [`LoggingConfig::default_filter`].
///
/// # Errors
///
/// Fails if the filter directive is malformed or a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(config.default_filter()))?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
