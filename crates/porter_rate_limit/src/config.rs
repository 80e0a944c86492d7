//! Configuration structures for Porter.
//!
//! This module provides TOML-based configuration. The configuration
//! system supports:
//! - Bundled defaults (include_str! from porter.toml)
//! - User overrides (./porter.toml or ~/.config/porter/porter.toml)
//! - Environment overrides (`PORTER__SECTION__KEY`)
//! - Automatic merging with later sources taking precedence

use crate::BackoffPolicy;
use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use porter_cache::ResultCacheConfig;
use porter_core::JobState;
use porter_error::{ConfigError, PorterError, PorterResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};

/// Quota tracking and retry settings.
///
/// ```toml
/// [rate_limit]
/// reserve_threshold = 2
/// safety_margin_secs = 5
/// max_attempts = 3
/// requests_per_second = 10
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct RateLimitSettings {
    /// Calls held back in every quota window
    #[serde(default = "default_reserve_threshold")]
    #[builder(default = "default_reserve_threshold()")]
    reserve_threshold: u32,

    /// Seconds added to every reset-based wait
    #[serde(default = "default_safety_margin_secs")]
    #[builder(default = "default_safety_margin_secs()")]
    safety_margin_secs: u64,

    /// Physical calls per logical call
    #[serde(default = "default_max_attempts")]
    #[builder(default = "default_max_attempts()")]
    max_attempts: u32,

    /// Client-side smoothing limit; 0 disables it
    #[serde(default = "default_requests_per_second")]
    #[builder(default = "default_requests_per_second()")]
    requests_per_second: u32,
}

fn default_reserve_threshold() -> u32 {
    2
}

fn default_safety_margin_secs() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_requests_per_second() -> u32 {
    10
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            reserve_threshold: default_reserve_threshold(),
            safety_margin_secs: default_safety_margin_secs(),
            max_attempts: default_max_attempts(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

impl RateLimitSettings {
    /// Safety margin as a duration.
    pub fn safety_margin(&self) -> Duration {
        Duration::from_secs(self.safety_margin_secs)
    }
}

/// Backoff settings.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct BackoffSettings {
    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    #[builder(default = "default_initial_delay_ms()")]
    initial_delay_ms: u64,

    /// Relative jitter applied to every delay
    #[serde(default = "default_jitter_fraction")]
    #[builder(default = "default_jitter_fraction()")]
    jitter_fraction: f64,

    /// Hard cap on any single delay (seconds)
    #[serde(default = "default_max_delay_secs")]
    #[builder(default = "default_max_delay_secs()")]
    max_delay_secs: u64,
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_jitter_fraction() -> f64 {
    0.2
}

fn default_max_delay_secs() -> u64 {
    300
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            jitter_fraction: default_jitter_fraction(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl BackoffSettings {
    /// Build the policy these settings describe.
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.initial_delay_ms),
            self.jitter_fraction,
            Duration::from_secs(self.max_delay_secs),
        )
    }
}

/// Job driver settings.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct OrchestratorSettings {
    /// Parent of every job-scoped working directory
    #[serde(default = "default_workspace_root")]
    #[builder(default = "default_workspace_root()")]
    workspace_root: PathBuf,

    /// Remove a job's working directory once it is terminal
    #[serde(default = "default_cleanup_workspace")]
    #[builder(default = "default_cleanup_workspace()")]
    cleanup_workspace: bool,

    /// Prefix of derived branch names
    #[serde(default = "default_branch_prefix")]
    #[builder(default = "default_branch_prefix()")]
    branch_prefix: String,

    /// Ceiling for Analyzing (seconds)
    #[serde(default = "default_analyzing_timeout_secs")]
    #[builder(default = "default_analyzing_timeout_secs()")]
    analyzing_timeout_secs: u64,

    /// Ceiling for Cloning (seconds)
    #[serde(default = "default_cloning_timeout_secs")]
    #[builder(default = "default_cloning_timeout_secs()")]
    cloning_timeout_secs: u64,

    /// Ceiling for Transforming (seconds)
    #[serde(default = "default_transforming_timeout_secs")]
    #[builder(default = "default_transforming_timeout_secs()")]
    transforming_timeout_secs: u64,

    /// Ceiling for Reporting (seconds)
    #[serde(default = "default_reporting_timeout_secs")]
    #[builder(default = "default_reporting_timeout_secs()")]
    reporting_timeout_secs: u64,

    /// Ceiling for Publishing (seconds)
    #[serde(default = "default_publishing_timeout_secs")]
    #[builder(default = "default_publishing_timeout_secs()")]
    publishing_timeout_secs: u64,

    /// Ceiling for Notifying (seconds)
    #[serde(default = "default_notifying_timeout_secs")]
    #[builder(default = "default_notifying_timeout_secs()")]
    notifying_timeout_secs: u64,
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("porter")
}

fn default_cleanup_workspace() -> bool {
    true
}

fn default_branch_prefix() -> String {
    "porter/java".to_string()
}

fn default_analyzing_timeout_secs() -> u64 {
    120
}

fn default_cloning_timeout_secs() -> u64 {
    600
}

fn default_transforming_timeout_secs() -> u64 {
    600
}

fn default_reporting_timeout_secs() -> u64 {
    120
}

fn default_publishing_timeout_secs() -> u64 {
    120
}

fn default_notifying_timeout_secs() -> u64 {
    60
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            cleanup_workspace: default_cleanup_workspace(),
            branch_prefix: default_branch_prefix(),
            analyzing_timeout_secs: default_analyzing_timeout_secs(),
            cloning_timeout_secs: default_cloning_timeout_secs(),
            transforming_timeout_secs: default_transforming_timeout_secs(),
            reporting_timeout_secs: default_reporting_timeout_secs(),
            publishing_timeout_secs: default_publishing_timeout_secs(),
            notifying_timeout_secs: default_notifying_timeout_secs(),
        }
    }
}

impl OrchestratorSettings {
    /// Timeout ceiling for the action of `state`, if it has one.
    pub fn timeout_for(&self, state: JobState) -> Option<Duration> {
        let secs = match state {
            JobState::Analyzing => self.analyzing_timeout_secs,
            JobState::Cloning => self.cloning_timeout_secs,
            JobState::Transforming => self.transforming_timeout_secs,
            JobState::Reporting => self.reporting_timeout_secs,
            JobState::Publishing => self.publishing_timeout_secs,
            JobState::Notifying => self.notifying_timeout_secs,
            JobState::Pending | JobState::Completed | JobState::Failed => return None,
        };
        Some(Duration::from_secs(secs))
    }
}

/// Per-platform connection settings.
///
/// ```toml
/// [platforms.github]
/// api_base = "https://api.github.com"
/// token_env = "GITHUB_TOKEN"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlatformSettings {
    /// REST API base; derived from the repository host when absent
    #[serde(default)]
    pub api_base: Option<String>,

    /// Environment variable holding the default token
    pub token_env: String,
}

/// Transformation engine command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Executable to run
    pub command: String,

    /// Arguments placed before the checkout path
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            command: "porter-rewrite".to_string(),
            args: Vec::new(),
        }
    }
}

/// Top-level Porter configuration.
///
/// Loads configuration from TOML files with a precedence system:
/// 1. Bundled defaults (include_str! from porter.toml)
/// 2. User override (~/.config/porter/porter.toml, then ./porter.toml)
/// 3. Environment variables (`PORTER__RATE_LIMIT__MAX_ATTEMPTS=5`)
///
/// # Example
///
/// ```no_run
/// use porter_rate_limit::PorterConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PorterConfig::load()?;
/// println!("Retry cap: {}", config.rate_limit.max_attempts());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct PorterConfig {
    /// Quota tracking and retry settings
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    /// Backoff settings
    #[serde(default)]
    pub backoff: BackoffSettings,

    /// Result cache settings
    #[serde(default)]
    pub cache: ResultCacheConfig,

    /// Job driver settings
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,

    /// Map of platform name to platform settings
    #[serde(default)]
    pub platforms: HashMap<String, PlatformSettings>,

    /// Transformation engine command
    #[serde(default)]
    pub engine: EngineSettings,
}

impl PorterConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> PorterResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                PorterError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                PorterError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: environment > user override >
    /// bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override earlier):
    /// 1. Bundled defaults (porter.toml shipped with library)
    /// 2. User config in home directory (~/.config/porter/porter.toml)
    /// 3. User config in current directory (./porter.toml)
    /// 4. `PORTER__`-prefixed environment variables
    ///
    /// User config files are optional and will be silently skipped if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source is malformed or the merged
    /// configuration fails validation.
    #[instrument]
    pub fn load() -> PorterResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        // Bundled default configuration
        const DEFAULT_CONFIG: &str = include_str!("../../../porter.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/porter/porter.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("porter").required(false))
            .add_source(
                Environment::with_prefix("PORTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .map_err(|e| {
                PorterError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                PorterError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the client cannot honour.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first offending key.
    pub fn validate(&self) -> PorterResult<()> {
        if self.rate_limit.max_attempts == 0 {
            return Err(ConfigError::new("rate_limit.max_attempts must be at least 1").into());
        }
        if !(0.0..1.0).contains(&self.backoff.jitter_fraction) {
            return Err(ConfigError::new("backoff.jitter_fraction must be in [0, 1)").into());
        }
        if self.backoff.max_delay_secs == 0 {
            return Err(ConfigError::new("backoff.max_delay_secs must be positive").into());
        }
        Ok(())
    }

    /// Settings for a named platform (`github`, `gitlab`).
    #[instrument(skip(self))]
    pub fn platform(&self, name: &str) -> Option<&PlatformSettings> {
        let settings = self.platforms.get(name);
        debug!(name, found = settings.is_some(), "Looking up platform settings");
        settings
    }
}
