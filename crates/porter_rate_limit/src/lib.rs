//! Quota tracking, backoff and the rate-limited platform client.
//!
//! This crate provides the coordination layer between migration jobs and
//! the external GitHub/GitLab APIs:
//! - [`RateLimitTracker`]: per-endpoint quota state read from response headers
//! - [`HeaderQuotaDetector`]: platform-specific header parsing
//! - [`BackoffPolicy`]: exponential backoff with jitter
//! - [`RateLimitedClient`]: the only component that calls a platform
//! - [`PorterConfig`]: layered TOML configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use porter_rate_limit::{PorterConfig, RateLimitedClient};
//!
//! let config = PorterConfig::load()?;
//! let client = RateLimitedClient::from_config(&config, Arc::new(SystemClock));
//! ```

#![warn(missing_docs)]

mod backoff;
mod client;
mod config;
mod detector;
mod sleeper;
mod tracker;

pub use backoff::BackoffPolicy;
pub use client::{Idempotency, RateLimitedClient};
pub use config::{
    BackoffSettings, BackoffSettingsBuilder, EngineSettings, OrchestratorSettings,
    OrchestratorSettingsBuilder, PlatformSettings, PorterConfig, RateLimitSettings,
    RateLimitSettingsBuilder,
};
pub use detector::HeaderQuotaDetector;
pub use sleeper::{ManualSleeper, Sleeper, TokioSleeper};
pub use tracker::RateLimitTracker;
