//! Tests for the layered configuration.

use porter_core::JobState;
use porter_rate_limit::{PorterConfig, RateLimitedClient};
use porter_core::SystemClock;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::Builder;

#[test]
fn test_load_bundled_defaults() {
    let config = PorterConfig::load().unwrap();

    assert!(*config.rate_limit.reserve_threshold() >= 1);
    assert!(*config.rate_limit.max_attempts() >= 1);
    assert!(config.platforms.contains_key("github"));
    assert!(config.platforms.contains_key("gitlab"));
    assert_eq!(config.platform("github").unwrap().token_env, "GITHUB_TOKEN");
}

#[test]
fn test_defaults_match_documented_values() {
    let config = PorterConfig::default();
    assert_eq!(*config.rate_limit.reserve_threshold(), 2);
    assert_eq!(config.rate_limit.safety_margin(), Duration::from_secs(5));
    assert_eq!(*config.rate_limit.max_attempts(), 3);
    assert_eq!(*config.cache.default_ttl(), 300);

    let policy = config.backoff.policy();
    assert_eq!(policy.initial(), Duration::from_secs(1));
    assert_eq!(policy.max_delay(), Duration::from_secs(300));
    assert!((policy.jitter() - 0.2).abs() < f64::EPSILON);

    let orchestrator = &config.orchestrator;
    assert_eq!(orchestrator.timeout_for(JobState::Analyzing), Some(Duration::from_secs(120)));
    assert_eq!(orchestrator.timeout_for(JobState::Cloning), Some(Duration::from_secs(600)));
    assert_eq!(orchestrator.timeout_for(JobState::Transforming), Some(Duration::from_secs(600)));
    assert_eq!(orchestrator.timeout_for(JobState::Reporting), Some(Duration::from_secs(120)));
    assert_eq!(orchestrator.timeout_for(JobState::Publishing), Some(Duration::from_secs(120)));
    assert_eq!(orchestrator.timeout_for(JobState::Notifying), Some(Duration::from_secs(60)));
    assert_eq!(orchestrator.timeout_for(JobState::Completed), None);
}

#[test]
fn test_config_from_file_merges_partial_sections() {
    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        temp_file,
        r#"
[rate_limit]
max_attempts = 5

[cache]
default_ttl = 60

[orchestrator]
branch_prefix = "migrate/jdk"
publishing_timeout_secs = 30

[platforms.github]
api_base = "https://github.acme.com/api/v3"
token_env = "ACME_GITHUB_TOKEN"
"#
    )
    .unwrap();

    let config = PorterConfig::from_file(temp_file.path()).unwrap();
    assert_eq!(*config.rate_limit.max_attempts(), 5);
    assert_eq!(*config.rate_limit.reserve_threshold(), 2);
    assert_eq!(*config.cache.default_ttl(), 60);
    assert_eq!(*config.cache.max_size(), 1000);
    assert_eq!(config.orchestrator.branch_prefix(), "migrate/jdk");
    assert_eq!(
        config.orchestrator.timeout_for(JobState::Publishing),
        Some(Duration::from_secs(30))
    );
    let github = config.platform("github").unwrap();
    assert_eq!(github.api_base.as_deref(), Some("https://github.acme.com/api/v3"));
    assert!(config.platform("gitlab").is_none());
}

#[test]
fn test_invalid_values_are_rejected() {
    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(temp_file, "[rate_limit]\nmax_attempts = 0").unwrap();
    let err = PorterConfig::from_file(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("max_attempts"));

    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(temp_file, "[backoff]\njitter_fraction = 1.5").unwrap();
    assert!(PorterConfig::from_file(temp_file.path()).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(PorterConfig::from_file("/nonexistent/porter.toml").is_err());
}

#[test]
fn test_client_from_config_uses_retry_cap() {
    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(temp_file, "[rate_limit]\nmax_attempts = 4\nrequests_per_second = 0").unwrap();
    let config = PorterConfig::from_file(temp_file.path()).unwrap();
    let client = RateLimitedClient::from_config(&config, Arc::new(SystemClock));
    assert_eq!(client.max_attempts(), 4);
}
