//! Quota detection from platform response headers.
//!
//! GitHub and GitLab both report the current quota window on every
//! response, under different header names:
//! - GitHub: `x-ratelimit-limit`, `x-ratelimit-remaining`,
//!   `x-ratelimit-reset` (unix seconds) and `x-ratelimit-resource`
//! - GitLab: `ratelimit-limit`, `ratelimit-remaining`, `ratelimit-reset`
//!
//! Secondary limits are announced with `retry-after` (seconds).

use chrono::{DateTime, Duration, Utc};
use porter_core::{Endpoint, Platform, QuotaObservation};
use reqwest::header::HeaderMap;
use tracing::{debug, instrument};

/// Reads quota observations from response headers for one platform.
///
/// # Example
///
/// ```
/// use porter_core::{Endpoint, Platform};
/// use porter_rate_limit::HeaderQuotaDetector;
/// use reqwest::header::{HeaderMap, HeaderValue};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
/// headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4990"));
/// headers.insert("x-ratelimit-reset", HeaderValue::from_static("1767225600"));
/// headers.insert("x-ratelimit-resource", HeaderValue::from_static("core"));
///
/// let (endpoint, quota) = HeaderQuotaDetector::new(Platform::GitHub)
///     .detect(&headers)
///     .unwrap();
/// assert_eq!(endpoint, Endpoint::Core);
/// assert_eq!(quota.remaining, 4990);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HeaderQuotaDetector {
    platform: Platform,
}

impl HeaderQuotaDetector {
    /// Create a detector for `platform`'s header conventions.
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Quota observation carried by `headers`, with the endpoint it applies
    /// to. Missing or malformed headers yield `None`.
    #[instrument(skip(self, headers), fields(platform = %self.platform))]
    pub fn detect(&self, headers: &HeaderMap) -> Option<(Endpoint, QuotaObservation)> {
        let detected = match self.platform {
            Platform::GitHub => detect_github(headers),
            Platform::GitLab => detect_gitlab(headers),
        };
        if let Some((endpoint, quota)) = &detected {
            debug!(
                endpoint = %endpoint,
                limit = quota.limit,
                remaining = quota.remaining,
                "Detected quota from headers"
            );
        }
        detected
    }

    /// Whether the headers show an exhausted window.
    pub fn is_exhausted(&self, headers: &HeaderMap) -> bool {
        self.detect(headers)
            .is_some_and(|(_, quota)| quota.remaining == 0)
    }

    /// When a refused call may be retried, from `retry-after` or the quota
    /// reset header.
    pub fn retry_at(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(secs) = parse_header_u64(headers, "retry-after") {
            let secs = i64::try_from(secs).ok()?;
            return now.checked_add_signed(Duration::try_seconds(secs)?);
        }
        self.detect(headers).map(|(_, quota)| quota.reset_at)
    }
}

fn detect_github(headers: &HeaderMap) -> Option<(Endpoint, QuotaObservation)> {
    let limit = parse_header_u32(headers, "x-ratelimit-limit")?;
    let remaining = parse_header_u32(headers, "x-ratelimit-remaining")?;
    let reset_at = parse_reset(headers, "x-ratelimit-reset")?;
    let endpoint = headers
        .get("x-ratelimit-resource")
        .and_then(|v| v.to_str().ok())
        .map(github_resource)
        .unwrap_or(Endpoint::Core);
    Some((
        endpoint,
        QuotaObservation {
            limit,
            remaining,
            reset_at,
        },
    ))
}

fn detect_gitlab(headers: &HeaderMap) -> Option<(Endpoint, QuotaObservation)> {
    let limit = parse_header_u32(headers, "ratelimit-limit")?;
    let remaining = parse_header_u32(headers, "ratelimit-remaining")?;
    let reset_at = parse_reset(headers, "ratelimit-reset")?;
    Some((
        Endpoint::Core,
        QuotaObservation {
            limit,
            remaining,
            reset_at,
        },
    ))
}

/// Map GitHub's `x-ratelimit-resource` onto our categories.
fn github_resource(resource: &str) -> Endpoint {
    match resource {
        "search" | "code_search" => Endpoint::Search,
        "graphql" => Endpoint::Graphql,
        _ => Endpoint::Core,
    }
}

/// Helper to parse u32 from header value.
fn parse_header_u32(headers: &HeaderMap, key: &str) -> Option<u32> {
    headers.get(key)?.to_str().ok()?.trim().parse().ok()
}

/// Helper to parse u64 from header value.
fn parse_header_u64(headers: &HeaderMap, key: &str) -> Option<u64> {
    headers.get(key)?.to_str().ok()?.trim().parse().ok()
}

/// Helper to parse a unix-seconds reset header.
fn parse_reset(headers: &HeaderMap, key: &str) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(parse_header_u64(headers, key)?).ok()?;
    DateTime::from_timestamp(secs, 0)
}
