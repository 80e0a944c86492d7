//! Per-endpoint quota snapshots.

use chrono::{DateTime, Utc};
use porter_error::ReportedQuota;
use serde::{Deserialize, Serialize};

/// Quota category an external call is charged against.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Endpoint {
    /// REST calls
    Core,
    /// Search API
    Search,
    /// GraphQL API
    Graphql,
}

/// Quota values read from a single response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaObservation {
    /// Requests allowed per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

impl From<ReportedQuota> for QuotaObservation {
    fn from(quota: ReportedQuota) -> Self {
        Self {
            limit: quota.limit,
            remaining: quota.remaining,
            reset_at: quota.reset_at,
        }
    }
}

impl From<QuotaObservation> for ReportedQuota {
    fn from(quota: QuotaObservation) -> Self {
        Self {
            limit: quota.limit,
            remaining: quota.remaining,
            reset_at: quota.reset_at,
        }
    }
}

/// Tracked quota for one endpoint category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Requests allowed per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
    /// The credential raised the limit tier
    pub authenticated: bool,
}

impl QuotaState {
    /// Whether the window has already rolled over at `now`.
    pub fn is_reset(&self, now: DateTime<Utc>) -> bool {
        self.reset_at <= now
    }
}

/// Payload of one external call together with the quota it reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed<T> {
    /// Decoded response
    pub payload: T,
    /// Quota read from the response headers, when present and well formed
    pub quota: Option<QuotaObservation>,
}

impl<T> Observed<T> {
    /// A payload with quota metadata.
    pub fn new(payload: T, quota: Option<QuotaObservation>) -> Self {
        Self { payload, quota }
    }

    /// A payload without quota metadata.
    pub fn bare(payload: T) -> Self {
        Self {
            payload,
            quota: None,
        }
    }

    /// Transform the payload, keeping the quota.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Observed<U> {
        Observed {
            payload: f(self.payload),
            quota: self.quota,
        }
    }
}
