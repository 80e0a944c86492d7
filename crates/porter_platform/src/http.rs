//! Shared HTTP plumbing: response decoding and failure classification.

use chrono::{DateTime, Utc};
use porter_core::Observed;
use porter_error::{ApiError, ApiErrorKind};
use porter_rate_limit::HeaderQuotaDetector;
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

/// User agent sent with every platform request.
pub(crate) const USER_AGENT: &str = concat!("porter/", env!("CARGO_PKG_VERSION"));

/// Classify a non-success response.
///
/// - 403/429 with an exhausted quota or a `retry-after` header: `RateLimited`
///   (a bare 429 is always `RateLimited`)
/// - 5xx: `Server`
/// - 409, 422, or a 400 reporting that something already exists: `Conflict`
/// - anything else: `Rejected`
///
/// Quota headers on the response ride along on the error.
pub fn classify_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    detector: &HeaderQuotaDetector,
    now: DateTime<Utc>,
) -> ApiError {
    let code = status.as_u16();
    let quota_signal = detector.is_exhausted(headers) || headers.contains_key("retry-after");

    let kind = match code {
        403 | 429 if quota_signal => ApiErrorKind::RateLimited {
            reset_at: detector.retry_at(headers, now),
        },
        429 => ApiErrorKind::RateLimited { reset_at: None },
        500..=599 => ApiErrorKind::Server {
            status: code,
            message: body.to_string(),
        },
        409 | 422 => ApiErrorKind::Conflict(body.to_string()),
        400 if body.contains("already exists") => ApiErrorKind::Conflict(body.to_string()),
        _ => ApiErrorKind::Rejected {
            status: code,
            message: body.to_string(),
        },
    };
    let err = ApiError::new(kind);
    match detector.detect(headers) {
        Some((_, quota)) => err.with_quota(quota.into()),
        None => err,
    }
}

/// Map a transport error to `Network`, or `Decode` for a body that could
/// not be read as JSON.
pub fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_decode() {
        ApiError::new(ApiErrorKind::Decode(err.to_string()))
    } else {
        ApiError::network(err.to_string())
    }
}

/// Decode a JSON response together with the quota its headers report.
pub(crate) async fn decode<T: DeserializeOwned>(
    response: Response,
    detector: &HeaderQuotaDetector,
    now: DateTime<Utc>,
) -> Result<Observed<T>, ApiError> {
    let status = response.status();
    let headers = response.headers().clone();
    let quota = detector.detect(&headers).map(|(_, quota)| quota);

    if !status.is_success() {
        return Err(refusal(response, &headers, detector, now).await);
    }

    let payload: T = response.json().await.map_err(|e| {
        error!(error = ?e, "Failed to parse platform response");
        ApiError::new(ApiErrorKind::Decode(e.to_string()))
    })?;
    debug!(status = %status, "Platform call succeeded");
    Ok(Observed::new(payload, quota))
}

/// Read a raw file response. A 404 means the file is absent.
pub(crate) async fn decode_file(
    response: Response,
    detector: &HeaderQuotaDetector,
    now: DateTime<Utc>,
) -> Result<Observed<Option<String>>, ApiError> {
    let status = response.status();
    let headers = response.headers().clone();
    let quota = detector.detect(&headers).map(|(_, quota)| quota);

    if status == StatusCode::NOT_FOUND {
        debug!("File not present");
        return Ok(Observed::new(None, quota));
    }
    if !status.is_success() {
        return Err(refusal(response, &headers, detector, now).await);
    }

    let content = response.text().await.map_err(transport_error)?;
    debug!(bytes = content.len(), "Read file");
    Ok(Observed::new(Some(content), quota))
}

/// Drain a failed response and classify it.
async fn refusal(
    response: Response,
    headers: &HeaderMap,
    detector: &HeaderQuotaDetector,
    now: DateTime<Utc>,
) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let err = classify_response(status, headers, &body, detector, now);
    if status.is_server_error() || err.kind.is_quota_exceeded() {
        warn!(status = %status, error = %err, "Platform call failed");
    } else {
        error!(status = %status, body = %body, "Platform refused call");
    }
    err
}
