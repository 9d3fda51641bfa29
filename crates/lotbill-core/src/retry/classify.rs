//! Failure taxonomy for outbound calls.
//!
//! Classification looks at the HTTP status, the provider error code and the
//! message text, in that order of trust, and checks kinds by priority so an
//! authentication failure that also mentions a timeout is still terminal.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{UpstreamError, UNREADABLE_RESPONSE};
use crate::invoice::rules::patterns::{
    AUTH_FAILURE, INVALID_INPUT, NETWORK_FAILURE, POLICY_REJECTION, RATE_LIMIT,
    SERVICE_UNAVAILABLE,
};

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected credentials. Terminal.
    Authentication,
    /// Throttled or out of quota.
    RateLimit,
    /// Timeout, reset connection or name resolution failure.
    Network,
    /// Unsupported file or media type. Terminal.
    InvalidInput,
    /// Refused by a content-safety policy. Terminal.
    PolicyRejection,
    /// Upstream is down or overloaded.
    ServiceUnavailable,
    /// The call succeeded but its response could not be read. Terminal.
    UnreadableResponse,
    /// Anything else. Retried optimistically.
    Unknown,
}

impl ErrorKind {
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            ErrorKind::Authentication
                | ErrorKind::InvalidInput
                | ErrorKind::PolicyRejection
                | ErrorKind::UnreadableResponse
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Network => "network",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::PolicyRejection => "policy_rejection",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::UnreadableResponse => "unreadable_response",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signals a failed call exposes to the classifier.
pub trait FailureSignal: fmt::Display {
    /// HTTP status of the failed response, if any.
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Provider or transport error code.
    fn error_code(&self) -> Option<&str> {
        None
    }

    /// Server-requested delay before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl FailureSignal for UpstreamError {
    fn status_code(&self) -> Option<u16> {
        self.status
    }

    fn error_code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

/// Classify a failure.
pub fn classify<E: FailureSignal + ?Sized>(error: &E) -> ErrorKind {
    let status = error.status_code();
    let text = match error.error_code() {
        Some(code) => format!("{} {}", code, error),
        None => error.to_string(),
    };

    if error.error_code() == Some(UNREADABLE_RESPONSE) {
        ErrorKind::UnreadableResponse
    } else if matches!(status, Some(401 | 403)) || AUTH_FAILURE.is_match(&text) {
        ErrorKind::Authentication
    } else if status == Some(429) || RATE_LIMIT.is_match(&text) {
        ErrorKind::RateLimit
    } else if matches!(status, Some(408)) || NETWORK_FAILURE.is_match(&text) {
        ErrorKind::Network
    } else if status == Some(415) || INVALID_INPUT.is_match(&text) {
        ErrorKind::InvalidInput
    } else if POLICY_REJECTION.is_match(&text) {
        ErrorKind::PolicyRejection
    } else if matches!(status, Some(502..=504)) || SERVICE_UNAVAILABLE.is_match(&text) {
        ErrorKind::ServiceUnavailable
    } else {
        ErrorKind::Unknown
    }
}

/// Parse a `Retry-After` header value.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    parse_retry_after_at(value, Utc::now())
}

/// Parse a `Retry-After` value relative to `now`.
///
/// Accepts delay-seconds (fractions allowed) or an HTTP date. Dates in the
/// past yield a zero delay.
pub fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(seconds) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).ok();
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_classify_by_status() {
        assert_eq!(classify(&UpstreamError::http(401, "nope")), ErrorKind::Authentication);
        assert_eq!(classify(&UpstreamError::http(403, "nope")), ErrorKind::Authentication);
        assert_eq!(classify(&UpstreamError::http(429, "slow down")), ErrorKind::RateLimit);
        assert_eq!(classify(&UpstreamError::http(415, "nope")), ErrorKind::InvalidInput);
        assert_eq!(classify(&UpstreamError::http(503, "nope")), ErrorKind::ServiceUnavailable);
        assert_eq!(classify(&UpstreamError::http(500, "boom")), ErrorKind::Unknown);
    }

    #[test]
    fn test_classify_by_code_and_message() {
        let reset = UpstreamError::new("socket closed").with_code("ECONNRESET");
        assert_eq!(classify(&reset), ErrorKind::Network);
        assert_eq!(classify(&UpstreamError::new("request timed out")), ErrorKind::Network);
        assert_eq!(
            classify(&UpstreamError::new("quota exceeded for project")),
            ErrorKind::RateLimit
        );
        assert_eq!(
            classify(&UpstreamError::new("Unsupported file type: image/tiff")),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            classify(&UpstreamError::new("response blocked by safety settings")),
            ErrorKind::PolicyRejection
        );
        assert_eq!(
            classify(&UpstreamError::new("model is overloaded")),
            ErrorKind::ServiceUnavailable
        );
        assert_eq!(classify(&UpstreamError::new("something odd")), ErrorKind::Unknown);
    }

    #[test]
    fn test_classify_priority() {
        // Authentication wins over everything else.
        let err = UpstreamError::http(503, "invalid API key after timeout");
        assert_eq!(classify(&err), ErrorKind::Authentication);

        // An unreadable success body is terminal whatever its text says.
        let err = UpstreamError::unreadable_response("error decoding response body: timed out");
        assert_eq!(classify(&err), ErrorKind::UnreadableResponse);

        // Rate limit outranks a 503.
        let err = UpstreamError::http(503, "rate limit reached");
        assert_eq!(classify(&err), ErrorKind::RateLimit);
    }

    #[test]
    fn test_transience() {
        assert!(!ErrorKind::Authentication.is_transient());
        assert!(!ErrorKind::InvalidInput.is_transient());
        assert!(!ErrorKind::PolicyRejection.is_transient());
        assert!(!ErrorKind::UnreadableResponse.is_transient());
        assert!(ErrorKind::RateLimit.is_transient());
        assert!(ErrorKind::Network.is_transient());
        assert!(ErrorKind::ServiceUnavailable.is_transient());
        assert!(ErrorKind::Unknown.is_transient());
    }

    #[test]
    fn test_parse_retry_after() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(parse_retry_after_at("120", now), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after_at(" 1.5 ", now), Some(Duration::from_millis(1500)));
        assert_eq!(
            parse_retry_after_at("Wed, 21 Oct 2015 07:28:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after_at("Wed, 21 Oct 2015 07:00:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after_at("-1", now), None);
        assert_eq!(parse_retry_after_at("soon", now), None);
        assert_eq!(parse_retry_after_at("", now), None);
    }
}
