//! Tests for HTTP failure classification.

use comicsmith_error::{ProviderErrorKind, RetryableError};
use comicsmith_models::{classify_status, parse_retry_after};
use std::time::Duration;

#[test]
fn test_transient_statuses_are_retryable() {
    for status in [408, 429, 500, 502, 503, 504] {
        let err = classify_status(status, None, "try again");
        assert!(err.is_retryable(), "status {} should be retryable", status);
    }
}

#[test]
fn test_client_errors_are_not_retryable() {
    for status in [400, 401, 403, 404, 422] {
        let err = classify_status(status, None, "nope");
        assert!(!err.is_retryable(), "status {} should not be retryable", status);
    }
}

#[test]
fn test_authentication_statuses() {
    let err = classify_status(401, None, "bad key");
    assert!(matches!(err.kind, ProviderErrorKind::Authentication(_)));
    let err = classify_status(403, None, "forbidden");
    assert!(matches!(err.kind, ProviderErrorKind::Authentication(_)));
}

#[test]
fn test_content_policy_detected_from_body() {
    let body = r#"{"error":{"code":"content_policy_violation","message":"Your request was rejected as a result of our safety system."}}"#;
    let err = classify_status(400, None, body);
    assert!(matches!(err.kind, ProviderErrorKind::ContentPolicy(_)));
    assert!(!err.is_retryable());
}

#[test]
fn test_server_error_mentioning_policy_stays_transient() {
    let err = classify_status(500, None, "content_policy service unavailable");
    assert!(matches!(err.kind, ProviderErrorKind::Server { status_code: 500, .. }));
}

#[test]
fn test_retry_after_is_carried_on_rate_limit() {
    let err = classify_status(429, Some("12"), "");
    assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));

    let err = classify_status(429, Some("Wed, 21 Oct 2015 07:28:00 GMT"), "");
    assert_eq!(err.retry_after(), None);
    assert!(err.is_retryable());
}

#[test]
fn test_parse_retry_after() {
    assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
    assert_eq!(parse_retry_after(" 1.5 "), Some(Duration::from_millis(1500)));
    assert_eq!(parse_retry_after("-1"), None);
    assert_eq!(parse_retry_after("soon"), None);
}
