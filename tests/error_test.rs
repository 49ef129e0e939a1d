use std::error::Error;
use std::sync::Arc;

use muninn::{Fingerprint, MuninnError};

#[test]
fn test_error_display() {
    let err = MuninnError::config("capacity must be positive");
    assert_eq!(
        err.to_string(),
        "configuration error: capacity must be positive"
    );

    let err = MuninnError::CacheTypeMismatch {
        fingerprint: "abc123".into(),
    };
    assert_eq!(
        err.to_string(),
        "cache for fingerprint abc123 holds different key/value types"
    );
}

#[test]
fn test_factory_error_keeps_source() {
    let inner = Arc::new(MuninnError::config("boom"));
    let err = MuninnError::CacheFactory(inner);

    assert_eq!(
        err.to_string(),
        "cache factory failed: configuration error: boom"
    );
    let source = err.source().unwrap();
    assert_eq!(source.to_string(), "configuration error: boom");
}

#[test]
fn test_hex_error_conversion() {
    let err = "zz".parse::<Fingerprint>().unwrap_err();
    assert!(matches!(err, MuninnError::InvalidFingerprint(_)));
    assert!(err.to_string().starts_with("invalid fingerprint:"));
}

#[test]
fn test_errors_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<MuninnError>();
}
