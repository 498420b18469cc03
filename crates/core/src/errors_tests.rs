use super::*;

#[test]
fn test_unrecoverable_is_not_recoverable() {
    let error = CheckRunError::Unrecoverable("panic in projector".to_string());
    assert!(!error.is_recoverable());
}

#[test]
fn test_configuration_error_is_recoverable() {
    let error = CheckRunError::ConfigurationError("missing .jcheck/conf".to_string());
    assert!(error.is_recoverable());
}

#[test]
fn test_adapter_error_conversion() {
    let adapter_error = jcheck_platforms::errors::Error::RateLimitExceeded;
    let error: CheckRunError = adapter_error.into();
    assert!(matches!(error, CheckRunError::AdapterError(_)));
}
