// Logging tests
//
// The subscriber is process-global, so these only check that initialization
// succeeds in either format and that repeated calls are harmless.

use pagewarden::config::{LogFormat, LoggingConfig};
use pagewarden::logging::init_subscriber;

#[test]
fn test_can_initialize_tracing_subscriber() {
    let config = LoggingConfig::default();
    assert!(init_subscriber(&config).is_ok());

    tracing::info!(test = "logging", "subscriber initialized");
}

#[test]
fn test_repeated_initialization_is_ok() {
    let json = LoggingConfig::default();
    let text = LoggingConfig {
        level: "pagewarden=debug".to_string(),
        format: LogFormat::Text,
    };

    assert!(init_subscriber(&json).is_ok());
    assert!(init_subscriber(&text).is_ok());
}

#[test]
fn test_invalid_level_is_rejected_when_rust_log_unset() {
    if std::env::var("RUST_LOG").is_ok() {
        return;
    }
    let config = LoggingConfig {
        level: "pagewarden=notalevel".to_string(),
        format: LogFormat::Json,
    };
    assert!(init_subscriber(&config).is_err());
}
