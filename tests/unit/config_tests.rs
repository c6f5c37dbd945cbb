// Configuration unit tests
// Covers file loading, env substitution and query overrides through the
// public API

use pagewarden::config::*;
use pagewarden::source::DocumentLocation;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_example_config_loads_and_validates() {
    let config = Config::from_file("config.example.yaml").expect("example config should load");
    config.validate().expect("example config should validate");

    assert_eq!(config.render.zoom, 1.2);
    assert_eq!(config.progress.page_field, PageField::PagesRead);
    assert_eq!(config.progress.reference, DocumentReference::FileId);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(matches!(
        DocumentLocation::parse(&config.document.source),
        DocumentLocation::Drive { .. }
    ));
}

#[test]
fn test_missing_file_is_read_error() {
    let result = Config::from_file("/nonexistent/pagewarden.yaml");
    assert!(matches!(result, Err(ConfigError::Read(_))));
}

#[test]
fn test_malformed_yaml_is_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"render: [not, a, map").unwrap();
    file.flush().unwrap();

    assert!(matches!(
        Config::from_file(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_alternate_progress_field_names() {
    let yaml = r#"
progress:
  page_field: page_viewed
  reference: pdf_url
logging:
  format: text
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert_eq!(config.progress.page_field, PageField::PageViewed);
    assert_eq!(config.progress.reference, DocumentReference::PdfUrl);
    assert_eq!(config.logging.format, LogFormat::Text);
}

#[test]
fn test_null_ad_slot_disables_ads() {
    let config = Config::from_yaml_with_env("output:\n  ad_slot_text: null\n").unwrap();
    assert_eq!(config.output.ad_slot_text, None);
}

#[test]
fn test_query_overrides_apply_to_source_and_watermark() {
    let mut config = Config::default();
    let overrides = QueryOverrides::from_query(
        "pdf=1xE0DpapZFFP2oj9RGRjOOpKig1ULVl_P&wm=Preview%20copy&email=a%40b.com",
    );
    config.apply_overrides(&overrides);

    assert_eq!(config.document.source, "1xE0DpapZFFP2oj9RGRjOOpKig1ULVl_P");
    assert_eq!(config.watermark.text.as_deref(), Some("Preview copy"));
    assert!(config.watermark.literal);
    // Identity parameters are not configuration
    assert_eq!(overrides.email.as_deref(), Some("a@b.com"));
}

#[test]
fn test_unknown_timestamp_specifier_fails_validation() {
    let config = Config::from_yaml_with_env("watermark:\n  timestamp_format: \"%Y %Q\"\n").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("timestamp_format")));
}
