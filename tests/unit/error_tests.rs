// Error taxonomy tests
// Each failure class maps to exactly one degradation path

use pagewarden::identity::IdentityError;
use pagewarden::render::RenderError;
use pagewarden::watermark::WatermarkError;
use pagewarden::ViewerError;

#[test]
fn test_render_parse_error_becomes_parse_failure() {
    let err: ViewerError = RenderError::Parse("bad xref".to_string()).into();
    assert_eq!(err, ViewerError::Parse("bad xref".to_string()));
    assert_eq!(err.to_string(), "Failed to parse PDF: bad xref");
    assert!(!err.falls_back_to_sample());
}

#[test]
fn test_other_render_errors_become_render_failures() {
    let err: ViewerError = RenderError::PageOutOfRange { index: 4, count: 3 }.into();
    assert!(matches!(err, ViewerError::Render(_)));

    let err: ViewerError = WatermarkError::FontError("missing".to_string()).into();
    assert!(matches!(err, ViewerError::Render(_)));
}

#[test]
fn test_identity_errors_degrade_to_guest() {
    let err: ViewerError = IdentityError::Provider("access_denied".to_string()).into();
    assert!(matches!(err, ViewerError::AuthFailure(_)));
    assert!(err.falls_back_to_sample());
}

#[test]
fn test_transport_errors_fall_back() {
    let err = ViewerError::Transport("Connection failed".to_string());
    assert!(err.falls_back_to_sample());
}

#[test]
fn test_denial_does_not_fall_back() {
    let err = ViewerError::AccessDenied {
        file_id: "abc".to_string(),
        status: 403,
    };
    assert!(!err.falls_back_to_sample());
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let err: ViewerError = io.into();
    assert!(matches!(err, ViewerError::Io(msg) if msg.contains("read-only")));
}
