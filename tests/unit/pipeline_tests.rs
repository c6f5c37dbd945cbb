// End-to-end viewer pipeline tests
//
// Drive and the script endpoint are replaced with in-process HTTP stubs;
// documents are rendered either by the real hayro engine (bundled sample) or
// by a fixed-size fake engine when only the page count matters.

use crate::stub_server::{StubServer, REFUSED_URL};
use bytes::Bytes;
use image::{Rgba, RgbaImage};
use pagewarden::access::{DenialChoice, REQUEST_SUBMITTED};
use pagewarden::config::Config;
use pagewarden::identity::Credentials;
use pagewarden::render::{Document, DocumentEngine, PageSize, RenderError};
use pagewarden::source::{DocumentLocation, SAMPLE_PDF};
use pagewarden::viewer::{Viewer, ViewerState};
use std::sync::Arc;
use tempfile::TempDir;

const FILE_ID: &str = "1xE0DpapZFFP2oj9RGRjOOpKig1ULVl_P";

/// Letter-sized pages of plain white.
struct BlankDocument {
    pages: u32,
}

impl Document for BlankDocument {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn page_size(&self, index: u32) -> Result<PageSize, RenderError> {
        if index == 0 || index > self.pages {
            return Err(RenderError::PageOutOfRange {
                index,
                count: self.pages,
            });
        }
        Ok(PageSize::new(612.0, 792.0))
    }

    fn rasterize(&self, index: u32, zoom: f32) -> Result<RgbaImage, RenderError> {
        let (w, h) = self.page_size(index)?.surface_size(zoom);
        Ok(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])))
    }
}

struct BlankEngine {
    pages: u32,
}

impl DocumentEngine for BlankEngine {
    fn open(&self, _bytes: Bytes) -> Result<Arc<dyn Document>, RenderError> {
        Ok(Arc::new(BlankDocument { pages: self.pages }))
    }
}

fn config(out: &TempDir, documents: &str, script: Option<&str>) -> Config {
    let mut config = Config::default();
    config.output.directory = out.path().to_path_buf();
    config.endpoints.documents = documents.to_string();
    config.endpoints.script = script.map(str::to_string);
    config.document.fetch_timeout_seconds = 5;
    config.endpoints.timeout_seconds = 5;
    config
}

fn reader(email: &str, token: &str) -> Credentials {
    Credentials {
        preset_email: Some(email.to_string()),
        preset_token: Some(token.to_string()),
        ..Default::default()
    }
}

fn drive() -> DocumentLocation {
    DocumentLocation::parse(FILE_ID)
}

#[tokio::test]
async fn test_three_pages_produce_three_reports_ending_at_three() {
    let out = TempDir::new().unwrap();
    let documents = StubServer::start(200, "application/pdf", b"%PDF-stub".to_vec()).await;
    let script = StubServer::start(200, "application/json", b"{}".to_vec()).await;

    let mut viewer = Viewer::new(config(&out, &documents.url, Some(&script.url)))
        .unwrap()
        .with_engine(Arc::new(BlankEngine { pages: 3 }));

    let outcome = viewer
        .run(&reader("a@b.com", "ya29.tok"), &drive(), DenialChoice::RequestAccess)
        .await
        .unwrap();
    assert_eq!(outcome.state, ViewerState::Rendered);
    assert_eq!(outcome.label.as_deref(), Some("Page 3 of 3"));

    let stats = viewer.shutdown().await;
    assert_eq!(stats.delivered, 3);

    let reports: Vec<serde_json::Value> = script
        .requests()
        .iter()
        .filter(|r| r.method == "POST")
        .map(|r| serde_json::from_str(&r.body).unwrap())
        .collect();
    assert_eq!(reports.len(), 3);

    let pages_read: Vec<u64> = reports
        .iter()
        .map(|r| r["pagesRead"].as_u64().unwrap())
        .collect();
    assert!(pages_read.windows(2).all(|w| w[0] <= w[1]), "{:?}", pages_read);
    assert_eq!(pages_read.last(), Some(&3));

    for report in &reports {
        assert_eq!(report["email"], "a@b.com");
        assert_eq!(report["fileId"], FILE_ID);
        assert_eq!(report["totalPages"], 3);
        assert!(report["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    let fetch = &documents.requests()[0];
    assert_eq!(fetch.target, format!("/{}?alt=media", FILE_ID));
    assert_eq!(fetch.header("authorization"), Some("Bearer ya29.tok"));
}

#[tokio::test]
async fn test_forbidden_fetch_shows_denial_and_requests_access() {
    let out = TempDir::new().unwrap();
    let documents = StubServer::start(403, "application/json", b"{\"error\":\"forbidden\"}".to_vec()).await;
    let script = StubServer::start(200, "application/json", b"{\"ok\":true}".to_vec()).await;

    let mut viewer = Viewer::new(config(&out, &documents.url, Some(&script.url))).unwrap();
    let outcome = viewer
        .run(&reader("a@b.com", "ya29.tok"), &drive(), DenialChoice::RequestAccess)
        .await
        .unwrap();

    // The bundled sample is shown under the denial notice
    assert_eq!(outcome.state, ViewerState::Rendered);
    let notice = outcome.notice.expect("denial notice");
    assert_eq!(notice.status.as_deref(), Some(REQUEST_SUBMITTED));
    assert_eq!(outcome.pages.len(), 2);
    assert_eq!((outcome.pages[0].width, outcome.pages[0].height), (734, 950));

    let request = script
        .requests()
        .into_iter()
        .find(|r| r.method == "GET")
        .expect("access request");
    assert!(request.target.contains("action=requestAccess"));
    assert!(request.target.contains(&format!("fileId={}", FILE_ID)));
    assert!(request.target.contains("email=a%40b.com"));

    let html = std::fs::read_to_string(outcome.index_path).unwrap();
    assert!(html.contains("Access restricted"));

    viewer.shutdown().await;
}

#[tokio::test]
async fn test_network_failure_falls_back_without_denial() {
    let out = TempDir::new().unwrap();
    let mut viewer = Viewer::new(config(&out, REFUSED_URL, None)).unwrap();

    let outcome = viewer
        .run(&reader("a@b.com", "ya29.tok"), &drive(), DenialChoice::RequestAccess)
        .await
        .unwrap();

    assert_eq!(outcome.state, ViewerState::Rendered);
    assert!(outcome.notice.is_none());
    assert!(outcome.message.is_none());
    assert_eq!(outcome.pages.len(), 2);

    let html = std::fs::read_to_string(outcome.index_path).unwrap();
    assert!(!html.contains("Access restricted"));
}

#[tokio::test]
async fn test_guest_never_contacts_drive() {
    let out = TempDir::new().unwrap();
    let documents = StubServer::start(200, "application/pdf", SAMPLE_PDF.to_vec()).await;

    let mut viewer = Viewer::new(config(&out, &documents.url, None))
        .unwrap()
        .with_engine(Arc::new(BlankEngine { pages: 1 }));
    let outcome = viewer
        .run(&Credentials::default(), &drive(), DenialChoice::RequestAccess)
        .await
        .unwrap();

    assert!(outcome.session.is_guest());
    assert_eq!(outcome.state, ViewerState::Rendered);
    assert!(documents.requests().is_empty());
}

#[tokio::test]
async fn test_access_check_denial_skips_fetch() {
    let out = TempDir::new().unwrap();
    let documents = StubServer::start(200, "application/pdf", SAMPLE_PDF.to_vec()).await;
    let script = StubServer::start(
        200,
        "application/json",
        b"{\"status\":\"denied\",\"hasAccess\":false}".to_vec(),
    )
    .await;

    let mut cfg = config(&out, &documents.url, Some(&script.url));
    cfg.document.access_check = true;
    cfg.progress.enabled = false;

    let mut viewer = Viewer::new(cfg)
        .unwrap()
        .with_engine(Arc::new(BlankEngine { pages: 1 }));
    let outcome = viewer
        .run(&reader("a@b.com", "ya29.tok"), &drive(), DenialChoice::ViewSample)
        .await
        .unwrap();

    assert!(documents.requests().is_empty());
    let notice = outcome.notice.expect("denial notice");
    assert_eq!(notice.status, None);
    assert_eq!(script.requests().len(), 1);
}

#[tokio::test]
async fn test_watermark_override_reaches_every_page() {
    let out = TempDir::new().unwrap();
    let mut cfg = config(&out, REFUSED_URL, None);
    cfg.watermark.text = Some("CONFIDENTIAL".to_string());

    let mut viewer = Viewer::new(cfg)
        .unwrap()
        .with_engine(Arc::new(BlankEngine { pages: 2 }));
    let outcome = viewer
        .run(&Credentials::default(), &DocumentLocation::Fallback, DenialChoice::RequestAccess)
        .await
        .unwrap();

    for page in &outcome.pages {
        let image = image::open(out.path().join(&page.file_name)).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (734, 950));
        assert!(
            image.pixels().any(|p| p[0] < 255),
            "page {} should carry a watermark",
            page.index
        );
    }
}
