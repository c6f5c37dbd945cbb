//! Viewer controller.
//!
//! [`Viewer`] owns everything a load attempt needs: the identity provider,
//! source resolver, document engine, watermarker, progress reporter and
//! output writer. [`Viewer::run`] drives one attempt through the lifecycle in
//! [`state`] and always ends with an `index.html` showing either rendered
//! pages or a textual message.
//!
//! Pages are processed concurrently, at most `render.max_concurrent_pages`
//! at a time. Each page's own steps are strictly ordered: render, watermark
//! and encode, record progress, report.

pub mod output;
pub mod state;

pub use output::{escape_html, page_file_name, Notice, OutputWriter, PageContent, PageEntry};
pub use state::{TransitionError, ViewerState};

use crate::access::{AccessDecision, AccessRequestFlow, DenialChoice, ScriptClient};
use crate::config::{Config, DocumentReference};
use crate::error::ViewerError;
use crate::identity::{authenticate, Credentials, GoogleIdentity, IdentityProvider, Session};
use crate::progress::reporter::ReporterStats;
use crate::progress::{
    HttpProgressTransport, ProgressReport, ProgressReporter, ProgressState, ProgressTransport,
};
use crate::protection::ContentGuard;
use crate::render::{DocumentEngine, DocumentHandle, HayroEngine};
use crate::source::{DocumentLocation, FallbackReason, Resolution, SourceResolver};
use crate::watermark::{StampContext, Watermarker};
use bytes::Bytes;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// How a load attempt ended.
#[derive(Debug, Clone)]
pub struct ViewerOutcome {
    pub state: ViewerState,
    pub session: Session,
    /// Pages written, in document order
    pub pages: Vec<PageEntry>,
    /// Progress label at the end of rendering
    pub label: Option<String>,
    /// Denial notice shown above the fallback document
    pub notice: Option<Notice>,
    /// Text shown instead of the viewer
    pub message: Option<String>,
    pub index_path: PathBuf,
}

/// Document chosen for rendering, with how progress reports refer to it.
struct LoadedDocument {
    bytes: Bytes,
    reference: String,
    reference_kind: DocumentReference,
}

pub struct Viewer {
    config: Config,
    identity: Arc<dyn IdentityProvider>,
    resolver: SourceResolver,
    script: Option<ScriptClient>,
    engine: Arc<dyn DocumentEngine>,
    watermarker: Arc<Watermarker>,
    progress: Arc<ProgressState>,
    reporter: ProgressReporter,
    writer: Arc<OutputWriter>,
    state: ViewerState,
}

impl Viewer {
    /// Build a viewer from configuration. Must be called inside a tokio
    /// runtime when progress reporting is enabled.
    pub fn new(config: Config) -> Result<Self, ViewerError> {
        config
            .validate()
            .map_err(|e| ViewerError::Config(e.to_string()))?;

        let identity = GoogleIdentity::new(config.identity.clone())
            .map_err(|e| ViewerError::Config(e.to_string()))?;
        let resolver = SourceResolver::new(&config.document, &config.endpoints)?;
        let script = match &config.endpoints.script {
            Some(url) => Some(ScriptClient::new(
                url.clone(),
                Duration::from_secs(config.endpoints.timeout_seconds),
            )?),
            None => None,
        };

        let reporter = match (&script, config.progress.enabled) {
            (Some(script), true) => ProgressReporter::spawn(
                Arc::new(HttpProgressTransport::new(script.clone())),
                config.progress.queue_capacity,
            ),
            _ => ProgressReporter::disabled(),
        };

        let watermarker = Watermarker::new(config.watermark.clone())?;
        let writer = OutputWriter::new(&config.output, ContentGuard::new(&config.protection));

        Ok(Self {
            identity: Arc::new(identity),
            resolver,
            script,
            engine: Arc::new(HayroEngine),
            watermarker: Arc::new(watermarker),
            progress: Arc::new(ProgressState::new()),
            reporter,
            writer: Arc::new(writer),
            state: ViewerState::Unauthenticated,
            config,
        })
    }

    pub fn with_engine(mut self, engine: Arc<dyn DocumentEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_identity_provider(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    /// Replace the progress transport regardless of the configured endpoint.
    pub fn with_progress_transport(mut self, transport: Arc<dyn ProgressTransport>) -> Self {
        self.reporter = ProgressReporter::spawn(transport, self.config.progress.queue_capacity);
        self
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    fn advance(&mut self, next: ViewerState) -> Result<(), ViewerError> {
        let from = self.state;
        self.state = from.transition(next)?;
        tracing::debug!(from = %from, to = %next, "Viewer state");
        Ok(())
    }

    /// Run one load attempt for `location`.
    ///
    /// Only output I/O failures and lifecycle violations are returned as
    /// errors; every other failure ends in a rendered fallback or a message
    /// page.
    pub async fn run(
        &mut self,
        credentials: &Credentials,
        location: &DocumentLocation,
        on_denied: DenialChoice,
    ) -> Result<ViewerOutcome, ViewerError> {
        match self.state {
            ViewerState::Unauthenticated => {}
            state if state.is_terminal() => self.advance(ViewerState::Unauthenticated)?,
            state => {
                tracing::warn!(state = %state, "Previous load attempt was interrupted");
                self.state = ViewerState::Unauthenticated;
            }
        }
        self.writer.prepare()?;

        self.advance(ViewerState::Authenticating)?;
        let session = authenticate(self.identity.as_ref(), credentials).await;

        let mut notice = None;
        let resolution = match self.precheck_access(&session, location).await {
            AccessDecision::Denied => Ok(Resolution::Denied {
                file_id: location.file_id().unwrap_or_default().to_string(),
                status: 403,
            }),
            AccessDecision::Granted | AccessDecision::Unknown => {
                self.resolver.resolve(location, session.bearer()).await
            }
        };

        let resolution = match resolution {
            Ok(resolution) => resolution,
            Err(e) => {
                // Direct URL or path that could not be read, or an
                // unreadable fallback
                self.advance(ViewerState::AccessGranted)?;
                return self.fail(session, format!("Failed to load PDF: {}", e));
            }
        };

        let document = match resolution {
            Resolution::Loaded { location, bytes } => {
                self.advance(ViewerState::AccessGranted)?;
                self.loaded(bytes, &location)
            }
            Resolution::Fallback {
                reason: FallbackReason::NoSource,
                bytes,
            } => {
                self.advance(ViewerState::AccessGranted)?;
                self.loaded_fallback(bytes)
            }
            Resolution::Fallback { reason, bytes } => {
                if reason == FallbackReason::NoBearer && session.is_guest() {
                    self.advance(ViewerState::AuthError)?;
                }
                self.advance(ViewerState::ViewingSample)?;
                self.loaded_fallback(bytes)
            }
            Resolution::Denied { file_id, status } => {
                self.advance(ViewerState::AccessDenied)?;
                tracing::info!(file_id = %file_id, status = status, choice = ?on_denied, "Showing access denial");

                if on_denied == DenialChoice::RequestAccess {
                    self.advance(ViewerState::Requesting)?;
                }
                let flow = AccessRequestFlow::new(self.script.as_ref(), &self.resolver);
                let outcome = match flow.choose(on_denied, session.identity(), &file_id).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        self.advance(ViewerState::ViewingSample)?;
                        return self.fail(session, format!("Failed to load PDF: {}", e));
                    }
                };
                self.advance(ViewerState::ViewingSample)?;
                notice = Some(Notice::access_denied(outcome.status_message));

                match outcome.fallback {
                    Resolution::Fallback { bytes, .. } | Resolution::Loaded { bytes, .. } => {
                        self.loaded_fallback(bytes)
                    }
                    Resolution::Denied { .. } => {
                        return self.fail(session, "Failed to load PDF: sample unavailable".to_string())
                    }
                }
            }
        };

        self.render_document(session, document, notice).await
    }

    async fn precheck_access(&self, session: &Session, location: &DocumentLocation) -> AccessDecision {
        if !self.config.document.access_check || session.is_guest() {
            return AccessDecision::Unknown;
        }
        match (&self.script, location.file_id()) {
            (Some(script), Some(file_id)) => script.check_access(session.identity(), file_id).await,
            _ => AccessDecision::Unknown,
        }
    }

    /// Documents without a Drive file id are always reported by location.
    fn loaded(&self, bytes: Bytes, location: &DocumentLocation) -> LoadedDocument {
        let (reference_kind, reference) = match (self.config.progress.reference, location.file_id()) {
            (DocumentReference::FileId, Some(file_id)) => (DocumentReference::FileId, file_id.to_string()),
            _ => (DocumentReference::PdfUrl, location.reference()),
        };
        LoadedDocument {
            bytes,
            reference,
            reference_kind,
        }
    }

    fn loaded_fallback(&self, bytes: Bytes) -> LoadedDocument {
        let reference = match &self.config.document.fallback_path {
            Some(path) => path.display().to_string(),
            None => DocumentLocation::Fallback.reference(),
        };
        LoadedDocument {
            bytes,
            reference,
            reference_kind: DocumentReference::PdfUrl,
        }
    }

    fn fail(&mut self, session: Session, message: String) -> Result<ViewerOutcome, ViewerError> {
        tracing::error!(message = %message, "Load attempt failed");
        self.advance(ViewerState::LoadFailed)?;
        self.writer.clear_pages()?;
        let index_path = self.writer.write_index(&PageContent::Message {
            text: message.clone(),
        })?;

        Ok(ViewerOutcome {
            state: self.state,
            session,
            pages: Vec::new(),
            label: None,
            notice: None,
            message: Some(message),
            index_path,
        })
    }

    async fn render_document(
        &mut self,
        session: Session,
        document: LoadedDocument,
        notice: Option<Notice>,
    ) -> Result<ViewerOutcome, ViewerError> {
        let handle = match DocumentHandle::open(self.engine.as_ref(), document.bytes.clone()) {
            Ok(handle) => handle,
            Err(e) => {
                let err = ViewerError::from(e);
                return self.fail(session, err.to_string());
            }
        };

        self.progress.reset(handle.page_count());
        self.advance(ViewerState::Rendering)?;
        tracing::info!(
            pages = handle.page_count(),
            document = %document.reference,
            identity = session.identity().unwrap_or("-"),
            "Rendering document"
        );

        let zoom = self.config.render.zoom;
        let mut tasks = stream::iter(handle.page_indices())
            .map(|index| self.process_page(&handle, index, zoom, &session, &document))
            .buffer_unordered(self.config.render.max_concurrent_pages);

        let mut pages = Vec::with_capacity(handle.page_count() as usize);
        let mut failure = None;
        while let Some(result) = tasks.next().await {
            match result {
                Ok(page) => pages.push(page),
                Err(e) => {
                    tracing::error!(error = %e, "Page failed");
                    failure.get_or_insert(e);
                }
            }
        }
        drop(tasks);

        if let Some(e) = failure {
            return self.fail(session, e.to_string());
        }

        pages.sort_by_key(|p| p.index);
        let label = self.progress.label();
        let content = PageContent::Document {
            pages: pages.clone(),
            label: label.clone(),
            notice: notice.clone(),
        };
        let index_path = self.writer.write_index(&content)?;

        self.advance(ViewerState::Rendered)?;
        tracing::info!(pages = pages.len(), label = %label, "Viewer written");

        Ok(ViewerOutcome {
            state: self.state,
            session,
            pages,
            label: Some(label),
            notice,
            message: None,
            index_path,
        })
    }

    async fn process_page(
        &self,
        handle: &DocumentHandle,
        index: u32,
        zoom: f32,
        session: &Session,
        document: &LoadedDocument,
    ) -> Result<PageEntry, ViewerError> {
        let rendered = handle.render_page(index, zoom).await?;

        let watermarker = Arc::clone(&self.watermarker);
        let writer = Arc::clone(&self.writer);
        let identity = session.identity.clone();
        let entry = tokio::task::spawn_blocking(move || -> Result<PageEntry, ViewerError> {
            let page = watermarker.apply(rendered, &StampContext::new(identity.as_deref()))?;
            writer.write_page(page.index, &page.surface)
        })
        .await
        .map_err(|e| ViewerError::Render(format!("Page task failed: {}", e)))??;

        let pages_read = self.progress.record(index);
        tracing::debug!(page = index, pages_read = pages_read, "Page complete");

        if let Some(email) = session.identity() {
            self.reporter.submit(ProgressReport {
                email: email.to_string(),
                document: document.reference.clone(),
                pages_read,
                total_pages: handle.page_count(),
                timestamp: Utc::now(),
                page_field: self.config.progress.page_field,
                reference: document.reference_kind,
            });
        }

        Ok(entry)
    }

    /// Wait for queued progress reports and stop the reporter.
    pub async fn shutdown(self) -> ReporterStats {
        self.reporter.shutdown().await
    }
}
