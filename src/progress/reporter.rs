// Background delivery of progress reports

use super::ProgressReport;
use crate::access::ScriptClient;
use crate::error::ViewerError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Delivers one report. Implementations should not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressTransport: Send + Sync {
    async fn send(&self, report: &ProgressReport) -> Result<(), ViewerError>;
}

/// Posts reports as JSON to the script endpoint.
pub struct HttpProgressTransport {
    script: ScriptClient,
}

impl HttpProgressTransport {
    pub fn new(script: ScriptClient) -> Self {
        Self { script }
    }
}

#[async_trait]
impl ProgressTransport for HttpProgressTransport {
    async fn send(&self, report: &ProgressReport) -> Result<(), ViewerError> {
        self.script.post_json(report).await
    }
}

/// Delivery counters, returned when the reporter shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReporterStats {
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// Fire-and-forget report queue drained by one background task.
pub struct ProgressReporter {
    sender: Option<mpsc::Sender<ProgressReport>>,
    worker: Option<JoinHandle<ReporterStats>>,
    dropped: AtomicU64,
}

impl ProgressReporter {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn(transport: Arc<dyn ProgressTransport>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<ProgressReport>(capacity.max(1));

        let worker = tokio::spawn(async move {
            let mut stats = ReporterStats::default();
            while let Some(report) = receiver.recv().await {
                match transport.send(&report).await {
                    Ok(()) => {
                        stats.delivered += 1;
                        tracing::debug!(
                            pages_read = report.pages_read,
                            total_pages = report.total_pages,
                            "Progress reported"
                        );
                    }
                    Err(e) => {
                        stats.failed += 1;
                        tracing::warn!(
                            pages_read = report.pages_read,
                            error = %e,
                            "Progress report failed"
                        );
                    }
                }
            }
            stats
        });

        Self {
            sender: Some(sender),
            worker: Some(worker),
            dropped: AtomicU64::new(0),
        }
    }

    /// A reporter that discards everything.
    pub fn disabled() -> Self {
        Self {
            sender: None,
            worker: None,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue `report` without waiting. Returns whether it was accepted.
    pub fn submit(&self, report: ProgressReport) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        match sender.try_send(report) {
            Ok(()) => true,
            Err(TrySendError::Full(report)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    pages_read = report.pages_read,
                    "Progress queue full, dropping report"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Progress worker stopped, dropping report");
                false
            }
        }
    }

    /// Close the queue and wait for queued reports to be delivered.
    pub async fn shutdown(mut self) -> ReporterStats {
        drop(self.sender.take());
        let dropped = self.dropped.load(Ordering::Relaxed);

        let mut stats = match self.worker.take() {
            Some(worker) => worker.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Progress worker panicked");
                ReporterStats::default()
            }),
            None => ReporterStats::default(),
        };
        stats.dropped = dropped;
        stats
    }
}
