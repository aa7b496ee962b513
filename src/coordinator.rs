//! Background conversion coordinator.
//!
//! [`ConversionCoordinator`] runs one conversion request at a time off the
//! caller's task and resolves exactly one outcome per request:
//!
//! ```text
//! caller task                 worker task                 blocking pool
//! ───────────                 ───────────                 ─────────────
//! check batch non-empty
//! acquire gate (Busy/queue)
//! status → Processing ──────▶ spawn_blocking ───────────▶ compose/encode
//!                                                         sink.write
//!                             status → Completed|Failed ◀─┘
//!                             re-arm cancellation
//!                             release gate
//!                             status → Idle
//! await oneshot ◀──────────── send outcome
//! ```
//!
//! The worker owns the gate permit, so even if the caller stops awaiting, a
//! second request cannot start until the first one has finished writing.
//! The permit is released before `Idle` is published and before the outcome
//! is sent: a caller that has its result, or an observer that sees `Idle`,
//! is never refused with `Busy`.
//!
//! Status changes are published on a `watch` channel; observers see
//! `Idle → Processing → {Completed, Failed} → Idle`.

use crate::config::{
    ConversionConfig, OverlapPolicy, DOCUMENT_ARTIFACT_NAME, RECORD_ARTIFACT_NAME,
};
use crate::error::ConvertError;
use crate::model::ImageBatch;
use crate::output::{
    ConversionOutput, ConversionStats, DecodedRecord, DocumentArtifact, TextRecordArtifact,
};
use crate::pipeline::{compose, record};
use crate::sink::ArtifactSink;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::{oneshot, watch, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle phase of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Processing,
    Completed,
    Failed,
}

/// Snapshot published on every phase change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub phase: Phase,
    /// User-facing message of the last failed request. Cleared when the next
    /// request enters `Processing`.
    pub error_message: Option<String>,
    pub requests_completed: u64,
    pub requests_failed: u64,
}

struct Inner {
    config: ConversionConfig,
    sink: Arc<dyn ArtifactSink>,
    /// One permit: held by the worker for the whole request.
    gate: Arc<Semaphore>,
    status: watch::Sender<CoordinatorStatus>,
    cancel: Mutex<CancellationToken>,
}

/// Runs conversions in the background, one at a time.
///
/// Cheap to clone; clones share the same gate, status and sink.
#[derive(Clone)]
pub struct ConversionCoordinator {
    inner: Arc<Inner>,
}

impl ConversionCoordinator {
    pub fn new(config: ConversionConfig, sink: Arc<dyn ArtifactSink>) -> Self {
        let (status, _) = watch::channel(CoordinatorStatus::default());
        Self {
            inner: Arc::new(Inner {
                config,
                sink,
                gate: Arc::new(Semaphore::new(1)),
                status,
                cancel: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.inner.config
    }

    /// Current status.
    pub fn status(&self) -> CoordinatorStatus {
        self.inner.status.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorStatus> {
        self.inner.status.subscribe()
    }

    /// The token the next (or current) request observes.
    pub fn cancel_token(&self) -> CancellationToken {
        self.inner.current_token()
    }

    /// Cancel the in-flight request, or the next one if idle.
    ///
    /// The request fails with [`ConvertError::Cancelled`] at its next page
    /// boundary; a fresh token is armed once it has finished.
    pub fn cancel(&self) {
        info!("Cancellation requested");
        self.inner.current_token().cancel();
    }

    /// Compose every image of `batch` into a PDF and persist it.
    pub async fn convert_to_document(
        &self,
        batch: ImageBatch,
    ) -> Result<ConversionOutput<DocumentArtifact>, ConvertError> {
        if batch.is_empty() {
            return Err(ConvertError::EmptyBatch);
        }

        let started = Instant::now();
        let quality = self.inner.config.jpeg_quality();
        let progress = self.inner.config.progress_callback.clone();
        let sink = Arc::clone(&self.inner.sink);
        info!("Document conversion requested: {} image(s)", batch.len());

        self.dispatch(move |token| {
            let encode_start = Instant::now();
            let artifact = compose::compose_document(&batch, quality, token, progress.as_ref())?;
            let encode_duration_ms = encode_start.elapsed().as_millis() as u64;

            let location = persist(
                sink.as_ref(),
                token,
                &artifact.bytes,
                &format!("{DOCUMENT_ARTIFACT_NAME}.pdf"),
            )?;
            let stats = ConversionStats {
                image_count: batch.len(),
                items_produced: artifact.page_count(),
                artifact_bytes: artifact.bytes.len(),
                encode_duration_ms,
                total_duration_ms: started.elapsed().as_millis() as u64,
            };
            Ok(ConversionOutput {
                artifact,
                location,
                stats,
            })
        })
        .await
    }

    /// Encode the leading image of `batch` into a JSON record and persist it.
    pub async fn convert_to_record(
        &self,
        batch: ImageBatch,
    ) -> Result<ConversionOutput<TextRecordArtifact>, ConvertError> {
        if batch.is_empty() {
            return Err(ConvertError::EmptyBatch);
        }

        let started = Instant::now();
        let config = &self.inner.config;
        let quality = config.jpeg_quality();
        let name = config.record_name.clone();
        let description = config.record_description.clone();
        let progress = config.progress_callback.clone();
        let sink = Arc::clone(&self.inner.sink);
        info!("Record conversion requested: {} image(s)", batch.len());

        self.dispatch(move |token| {
            let encode_start = Instant::now();
            let artifact = record::encode_record(
                &batch,
                &name,
                &description,
                quality,
                token,
                progress.as_ref(),
            )?;
            let encode_duration_ms = encode_start.elapsed().as_millis() as u64;

            let location = persist(
                sink.as_ref(),
                token,
                artifact.as_bytes(),
                &format!("{RECORD_ARTIFACT_NAME}.json"),
            )?;
            let stats = ConversionStats {
                image_count: batch.len(),
                items_produced: 1,
                artifact_bytes: artifact.json.len(),
                encode_duration_ms,
                total_duration_ms: started.elapsed().as_millis() as u64,
            };
            Ok(ConversionOutput {
                artifact,
                location,
                stats,
            })
        })
        .await
    }

    /// Parse a record and reconstruct its image in the background.
    ///
    /// Follows the same gate and status rules as the conversions but does
    /// not write anything.
    pub async fn decode_record(&self, text: String) -> Result<DecodedRecord, ConvertError> {
        self.dispatch(move |token| {
            if token.is_cancelled() {
                return Err(ConvertError::Cancelled);
            }
            record::decode_record(&text)
        })
        .await
    }

    /// Run `job` on the blocking pool under the gate and deliver its outcome.
    async fn dispatch<T, F>(&self, job: F) -> Result<T, ConvertError>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> Result<T, ConvertError> + Send + 'static,
    {
        let permit = self.acquire().await?;
        let token = self.inner.begin();
        let inner = Arc::clone(&self.inner);
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let permit: OwnedSemaphorePermit = permit;
            let outcome = match tokio::task::spawn_blocking(move || job(&token)).await {
                Ok(result) => result,
                Err(e) => Err(ConvertError::Internal(format!("conversion task failed: {e}"))),
            };
            inner.finish(outcome.as_ref().err());
            drop(permit);
            inner.settle();
            // The caller may have stopped waiting; the outcome is still final.
            let _ = tx.send(outcome);
        });

        rx.await.unwrap_or_else(|_| {
            Err(ConvertError::Internal(
                "conversion worker exited without an outcome".to_string(),
            ))
        })
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, ConvertError> {
        let gate = Arc::clone(&self.inner.gate);
        match self.inner.config.overlap {
            OverlapPolicy::Reject => gate.try_acquire_owned().map_err(|_| {
                debug!("Rejecting overlapping request");
                ConvertError::Busy
            }),
            OverlapPolicy::Queue => {
                debug!("Waiting for in-flight request to finish");
                // The semaphore is never closed.
                gate.acquire_owned()
                    .await
                    .map_err(|e| ConvertError::Internal(format!("request gate closed: {e}")))
            }
        }
    }
}

impl Inner {
    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Enter `Processing`, clearing the previous error.
    fn begin(&self) -> CancellationToken {
        self.status.send_modify(|s| {
            s.phase = Phase::Processing;
            s.error_message = None;
        });
        self.current_token()
    }

    /// Publish the terminal phase and re-arm cancellation. Runs while the
    /// gate is still held, so the next request sees a fresh token.
    fn finish(&self, error: Option<&ConvertError>) {
        match error {
            None => {
                info!("Conversion completed");
                self.status.send_modify(|s| {
                    s.phase = Phase::Completed;
                    s.requests_completed += 1;
                });
            }
            Some(e) => {
                warn!("Conversion failed: {}", e);
                let message = e.user_message();
                self.status.send_modify(|s| {
                    s.phase = Phase::Failed;
                    s.error_message = Some(message);
                    s.requests_failed += 1;
                });
            }
        }

        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
    }

    /// Return to `Idle` after the gate is released, unless a queued request
    /// has already entered `Processing`.
    fn settle(&self) {
        self.status.send_if_modified(|s| match s.phase {
            Phase::Completed | Phase::Failed => {
                s.phase = Phase::Idle;
                true
            }
            Phase::Idle | Phase::Processing => false,
        });
    }
}

/// Hand artifact bytes to the sink unless the request was cancelled.
fn persist(
    sink: &dyn ArtifactSink,
    token: &CancellationToken,
    bytes: &[u8],
    suggested_name: &str,
) -> Result<PathBuf, ConvertError> {
    if token.is_cancelled() {
        return Err(ConvertError::Cancelled);
    }
    sink.write(bytes, suggested_name)
}
