//! One-shot conversion entry points.
//!
//! These wrap the full flow (load inputs → coordinator → sink) for callers
//! that convert a single batch and exit, such as the `img2pdf` binary.
//! Long-lived hosts that issue many requests should keep a
//! [`ConversionCoordinator`] instead, so overlap discipline and status
//! tracking span requests.

use crate::config::{ArtifactFormat, ConversionConfig, DECODED_IMAGE_ARTIFACT_NAME};
use crate::coordinator::ConversionCoordinator;
use crate::error::ConvertError;
use crate::output::{ConversionStats, DecodedRecord, DocumentMetadata, PageInfo};
use crate::pipeline::{compose, input};
use crate::sink::ArtifactSink;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// What a one-shot conversion produced and where it went.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub format: ArtifactFormat,
    pub location: PathBuf,
    /// Composed pages; empty for records.
    pub pages: Vec<PageInfo>,
    pub stats: ConversionStats,
}

/// Load `inputs` (paths or URLs, in order) and convert them to `format`.
///
/// # Errors
/// Input errors (`FileNotFound`, `NotAnImage`, download failures) surface
/// before any conversion starts; `EmptyBatch` when `inputs` is empty.
pub async fn convert<S: AsRef<str>>(
    inputs: &[S],
    format: ArtifactFormat,
    sink: Arc<dyn ArtifactSink>,
    config: &ConversionConfig,
) -> Result<ConversionSummary, ConvertError> {
    if inputs.is_empty() {
        return Err(ConvertError::EmptyBatch);
    }
    info!("Starting {:?} conversion of {} input(s)", format, inputs.len());

    let batch = input::load_batch(inputs, config.download_timeout_secs).await?;
    let coordinator = ConversionCoordinator::new(config.clone(), sink);

    let summary = match format {
        ArtifactFormat::Document => {
            let out = coordinator.convert_to_document(batch).await?;
            ConversionSummary {
                format,
                location: out.location,
                pages: out.artifact.pages,
                stats: out.stats,
            }
        }
        ArtifactFormat::Record => {
            let out = coordinator.convert_to_record(batch).await?;
            ConversionSummary {
                format,
                location: out.location,
                pages: Vec::new(),
                stats: out.stats,
            }
        }
    };

    info!(
        "Conversion complete: {} item(s), {} bytes → {}",
        summary.stats.items_produced,
        summary.stats.artifact_bytes,
        summary.location.display()
    );
    Ok(summary)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync<S: AsRef<str>>(
    inputs: &[S],
    format: ArtifactFormat,
    sink: Arc<dyn ArtifactSink>,
    config: &ConversionConfig,
) -> Result<ConversionSummary, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(inputs, format, sink, config))
}

/// Read a PDF from disk and report its page geometry.
pub async fn inspect(path: impl AsRef<Path>) -> Result<DocumentMetadata, ConvertError> {
    let path = path.as_ref().to_path_buf();
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConvertError::FileNotFound { path })
        }
        Err(e) => return Err(ConvertError::Io { path, source: e }),
    };
    tokio::task::spawn_blocking(move || compose::inspect_document(&bytes))
        .await
        .map_err(|e| ConvertError::Internal(format!("Inspect task panicked: {}", e)))?
}

/// Decode a record file and persist the embedded JPEG through `sink`.
///
/// The written bytes are exactly the record's payload, not a re-encode.
pub async fn decode_record_file(
    path: impl AsRef<Path>,
    sink: Arc<dyn ArtifactSink>,
    config: &ConversionConfig,
) -> Result<(DecodedRecord, PathBuf), ConvertError> {
    let path = path.as_ref().to_path_buf();
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConvertError::FileNotFound { path })
        }
        Err(e) => return Err(ConvertError::Io { path, source: e }),
    };

    let coordinator = ConversionCoordinator::new(config.clone(), Arc::clone(&sink));
    let decoded = coordinator.decode_record(text).await?;

    let bytes = decoded.compressed.clone();
    let location = tokio::task::spawn_blocking(move || {
        sink.write(&bytes, &format!("{DECODED_IMAGE_ARTIFACT_NAME}.jpg"))
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Write task panicked: {}", e)))??;

    info!(
        "Decoded record '{}' → {}",
        decoded.record.name,
        location.display()
    );
    Ok((decoded, location))
}
