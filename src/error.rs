//! Error types for the edgequake-img2pdf library.
//!
//! Every failure the pipeline can produce is a variant of [`ConvertError`].
//! The set is closed so callers branch on the kind instead of matching
//! message strings:
//!
//! * **Batch errors**: the request itself is unusable (`EmptyBatch`,
//!   `InvalidDimensions`). Detected before or while composing, never after
//!   an artifact has been written.
//! * **Codec errors**: JPEG compression or record parsing failed
//!   (`Encode`, `Decode`, `InvalidPayload`).
//! * **Coordination errors**: the request was refused or stopped
//!   (`Busy`, `Cancelled`).
//! * **I/O errors**: the sink or the image source could not touch storage.
//!
//! None of them are fatal to the host. The coordinator turns each one into a
//! user-facing message via [`ConvertError::user_message`] and goes back to
//! idle so the next request can run.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-img2pdf library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Batch errors ──────────────────────────────────────────────────────
    /// The batch contained no images.
    #[error("No images selected")]
    EmptyBatch,

    /// An image has a zero width or height and cannot become a page.
    #[error("Image {index} has invalid dimensions {width}x{height}; both must be greater than zero")]
    InvalidDimensions { index: usize, width: u32, height: u32 },

    // ── Codec errors ──────────────────────────────────────────────────────
    /// Lossy compression (or PDF serialisation) failed.
    #[error("Failed to encode image data: {detail}")]
    Encode { detail: String },

    /// The structured record is not well-formed JSON of the expected shape.
    #[error("Malformed record: {detail}")]
    Decode { detail: String },

    /// The record parsed, but its payload is not a valid image.
    #[error("Failed to convert record to image: {detail}")]
    InvalidPayload { detail: String },

    // ── Coordination errors ───────────────────────────────────────────────
    /// Another conversion is already in flight on this coordinator.
    #[error("A conversion is already in progress")]
    Busy,

    /// The request observed a cancelled token before finishing.
    #[error("Conversion was cancelled")]
    Cancelled,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Reading an input or persisting an artifact failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input path does not exist or could not be opened.
    #[error("Image file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// An input was read but is not an image format we can decode.
    #[error("File is not a supported image: '{path}'")]
    NotAnImage { path: PathBuf },

    /// HTTP URL input could not be fetched.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// HTTP URL input exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// A background task panicked or was aborted.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// The message shown to an end user when this error ends a request.
    ///
    /// Codec and batch errors are already phrased for users; I/O errors drop
    /// the OS detail in favour of a short actionable line.
    pub fn user_message(&self) -> String {
        match self {
            ConvertError::Io { path, .. } => {
                format!("Could not read or write '{}'", path.display())
            }
            ConvertError::Internal(_) => "Something went wrong while converting".to_string(),
            other => other.to_string(),
        }
    }

    /// `true` for errors raised before any background work started.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ConvertError::EmptyBatch | ConvertError::Busy)
    }
}
