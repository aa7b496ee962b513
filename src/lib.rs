//! # edgequake-img2pdf
//!
//! Convert a batch of raster images into a multi-page PDF (one page per
//! image) or into a JSON record that embeds the image as base64 text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! images (paths / URLs / in-memory)
//!  │
//!  ├─ 1. Input     load in order into an immutable ImageBatch
//!  ├─ 2. Gate      one request at a time: Busy, or wait in a FIFO queue
//!  ├─ 3. Encode    JPEG at fixed quality (CPU-bound, spawn_blocking)
//!  ├─ 4. Compose   PDF page per image, sized to the image   ┐ one of
//!  │   or Record   leading image → {imageName, imageData}   ┘
//!  └─ 5. Sink      atomic write, content-hashed file name
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_img2pdf::{ConversionConfig, ConversionCoordinator, DirectorySink, ImageBatch, RasterImage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = ConversionCoordinator::new(
//!         ConversionConfig::default(),
//!         Arc::new(DirectorySink::temp()),
//!     );
//!     let batch = ImageBatch::from_images(vec![
//!         RasterImage::solid(300, 200, [255, 255, 255]),
//!         RasterImage::solid(200, 300, [0, 0, 0]),
//!     ]);
//!     let output = coordinator.convert_to_document(batch).await?;
//!     println!("{} pages → {}", output.artifact.page_count(), output.location.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2pdf` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-img2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod sink;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ArtifactFormat, ConversionConfig, ConversionConfigBuilder, OverlapPolicy};
pub use convert::{convert, convert_sync, decode_record_file, inspect, ConversionSummary};
pub use coordinator::{ConversionCoordinator, CoordinatorStatus, Phase};
pub use error::ConvertError;
pub use model::{ImageBatch, RasterImage};
pub use output::{
    ConversionOutput, ConversionStats, DecodedRecord, DocumentArtifact, DocumentMetadata,
    PageInfo, PageSize, ProcessedRecord, TextRecordArtifact,
};
pub use pipeline::compose::inspect_document;
pub use pipeline::encode::{text_decode, text_encode};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use sink::{ArtifactSink, DirectorySink, NamingPolicy};
