//! Output types: artifacts, records, and per-request statistics.

use crate::model::RasterImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Summary of one composed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-indexed position in the document (equals batch position + 1).
    pub page_num: usize,
    /// Page width in points; equals the source image width in pixels.
    pub width: u32,
    /// Page height in points; equals the source image height in pixels.
    pub height: u32,
    /// Size of the embedded JPEG stream in bytes.
    pub encoded_len: usize,
}

/// A composed multi-page PDF.
#[derive(Debug, Clone)]
pub struct DocumentArtifact {
    /// Serialised PDF bytes.
    pub bytes: Vec<u8>,
    /// One entry per page, in page order.
    pub pages: Vec<PageInfo>,
}

impl DocumentArtifact {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// The structured record embedding one compressed image as base64 text.
///
/// Field names on the wire are `imageName`, `imageData` and `description`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    #[serde(rename = "imageName")]
    pub name: String,
    /// Standard, padded base64 of the compressed image bytes.
    #[serde(rename = "imageData")]
    pub payload: String,
    pub description: String,
}

/// A serialised [`ProcessedRecord`] ready to be written as text.
#[derive(Debug, Clone)]
pub struct TextRecordArtifact {
    pub record: ProcessedRecord,
    /// JSON text of `record`.
    pub json: String,
}

impl TextRecordArtifact {
    pub fn as_bytes(&self) -> &[u8] {
        self.json.as_bytes()
    }
}

/// A record parsed back from text, with its payload reconstructed.
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub record: ProcessedRecord,
    /// The exact compressed bytes carried by the payload.
    pub compressed: Vec<u8>,
    /// Pixels decoded from `compressed`. Differs from the original raster
    /// only by JPEG loss.
    pub image: RasterImage,
}

/// Timing and size statistics for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Images in the submitted batch.
    pub image_count: usize,
    /// Pages (document) or records (1) produced.
    pub items_produced: usize,
    /// Size of the persisted artifact in bytes.
    pub artifact_bytes: usize,
    /// Time spent compressing and composing.
    pub encode_duration_ms: u64,
    /// Wall-clock time from request start to persisted artifact.
    pub total_duration_ms: u64,
}

/// The terminal success outcome of a conversion request.
#[derive(Debug, Clone)]
pub struct ConversionOutput<A> {
    pub artifact: A,
    /// Where the sink persisted the artifact.
    pub location: PathBuf,
    pub stats: ConversionStats,
}

/// Page geometry read back from a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

/// Structural facts about a PDF, obtained without rendering it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub page_count: usize,
    /// MediaBox size of each page, in page order.
    pub page_sizes: Vec<PageSize>,
    pub pdf_version: String,
}
