//! Configuration types for image-to-artifact conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct for every knob keeps a
//! coordinator's settings in a single place that can be cloned into
//! background tasks and printed in debug logs.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default lossy compression quality (0.0–1.0).
pub const DEFAULT_QUALITY: f32 = 0.8;

/// Default `imageName` written into structured records.
pub const DEFAULT_RECORD_NAME: &str = "processedImage";

/// Default `description` written into structured records.
pub const DEFAULT_RECORD_DESCRIPTION: &str = "Processed image data";

/// Artifact name used for composed documents.
pub const DOCUMENT_ARTIFACT_NAME: &str = "convertedDocument";

/// Artifact name used for structured records.
pub const RECORD_ARTIFACT_NAME: &str = "convertedRecord";

/// Artifact name used for images reconstructed from records.
pub const DECODED_IMAGE_ARTIFACT_NAME: &str = "decodedImage";

/// Configuration for a conversion coordinator.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_img2pdf::{ConversionConfig, OverlapPolicy};
///
/// let config = ConversionConfig::builder()
///     .quality(0.9)
///     .record_name("scan")
///     .overlap(OverlapPolicy::Queue)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality(), 90);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Lossy compression quality in `0.01..=1.0`. Default: 0.8.
    ///
    /// Applied both to record payloads and to the JPEG streams embedded in
    /// document pages. Mapped linearly onto the JPEG 1–100 scale.
    pub quality: f32,

    /// `imageName` field of produced records. Default: `"processedImage"`.
    pub record_name: String,

    /// `description` field of produced records. Default: `"Processed image data"`.
    pub record_description: String,

    /// What to do when a request arrives while another is in flight.
    pub overlap: OverlapPolicy,

    /// Timeout for URL image inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            record_name: DEFAULT_RECORD_NAME.to_string(),
            record_description: DEFAULT_RECORD_DESCRIPTION.to_string(),
            overlap: OverlapPolicy::default(),
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("quality", &self.quality)
            .field("record_name", &self.record_name)
            .field("record_description", &self.record_description)
            .field("overlap", &self.overlap)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Quality on the 1–100 scale the JPEG encoder expects.
    pub fn jpeg_quality(&self) -> u8 {
        quality_to_jpeg(self.quality)
    }
}

/// Map a `0.0..=1.0` quality onto the JPEG encoder's `1..=100` scale.
pub fn quality_to_jpeg(quality: f32) -> u8 {
    let q = if quality.is_finite() { quality } else { DEFAULT_QUALITY };
    ((q * 100.0).round() as i32).clamp(1, 100) as u8
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn quality(mut self, q: f32) -> Self {
        self.config.quality = q;
        self
    }

    pub fn record_name(mut self, name: impl Into<String>) -> Self {
        self.config.record_name = name.into();
        self
    }

    pub fn record_description(mut self, description: impl Into<String>) -> Self {
        self.config.record_description = description.into();
        self
    }

    pub fn overlap(mut self, policy: OverlapPolicy) -> Self {
        self.config.overlap = policy;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if !c.quality.is_finite() || c.quality <= 0.0 || c.quality > 1.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "Quality must be in (0.0, 1.0], got {}",
                c.quality
            )));
        }
        if c.record_name.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "Record name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Discipline for a request that arrives while another one is in flight.
///
/// | Policy | Second request |
/// |--------|----------------|
/// | `Reject` | fails immediately with [`ConvertError::Busy`] (default) |
/// | `Queue`  | waits for the first to finish, then runs (FIFO) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlapPolicy {
    #[default]
    Reject,
    Queue,
}

/// Which artifact a conversion produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// One PDF page per image.
    #[default]
    Document,
    /// A JSON record of the leading image.
    Record,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.jpeg_quality(), 80);
        assert_eq!(c.record_name, "processedImage");
        assert_eq!(c.record_description, "Processed image data");
        assert_eq!(c.overlap, OverlapPolicy::Reject);
    }

    #[test]
    fn quality_mapping_clamps() {
        assert_eq!(quality_to_jpeg(0.0), 1);
        assert_eq!(quality_to_jpeg(0.8), 80);
        assert_eq!(quality_to_jpeg(1.0), 100);
        assert_eq!(quality_to_jpeg(7.5), 100);
        assert_eq!(quality_to_jpeg(f32::NAN), 80);
    }

    #[test]
    fn builder_rejects_bad_quality() {
        let err = ConversionConfig::builder().quality(0.0).build().unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
        assert!(ConversionConfig::builder().quality(1.5).build().is_err());
        assert!(ConversionConfig::builder().quality(1.0).build().is_ok());
    }

    #[test]
    fn builder_rejects_blank_name() {
        assert!(ConversionConfig::builder().record_name("  ").build().is_err());
    }
}
