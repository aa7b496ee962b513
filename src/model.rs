//! Input model: [`RasterImage`] and the immutable [`ImageBatch`] snapshot.
//!
//! A batch is captured once when a request starts and shared read-only with
//! the background worker. It is backed by `Arc<[RasterImage]>`, so cloning a
//! batch into a task is a pointer copy and nothing can push, remove or
//! reorder images behind the worker's back.

use crate::error::ConvertError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

/// An immutable pixel buffer captured from an image source.
///
/// Zero-sized images are representable so the pipeline can reject them with
/// a precise error instead of failing at capture time.
#[derive(Clone)]
pub struct RasterImage {
    image: Arc<DynamicImage>,
}

impl RasterImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// A solid-colour RGB image. Handy for tests and placeholders.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb(rgb),
        )))
    }

    /// Decode any supported format (PNG, JPEG) from memory.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        image::load_from_memory(bytes).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Both dimensions are non-zero.
    pub fn has_valid_dimensions(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Compress to baseline JPEG at `quality` (1–100).
    ///
    /// Alpha is discarded: the image is flattened to 8-bit RGB first. The
    /// encoder is deterministic, so the same image and quality always yield
    /// the same bytes.
    pub fn encode_lossy(&self, quality: u8) -> Result<Vec<u8>, ConvertError> {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return Err(ConvertError::Encode {
                detail: format!("cannot compress a {width}x{height} image"),
            });
        }

        let rgb = self.image.to_rgb8();
        let mut buffer = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
            .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
            .map_err(|e| ConvertError::Encode {
                detail: e.to_string(),
            })?;

        Ok(buffer.into_inner())
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("color", &self.image.color())
            .finish()
    }
}

/// An ordered, immutable snapshot of images submitted for one conversion.
#[derive(Clone, Debug)]
pub struct ImageBatch {
    images: Arc<[RasterImage]>,
}

impl ImageBatch {
    pub fn from_images(images: impl IntoIterator<Item = RasterImage>) -> Self {
        images.into_iter().collect()
    }

    pub fn empty() -> Self {
        Self {
            images: Arc::from(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// The leading image, which is the only one a record encodes.
    pub fn first(&self) -> Option<&RasterImage> {
        self.images.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RasterImage> {
        self.images.iter()
    }
}

impl FromIterator<RasterImage> for ImageBatch {
    fn from_iter<I: IntoIterator<Item = RasterImage>>(iter: I) -> Self {
        let images: Vec<RasterImage> = iter.into_iter().collect();
        Self {
            images: Arc::from(images),
        }
    }
}

impl From<Vec<RasterImage>> for ImageBatch {
    fn from(images: Vec<RasterImage>) -> Self {
        Self {
            images: Arc::from(images),
        }
    }
}

impl<'a> IntoIterator for &'a ImageBatch {
    type Item = &'a RasterImage;
    type IntoIter = std::slice::Iter<'a, RasterImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
