//! Document composition: ordered images → one PDF, one page per image.
//!
//! Each page is sized to its image in points (1 px = 1 pt) and carries a
//! single DCT-encoded image XObject drawn at the origin across the whole
//! MediaBox. There is no scaling, cropping or margin logic, and pages are
//! appended strictly in batch order.
//!
//! Composition is all-or-nothing: the document is only serialised after
//! every page has been placed, so a failing page never leaks a partial PDF.
//!
//! The object model is written with `lopdf`. The same crate reads documents
//! back in [`inspect_document`], which the CLI and the tests use to verify
//! page geometry independently of the composer's own bookkeeping.

use crate::error::ConvertError;
use crate::model::{ImageBatch, RasterImage};
use crate::output::{DocumentArtifact, DocumentMetadata, PageInfo, PageSize};
use crate::progress::ProgressCallback;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// PDF version written into the header.
const PDF_VERSION: &str = "1.5";

/// Resource name of the single image on every page.
const IMAGE_RESOURCE: &str = "Im0";

/// Compose `batch` into a PDF.
///
/// Blocking and CPU-bound; the coordinator runs it inside `spawn_blocking`.
/// `cancel` is checked before each page.
pub fn compose_document(
    batch: &ImageBatch,
    quality: u8,
    cancel: &CancellationToken,
    progress: Option<&ProgressCallback>,
) -> Result<DocumentArtifact, ConvertError> {
    let total = batch.len();
    if total == 0 {
        return Err(ConvertError::EmptyBatch);
    }

    if let Some(cb) = progress {
        cb.on_conversion_start(total);
    }

    let mut doc = Document::with_version(PDF_VERSION);
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(total);
    let mut pages: Vec<PageInfo> = Vec::with_capacity(total);

    for (index, image) in batch.iter().enumerate() {
        let page_num = index + 1;

        if cancel.is_cancelled() {
            info!("Composition cancelled before page {}/{}", page_num, total);
            if let Some(cb) = progress {
                cb.on_conversion_complete(total, pages.len());
            }
            return Err(ConvertError::Cancelled);
        }

        if let Some(cb) = progress {
            cb.on_page_start(page_num, total);
        }

        match add_page(&mut doc, pages_id, index, image, quality) {
            Ok((page_id, info)) => {
                debug!(
                    "Composed page {}/{} → {}x{} pt, {} bytes JPEG",
                    page_num, total, info.width, info.height, info.encoded_len
                );
                if let Some(cb) = progress {
                    cb.on_page_complete(page_num, total, info.encoded_len);
                }
                kids.push(Object::Reference(page_id));
                pages.push(info);
            }
            Err(e) => {
                warn!("Page {}/{} failed: {}", page_num, total, e);
                if let Some(cb) = progress {
                    cb.on_page_error(page_num, total, &e.to_string());
                    cb.on_conversion_complete(total, pages.len());
                }
                return Err(e);
            }
        }
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => total as i64,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| ConvertError::Encode {
        detail: format!("PDF serialisation failed: {e}"),
    })?;

    if let Some(cb) = progress {
        cb.on_conversion_complete(total, pages.len());
    }
    info!("Composed {} pages → {} bytes PDF", total, bytes.len());

    Ok(DocumentArtifact { bytes, pages })
}

/// Add one page sized to `image` and return its object id.
fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    index: usize,
    image: &RasterImage,
    quality: u8,
) -> Result<(ObjectId, PageInfo), ConvertError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ConvertError::InvalidDimensions {
            index,
            width,
            height,
        });
    }

    let jpeg = image.encode_lossy(quality)?;
    let encoded_len = jpeg.len();
    let (w, h) = (i64::from(width), i64::from(height));

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w,
            "Height" => h,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    // Scale the unit square to the full page: [w 0 0 h 0 0].
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(w),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(h),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content.encode().map_err(|e| ConvertError::Encode {
        detail: format!("page {} content stream: {e}", index + 1),
    })?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content_bytes));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(w),
            Object::Integer(h),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_RESOURCE => image_id,
            },
        },
    });

    Ok((
        page_id,
        PageInfo {
            page_num: index + 1,
            width,
            height,
            encoded_len,
        },
    ))
}

/// Read page count and page sizes back from PDF bytes.
pub fn inspect_document(bytes: &[u8]) -> Result<DocumentMetadata, ConvertError> {
    let doc = Document::load_mem(bytes).map_err(|e| ConvertError::Decode {
        detail: format!("not a readable PDF: {e}"),
    })?;

    let mut page_sizes = Vec::new();
    for (page_num, page_id) in doc.get_pages() {
        let size = media_box(&doc, page_id).ok_or_else(|| ConvertError::Decode {
            detail: format!("page {page_num} has no usable MediaBox"),
        })?;
        page_sizes.push(size);
    }

    Ok(DocumentMetadata {
        page_count: page_sizes.len(),
        page_sizes,
        pdf_version: doc.version.clone(),
    })
}

/// Resolve a page's MediaBox, following `Parent` links for inherited boxes.
fn media_box(doc: &Document, page_id: ObjectId) -> Option<PageSize> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    // Page trees deeper than this are malformed or cyclic.
    for _ in 0..32 {
        if let Ok(Object::Array(rect)) = node.get(b"MediaBox") {
            return rect_size(rect);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

fn rect_size(rect: &[Object]) -> Option<PageSize> {
    if rect.len() != 4 {
        return None;
    }
    let n: Vec<f64> = rect.iter().map(number).collect::<Option<_>>()?;
    Some(PageSize {
        width: (n[2] - n[0]).abs().round() as u32,
        height: (n[3] - n[1]).abs().round() as u32,
    })
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(dims: &[(u32, u32)]) -> ImageBatch {
        dims.iter()
            .map(|&(w, h)| RasterImage::solid(w, h, [30, 60, 90]))
            .collect()
    }

    #[test]
    fn pages_match_image_sizes_in_order() {
        let token = CancellationToken::new();
        let doc = compose_document(&batch(&[(3, 3), (5, 5), (1, 1)]), 80, &token, None)
            .expect("compose should succeed");

        let sizes: Vec<_> = doc.pages.iter().map(|p| (p.width, p.height)).collect();
        assert_eq!(sizes, vec![(3, 3), (5, 5), (1, 1)]);
        assert_eq!(doc.pages[2].page_num, 3);
        assert!(doc.bytes.starts_with(b"%PDF-1.5"));

        let meta = inspect_document(&doc.bytes).expect("composed PDF should parse");
        assert_eq!(meta.page_count, 3);
        assert_eq!(
            meta.page_sizes,
            vec![
                PageSize { width: 3, height: 3 },
                PageSize { width: 5, height: 5 },
                PageSize { width: 1, height: 1 },
            ]
        );
    }

    #[test]
    fn non_square_pages_keep_orientation() {
        let token = CancellationToken::new();
        let doc = compose_document(&batch(&[(40, 10), (10, 40)]), 80, &token, None).unwrap();
        let meta = inspect_document(&doc.bytes).unwrap();
        assert_eq!(meta.page_sizes[0], PageSize { width: 40, height: 10 });
        assert_eq!(meta.page_sizes[1], PageSize { width: 10, height: 40 });
    }

    #[test]
    fn zero_sized_image_fails_whole_document() {
        let token = CancellationToken::new();
        let err = compose_document(&batch(&[(2, 2), (0, 4)]), 80, &token, None).unwrap_err();
        match err {
            ConvertError::InvalidDimensions {
                index,
                width,
                height,
            } => assert_eq!((index, width, height), (1, 0, 4)),
            other => panic!("expected InvalidDimensions, got {other:?}"),
        }
    }

    #[test]
    fn empty_batch_is_rejected() {
        let token = CancellationToken::new();
        assert!(matches!(
            compose_document(&ImageBatch::empty(), 80, &token, None),
            Err(ConvertError::EmptyBatch)
        ));
    }

    #[test]
    fn cancelled_token_stops_before_first_page() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            compose_document(&batch(&[(2, 2)]), 80, &token, None),
            Err(ConvertError::Cancelled)
        ));
    }

    #[test]
    fn inspect_rejects_garbage() {
        assert!(matches!(
            inspect_document(b"definitely not a pdf"),
            Err(ConvertError::Decode { .. })
        ));
    }
}
