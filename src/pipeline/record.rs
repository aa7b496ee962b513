//! Structured-record codec: one image ⇄ `{imageName, imageData, description}`.
//!
//! A record always encodes the **leading** image of a batch. Any further
//! images are ignored (and logged at debug level); callers that want one
//! record per image must submit one batch per image.
//!
//! Decoding separates two failure kinds: text that is not a record at all
//! ([`ConvertError::Decode`]) and a record whose payload does not hold a
//! decodable image ([`ConvertError::InvalidPayload`]).

use crate::error::ConvertError;
use crate::model::{ImageBatch, RasterImage};
use crate::output::{DecodedRecord, ProcessedRecord, TextRecordArtifact};
use crate::pipeline::encode::{text_decode, text_encode};
use crate::progress::ProgressCallback;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Build a record from a single image.
pub fn encode_image_record(
    image: &RasterImage,
    name: &str,
    description: &str,
    quality: u8,
) -> Result<ProcessedRecord, ConvertError> {
    let jpeg = image.encode_lossy(quality)?;
    let payload = text_encode(&jpeg);
    debug!(
        "Encoded {}x{} image → {} bytes JPEG, {} bytes base64",
        image.width(),
        image.height(),
        jpeg.len(),
        payload.len()
    );
    Ok(ProcessedRecord {
        name: name.to_string(),
        payload,
        description: description.to_string(),
    })
}

/// Encode the leading image of `batch` into a serialised record.
///
/// Blocking; the coordinator runs it inside `spawn_blocking`.
pub fn encode_record(
    batch: &ImageBatch,
    name: &str,
    description: &str,
    quality: u8,
    cancel: &CancellationToken,
    progress: Option<&ProgressCallback>,
) -> Result<TextRecordArtifact, ConvertError> {
    let image = batch.first().ok_or(ConvertError::EmptyBatch)?;
    if batch.len() > 1 {
        debug!(
            "Record encodes the leading image only; {} trailing image(s) ignored",
            batch.len() - 1
        );
    }

    if let Some(cb) = progress {
        cb.on_conversion_start(1);
    }

    if cancel.is_cancelled() {
        info!("Record encoding cancelled before the leading image");
        if let Some(cb) = progress {
            cb.on_conversion_complete(1, 0);
        }
        return Err(ConvertError::Cancelled);
    }

    if let Some(cb) = progress {
        cb.on_page_start(1, 1);
    }

    let record = match encode_image_record(image, name, description, quality) {
        Ok(record) => record,
        Err(e) => {
            if let Some(cb) = progress {
                cb.on_page_error(1, 1, &e.to_string());
                cb.on_conversion_complete(1, 0);
            }
            return Err(e);
        }
    };

    let json = serde_json::to_string_pretty(&record).map_err(|e| ConvertError::Encode {
        detail: format!("record serialisation failed: {e}"),
    })?;

    if let Some(cb) = progress {
        cb.on_page_complete(1, 1, record.payload.len());
        cb.on_conversion_complete(1, 1);
    }
    info!(
        "Encoded record '{}' → {} bytes JSON",
        record.name,
        json.len()
    );

    Ok(TextRecordArtifact { record, json })
}

/// Parse record text without touching the payload.
pub fn parse_record(text: &str) -> Result<ProcessedRecord, ConvertError> {
    serde_json::from_str(text).map_err(|e| ConvertError::Decode {
        detail: e.to_string(),
    })
}

/// Parse record text and reconstruct its image.
pub fn decode_record(text: &str) -> Result<DecodedRecord, ConvertError> {
    let record = parse_record(text)?;

    let compressed = text_decode(&record.payload).map_err(|e| ConvertError::InvalidPayload {
        detail: format!("imageData is not valid base64: {e}"),
    })?;

    let image = RasterImage::decode(&compressed).map_err(|e| ConvertError::InvalidPayload {
        detail: format!("Invalid image data: {e}"),
    })?;
    debug!(
        "Decoded record '{}' → {}x{} image",
        record.name,
        image.width(),
        image.height()
    );

    Ok(DecodedRecord {
        record,
        compressed,
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ConversionProgressCallback;
    use std::sync::{Arc, Mutex};

    fn encode(batch: &ImageBatch) -> TextRecordArtifact {
        encode_record(
            batch,
            "processedImage",
            "Processed image data",
            80,
            &CancellationToken::new(),
            None,
        )
        .expect("encode should succeed")
    }

    #[test]
    fn two_by_two_record_has_expected_fields() {
        let img = RasterImage::solid(2, 2, [10, 200, 30]);
        let artifact = encode(&ImageBatch::from_images(vec![img.clone()]));

        let expected_payload = text_encode(&img.encode_lossy(80).unwrap());
        assert_eq!(artifact.record.name, "processedImage");
        assert_eq!(artifact.record.description, "Processed image data");
        assert_eq!(artifact.record.payload, expected_payload);

        let value: serde_json::Value = serde_json::from_str(&artifact.json).unwrap();
        assert_eq!(value["imageName"], "processedImage");
        assert_eq!(value["imageData"], expected_payload.as_str());
        assert_eq!(value["description"], "Processed image data");
    }

    #[test]
    fn only_leading_image_is_encoded() {
        let first = RasterImage::solid(4, 4, [0, 0, 0]);
        let second = RasterImage::solid(9, 9, [255, 255, 255]);
        let single = encode(&ImageBatch::from_images(vec![first.clone()]));
        let multi = encode(&ImageBatch::from_images(vec![first, second]));
        assert_eq!(single.record, multi.record);
    }

    #[test]
    fn decode_reproduces_payload_and_metadata() {
        let artifact = encode(&ImageBatch::from_images(vec![RasterImage::solid(
            6,
            3,
            [90, 90, 90],
        )]));
        let decoded = decode_record(&artifact.json).expect("decode should succeed");
        assert_eq!(decoded.record, artifact.record);
        assert_eq!(text_encode(&decoded.compressed), artifact.record.payload);
        assert_eq!(decoded.image.dimensions(), (6, 3));
    }

    #[test]
    fn encoding_is_deterministic() {
        let batch = ImageBatch::from_images(vec![RasterImage::solid(7, 7, [1, 99, 200])]);
        assert_eq!(encode(&batch).json, encode(&batch).json);
    }

    #[test]
    fn malformed_json_is_decode_error() {
        assert!(matches!(
            decode_record("{\"imageName\": "),
            Err(ConvertError::Decode { .. })
        ));
        assert!(matches!(
            decode_record(r#"{"imageName": "x", "description": "y"}"#),
            Err(ConvertError::Decode { .. })
        ));
    }

    #[test]
    fn bad_payload_is_invalid_payload() {
        let not_base64 = r#"{"imageName":"x","imageData":"@@@","description":"y"}"#;
        assert!(matches!(
            decode_record(not_base64),
            Err(ConvertError::InvalidPayload { .. })
        ));

        let not_image = format!(
            r#"{{"imageName":"x","imageData":"{}","description":"y"}}"#,
            text_encode(b"hello world")
        );
        assert!(matches!(
            decode_record(&not_image),
            Err(ConvertError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn empty_batch_and_cancel() {
        let token = CancellationToken::new();
        assert!(matches!(
            encode_record(&ImageBatch::empty(), "n", "d", 80, &token, None),
            Err(ConvertError::EmptyBatch)
        ));
        token.cancel();
        let batch = ImageBatch::from_images(vec![RasterImage::solid(1, 1, [0, 0, 0])]);
        assert!(matches!(
            encode_record(&batch, "n", "d", 80, &token, None),
            Err(ConvertError::Cancelled)
        ));
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl ConversionProgressCallback for Events {
        fn on_conversion_start(&self, total_pages: usize) {
            self.0.lock().unwrap().push(format!("start {total_pages}"));
        }

        fn on_page_start(&self, page_num: usize, _total_pages: usize) {
            self.0.lock().unwrap().push(format!("page {page_num}"));
        }

        fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
            self.0
                .lock()
                .unwrap()
                .push(format!("complete {success_count}/{total_pages}"));
        }
    }

    #[test]
    fn cancelled_record_still_reports_completion() {
        let events = Arc::new(Events::default());
        let progress: ProgressCallback = events.clone();
        let token = CancellationToken::new();
        token.cancel();
        let batch = ImageBatch::from_images(vec![RasterImage::solid(2, 2, [0, 0, 0])]);

        let result = encode_record(&batch, "n", "d", 80, &token, Some(&progress));
        assert!(matches!(result, Err(ConvertError::Cancelled)));
        assert_eq!(*events.0.lock().unwrap(), vec!["start 1", "complete 0/1"]);
    }
}
