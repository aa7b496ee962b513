//! Input resolution: turn user-supplied paths or URLs into an [`ImageBatch`].
//!
//! Inputs are loaded strictly in the order given, because that order becomes
//! the page order of the document. URL inputs are downloaded into memory with
//! a timeout; local inputs are read from disk. Every input is sniffed for a
//! supported image signature before it is decoded, so a stray text file
//! yields a clear error instead of a decoder message.

use crate::error::ConvertError;
use crate::model::{ImageBatch, RasterImage};
use image::ImageFormat;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load every input, in order, into one immutable batch.
pub async fn load_batch<S: AsRef<str>>(
    inputs: &[S],
    timeout_secs: u64,
) -> Result<ImageBatch, ConvertError> {
    let mut images = Vec::with_capacity(inputs.len());
    for input in inputs {
        images.push(load_image(input.as_ref(), timeout_secs).await?);
    }
    info!("Loaded batch of {} image(s)", images.len());
    Ok(ImageBatch::from_images(images))
}

/// Load a single image from a local path or an HTTP/HTTPS URL.
pub async fn load_image(input: &str, timeout_secs: u64) -> Result<RasterImage, ConvertError> {
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    let origin = PathBuf::from(input);

    // Decoding is CPU-bound; keep it off the async workers.
    tokio::task::spawn_blocking(move || decode_image(&bytes, origin))
        .await
        .map_err(|e| ConvertError::Internal(format!("Decode task panicked: {}", e)))?
}

/// Sniff and decode an in-memory image.
pub fn decode_image(bytes: &[u8], origin: PathBuf) -> Result<RasterImage, ConvertError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) | Ok(ImageFormat::Jpeg) => {}
        _ => return Err(ConvertError::NotAnImage { path: origin }),
    }
    let image = RasterImage::decode(bytes).map_err(|_| ConvertError::NotAnImage {
        path: origin.clone(),
    })?;
    debug!(
        "Decoded {} → {}x{}",
        origin.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, ConvertError> {
    let path = PathBuf::from(path_str);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConvertError::FileNotFound { path })
        }
        Err(e) => Err(ConvertError::Io { path, source: e }),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, ConvertError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ConvertError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    debug!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/photo.jpg"));
        assert!(is_url("http://example.com/photo.png"));
        assert!(!is_url("/tmp/photo.jpg"));
        assert!(!is_url("photo.jpg"));
        assert!(!is_url(""));
    }

    #[test]
    fn decode_rejects_non_image() {
        let err = decode_image(b"%PDF-1.5 not an image", PathBuf::from("doc.pdf")).unwrap_err();
        assert!(matches!(err, ConvertError::NotAnImage { .. }));
    }

    #[test]
    fn decode_accepts_jpeg() {
        let jpeg = RasterImage::solid(4, 2, [0, 0, 255]).encode_lossy(90).unwrap();
        let img = decode_image(&jpeg, PathBuf::from("mem.jpg")).unwrap();
        assert_eq!(img.dimensions(), (4, 2));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = load_image("/definitely/not/a/real/photo.png", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn batch_keeps_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (i, (w, h)) in [(3u32, 1u32), (1, 3), (2, 2)].into_iter().enumerate() {
            let p = dir.path().join(format!("img{i}.png"));
            RasterImage::solid(w, h, [9, 9, 9])
                .as_dynamic()
                .save(&p)
                .unwrap();
            paths.push(p.to_string_lossy().to_string());
        }
        let batch = load_batch(&paths, 5).await.unwrap();
        let dims: Vec<_> = batch.iter().map(RasterImage::dimensions).collect();
        assert_eq!(dims, vec![(3, 1), (1, 3), (2, 2)]);
    }
}
