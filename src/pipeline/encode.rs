//! Text-safe transform: compressed image bytes ⇄ base64 text.
//!
//! Records are JSON, and JSON strings cannot carry arbitrary bytes, so the
//! JPEG payload is wrapped in standard, padded base64. The transform is a
//! bijection on byte strings: `text_decode(&text_encode(b)) == b` for every
//! `b`, including the empty one.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encode arbitrary bytes as standard padded base64.
pub fn text_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard padded base64 back to bytes.
pub fn text_decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_round_trip() {
        assert_eq!(text_encode(&[]), "");
        assert_eq!(text_decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn all_byte_values_round_trip() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4096 + 1).collect();
        let text = text_encode(&bytes);
        assert!(text.is_ascii());
        assert_eq!(text_decode(&text).unwrap(), bytes);
    }

    #[test]
    fn large_buffer_round_trip() {
        let bytes: Vec<u8> = (0..8 * 1024 * 1024u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
            .collect();
        assert_eq!(text_decode(&text_encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn rejects_non_base64() {
        assert!(text_decode("not base64!").is_err());
    }
}
