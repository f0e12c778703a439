//! Payload decoding for downloaded responses
//!
//! Remote payloads arrive content-encoded (gzip) and charset-labelled. This
//! module turns raw body bytes into text:
//!
//! 1. gunzip when the `Content-Encoding` says so
//! 2. decode with the charset named by the `Content-Type` (UTF-8 if absent)
//!
//! Unlabelled text (the lines of the text extracts) goes through
//! [`decode_text`] instead.

use crate::error::{PbsError, Result};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use flate2::read::GzDecoder;
use std::borrow::Cow;
use std::io::Read;
use tracing::debug;

/// Decompress gzip-compressed data
pub fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| PbsError::Decompression(format!("invalid gzip data: {}", e)))?;
    debug!("Decompressed {} -> {} bytes", data.len(), decompressed.len());
    Ok(decompressed)
}

/// Resolve the text encoding named by a `Content-Type` header value
///
/// A missing header or a media type without a `charset` parameter means UTF-8.
pub fn charset_from_content_type(content_type: Option<&str>) -> Result<&'static Encoding> {
    let Some(content_type) = content_type else {
        return Ok(UTF_8);
    };

    let mime: mime::Mime = match content_type.parse() {
        Ok(mime) => mime,
        Err(_) => return Ok(UTF_8),
    };

    match mime.get_param(mime::CHARSET) {
        Some(label) => Encoding::for_label_no_replacement(label.as_str().as_bytes())
            .ok_or_else(|| PbsError::UnsupportedCharset(label.as_str().to_string())),
        None => Ok(UTF_8),
    }
}

/// Decode a response body into text
///
/// # Arguments
/// * `body` - Raw body bytes as received
/// * `content_encoding` - Value of the `Content-Encoding` header, if any
/// * `content_type` - Value of the `Content-Type` header, if any
pub fn decode_payload(
    body: &[u8],
    content_encoding: Option<&str>,
    content_type: Option<&str>,
) -> Result<String> {
    let bytes = match content_encoding.map(|e| e.trim().to_ascii_lowercase()) {
        Some(encoding) if encoding == "gzip" || encoding == "x-gzip" => decompress_gzip(body)?,
        Some(encoding) if encoding.is_empty() || encoding == "identity" => body.to_vec(),
        Some(encoding) => {
            return Err(PbsError::Decompression(format!(
                "unsupported content encoding: {}",
                encoding
            )))
        },
        None => body.to_vec(),
    };

    let encoding = charset_from_content_type(content_type)?;
    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(PbsError::Decompression(format!(
            "payload is not valid {}",
            encoding.name()
        )));
    }

    Ok(text.into_owned())
}

/// Decode unlabelled text: UTF-8 when valid, otherwise Windows-1252
///
/// Windows-1252 maps every byte, so this never fails.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn create_gzip_data(content: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decompress_gzip() {
        let original = b"{\"data\": []}";
        let compressed = create_gzip_data(original);
        let decompressed = decompress_gzip(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_decompress_gzip_invalid() {
        let invalid = b"not gzip data";
        assert!(matches!(decompress_gzip(invalid), Err(PbsError::Decompression(_))));
    }

    #[test]
    fn test_charset_defaults_to_utf8() {
        assert_eq!(charset_from_content_type(None).unwrap(), UTF_8);
        assert_eq!(charset_from_content_type(Some("application/json")).unwrap(), UTF_8);
    }

    #[test]
    fn test_charset_from_label() {
        let encoding = charset_from_content_type(Some("text/plain; charset=ISO-8859-1")).unwrap();
        assert_eq!(encoding.name(), "windows-1252");
    }

    #[test]
    fn test_charset_unknown_label() {
        let result = charset_from_content_type(Some("text/plain; charset=klingon"));
        assert!(matches!(result, Err(PbsError::UnsupportedCharset(label)) if label == "klingon"));
    }

    #[test]
    fn test_decode_gzip_latin1_payload() {
        // "Café" in ISO-8859-1
        let compressed = create_gzip_data(&[0x43, 0x61, 0x66, 0xE9]);
        let text = decode_payload(
            &compressed,
            Some("gzip"),
            Some("application/json; charset=iso-8859-1"),
        )
        .unwrap();
        assert_eq!(text, "Café");
    }

    #[test]
    fn test_decode_identity_payload() {
        let text = decode_payload(b"plain", None, None).unwrap();
        assert_eq!(text, "plain");
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let result = decode_payload(&[0xFF, 0xFE, 0x00], None, Some("application/json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_text_falls_back_to_windows_1252() {
        assert_eq!(decode_text("Café".as_bytes()), "Café");
        assert!(matches!(decode_text(b"plain"), Cow::Borrowed(_)));
        assert_eq!(decode_text(&[0x43, 0x61, 0x66, 0xE9, 0x20, 0x96]), "Café \u{2013}");
    }

    #[test]
    fn test_decode_rejects_unknown_encoding() {
        let result = decode_payload(b"data", Some("br"), None);
        assert!(matches!(result, Err(PbsError::Decompression(_))));
    }
}
