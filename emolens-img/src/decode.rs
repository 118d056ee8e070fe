use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageReader, RgbImage};
use tracing::warn;

/// Decode a base64 payload, optionally carrying a data-URL header such as
/// `data:image/png;base64,`, into an RGB pixel buffer.
///
/// This is a boundary: malformed base64, truncated image bytes and
/// unsupported containers are logged and come back as `None`, never as a
/// panic or an error.
pub fn decode_base64_image(payload: &str) -> Option<RgbImage> {
    let encoded = match payload.split_once(',') {
        Some((_header, rest)) => rest,
        None => payload,
    };

    // clients wrap long base64 payloads in newlines
    let encoded: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = match BASE64.decode(encoded.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("payload is not valid base64: {e}");
            return None;
        }
    };

    let reader = match ImageReader::new(Cursor::new(bytes)).with_guessed_format() {
        Ok(reader) => reader,
        Err(e) => {
            warn!("failed to sniff image format: {e}");
            return None;
        }
    };

    match reader.decode() {
        Ok(img) => Some(img.into_rgb8()),
        Err(e) => {
            warn!("failed to decode image bytes: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 120, 230]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decodes_plain_base64_png() {
        let encoded = BASE64.encode(png_bytes(17, 9));
        let img = decode_base64_image(&encoded).unwrap();
        assert_eq!(img.dimensions(), (17, 9));
        assert_eq!(img.get_pixel(0, 0), &Rgb([10, 120, 230]));
    }

    #[test]
    fn test_strips_data_url_header() {
        let encoded = format!("data:image/png;base64,{}", BASE64.encode(png_bytes(4, 4)));
        let img = decode_base64_image(&encoded).unwrap();
        assert_eq!(img.dimensions(), (4, 4));
    }

    #[test]
    fn test_ignores_embedded_whitespace() {
        let mut encoded = BASE64.encode(png_bytes(4, 4));
        encoded.insert(10, '\n');
        encoded.insert(20, ' ');
        assert!(decode_base64_image(&encoded).is_some());
    }

    #[test]
    fn test_rejects_malformed_base64() {
        assert!(decode_base64_image("not-base64!!").is_none());
    }

    #[test]
    fn test_rejects_truncated_image_bytes() {
        let mut bytes = png_bytes(16, 16);
        bytes.truncate(12);
        assert!(decode_base64_image(&BASE64.encode(bytes)).is_none());
    }

    #[test]
    fn test_rejects_non_image_bytes() {
        assert!(decode_base64_image(&BASE64.encode(b"just some text")).is_none());
    }

    #[test]
    fn test_rejects_empty_payload() {
        assert!(decode_base64_image("").is_none());
    }
}
