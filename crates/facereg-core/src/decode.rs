//! Base64 image decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("undecodable image: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode a base64 payload into an RGB image.
///
/// Accepts an optional `data:<mime>;base64,` prefix and ignores ASCII
/// whitespace (line-wrapped encoders). The image format is sniffed from
/// the decoded bytes.
pub fn decode_base64_image(data: &str) -> Result<RgbImage, DecodeError> {
    let bytes = STANDARD.decode(strip_payload(data))?;
    let img = image::load_from_memory(&bytes)?;
    Ok(img.to_rgb8())
}

fn strip_payload(data: &str) -> String {
    let data = data.trim();
    let data = match data.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, b64)| b64).unwrap_or(rest),
        None => data,
    };
    data.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32, color: [u8; 3]) -> String {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        STANDARD.encode(buf.into_inner())
    }

    #[test]
    fn test_decode_png() {
        let img = decode_base64_image(&png_base64(3, 2, [10, 20, 30])).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_data_url_and_wrapped_lines() {
        let b64 = png_base64(1, 1, [200, 0, 0]);
        let (head, tail) = b64.split_at(b64.len() / 2);
        let payload = format!("data:image/png;base64,{head}\n{tail}\n");

        let img = decode_base64_image(&payload).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([200, 0, 0]));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode_base64_image("not base64 at all!").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn test_decode_rejects_non_image_bytes() {
        let payload = STANDARD.encode(b"plain text, not an image");
        let err = decode_base64_image(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        assert!(decode_base64_image("").is_err());
    }
}
