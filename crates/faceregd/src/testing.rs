//! Deterministic face encoder and image fixtures for daemon tests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use facereg_core::{Encoding, EncoderError, FaceEncoder};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

const FAKE_DIM: usize = 128;

/// Treats every non-black pixel of the first row as a face whose encoding
/// is 128 copies of `red / 255`.
pub struct FakeEncoder;

impl FaceEncoder for FakeEncoder {
    fn encode_faces(&mut self, image: &RgbImage) -> Result<Vec<Encoding>, EncoderError> {
        Ok((0..image.width())
            .map(|x| image.get_pixel(x, 0))
            .filter(|p| p.0 != [0, 0, 0])
            .map(|p| Encoding::new(vec![p[0] as f32 / 255.0; FAKE_DIM]))
            .collect())
    }

    fn model_version(&self) -> &str {
        "fake"
    }
}

fn png_base64(img: &RgbImage) -> String {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    STANDARD.encode(buf.into_inner())
}

/// Base64 PNG with one "face" per entry, keyed by its red channel.
pub fn face_image(reds: &[u8]) -> String {
    let mut img = RgbImage::new(reds.len() as u32, 1);
    for (x, &r) in reds.iter().enumerate() {
        img.put_pixel(x as u32, 0, Rgb([r, 128, 128]));
    }
    png_base64(&img)
}

/// Base64 PNG in which the fake encoder finds no face.
pub fn no_face_image() -> String {
    png_base64(&RgbImage::new(2, 2))
}
