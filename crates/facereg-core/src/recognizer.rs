//! Face encoding model via ONNX Runtime.
//!
//! Produces 128-dimensional facial encodings from landmark-aligned
//! 112×112 RGB crops.

use crate::alignment;
use crate::types::{BoundingBox, Encoding};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ENCODER_INPUT_SIZE: usize = alignment::ALIGNED_SIZE as usize;
const ENCODER_MEAN: f32 = 127.5;
const ENCODER_STD: f32 = 127.5;
pub const ENCODING_DIM: usize = 128;
pub const ENCODER_MODEL_VERSION: &str = "face_encoder_128";

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("model file not found: {0} — place a 128-d face encoding model in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face has no landmarks — detector must return landmarks for alignment")]
    NoLandmarks,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ONNX face encoding model.
pub struct EncodingModel {
    session: Session,
}

impl EncodingModel {
    /// Load the encoding ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, RecognizerError> {
        if !Path::new(model_path).exists() {
            return Err(RecognizerError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face encoding model"
        );

        Ok(Self { session })
    }

    /// Extract the encoding of a detected face.
    ///
    /// The face is aligned to the canonical crop using its landmarks first.
    /// Values are returned as produced by the model, without normalization.
    pub fn extract(&mut self, image: &RgbImage, face: &BoundingBox) -> Result<Encoding, RecognizerError> {
        let landmarks = face.landmarks.as_ref().ok_or(RecognizerError::NoLandmarks)?;
        let aligned = alignment::align_face(image, landmarks);
        let input = preprocess(&aligned);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("encoding extraction: {e}")))?;

        if raw.len() != ENCODING_DIM {
            return Err(RecognizerError::InferenceFailed(format!(
                "expected {ENCODING_DIM}-dim encoding, got {}",
                raw.len()
            )));
        }

        Ok(Encoding::new(raw.to_vec()))
    }
}

/// Convert an aligned RGB crop into a normalized 1×3×112×112 tensor.
fn preprocess(aligned: &RgbImage) -> Array4<f32> {
    let size = ENCODER_INPUT_SIZE;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for (x, y, pixel) in aligned.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        if x >= size || y >= size {
            continue;
        }
        for c in 0..3 {
            tensor[[0, c, y, x]] = (pixel[c] as f32 - ENCODER_MEAN) / ENCODER_STD;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_preprocess_output_shape() {
        let aligned = RgbImage::new(ENCODER_INPUT_SIZE as u32, ENCODER_INPUT_SIZE as u32);
        let tensor = preprocess(&aligned);
        assert_eq!(tensor.shape(), &[1, 3, ENCODER_INPUT_SIZE, ENCODER_INPUT_SIZE]);
    }

    #[test]
    fn test_preprocess_normalizes_per_channel() {
        let aligned = RgbImage::from_pixel(
            ENCODER_INPUT_SIZE as u32,
            ENCODER_INPUT_SIZE as u32,
            Rgb([255, 0, 128]),
        );
        let tensor = preprocess(&aligned);
        assert!((tensor[[0, 0, 5, 7]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 5, 7]] + 1.0).abs() < 1e-6);
        let expected = (128.0 - ENCODER_MEAN) / ENCODER_STD;
        assert!((tensor[[0, 2, 5, 7]] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_missing_model_is_reported() {
        let err = EncodingModel::load("/nonexistent/face_encoder_128.onnx").err();
        assert!(matches!(err, Some(RecognizerError::ModelNotFound(_))));
    }
}
