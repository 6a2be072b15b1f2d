//! Face encoding backend: image in, one encoding per detected face out.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{EncodingModel, RecognizerError, ENCODER_MODEL_VERSION};
use crate::types::Encoding;
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
pub const ENCODER_MODEL_FILE: &str = "face_encoder_128.onnx";

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Anything that turns an image into facial encodings.
///
/// Encodings are returned in detection order; an image without faces
/// yields an empty list rather than an error.
pub trait FaceEncoder {
    fn encode_faces(&mut self, image: &RgbImage) -> Result<Vec<Encoding>, EncoderError>;

    /// Identifier of the model producing the encodings.
    fn model_version(&self) -> &str;
}

/// SCRFD detection followed by landmark alignment and the 128-d encoding model.
pub struct OnnxFaceEncoder {
    detector: FaceDetector,
    model: EncodingModel,
}

impl OnnxFaceEncoder {
    pub fn new(detector: FaceDetector, model: EncodingModel) -> Self {
        Self { detector, model }
    }

    /// Load both models from `model_dir` using their standard file names.
    pub fn load_dir(model_dir: &Path) -> Result<Self, EncoderError> {
        let det_path = model_dir.join(DETECTOR_MODEL_FILE);
        let enc_path = model_dir.join(ENCODER_MODEL_FILE);

        let detector = FaceDetector::load(&det_path.to_string_lossy())?;
        let model = EncodingModel::load(&enc_path.to_string_lossy())?;
        Ok(Self::new(detector, model))
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode_faces(&mut self, image: &RgbImage) -> Result<Vec<Encoding>, EncoderError> {
        let faces = self.detector.detect(image)?;

        let mut encodings = Vec::with_capacity(faces.len());
        for face in &faces {
            if face.landmarks.is_none() {
                tracing::debug!(confidence = face.confidence, "skipping face without landmarks");
                continue;
            }
            encodings.push(self.model.extract(image, face)?);
        }

        tracing::debug!(detected = faces.len(), encoded = encodings.len(), "encoded faces");
        Ok(encodings)
    }

    fn model_version(&self) -> &str {
        ENCODER_MODEL_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_dir_without_models_fails() {
        let dir = std::env::temp_dir().join("facereg-no-models-here");
        let err = OnnxFaceEncoder::load_dir(&dir).err();
        assert!(matches!(
            err,
            Some(EncoderError::Detector(DetectorError::ModelNotFound(path))) if path.ends_with(DETECTOR_MODEL_FILE)
        ));
    }
}
