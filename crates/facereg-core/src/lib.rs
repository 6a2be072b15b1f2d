//! facereg-core — Face encoding and matching engine.
//!
//! Decodes base64 images, detects faces with SCRFD, aligns them and extracts
//! 128-dimensional encodings via ONNX Runtime, and matches encodings against
//! a gallery of registered faces by Euclidean distance.

pub mod alignment;
pub mod decode;
pub mod detector;
pub mod pipeline;
pub mod recognizer;
pub mod types;

pub use detector::FaceDetector;
pub use pipeline::{EncoderError, FaceEncoder, OnnxFaceEncoder};
pub use recognizer::EncodingModel;
pub use types::{
    BoundingBox, Encoding, EuclideanMatcher, FaceRecord, MatchResult, Matcher, DEFAULT_THRESHOLD,
};

use std::path::PathBuf;

/// Default directory holding the ONNX model files.
///
/// `$XDG_DATA_HOME/facereg/models`, falling back to `~/.local/share/facereg/models`.
pub fn default_model_dir() -> PathBuf {
    data_dir().join("models")
}

/// Per-user data directory for facereg.
pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facereg")
}
