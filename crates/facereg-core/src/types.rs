use serde::{Deserialize, Serialize};

/// Euclidean distance at or below which the nearest known encoding is a match.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Facial encoding vector (128-dimensional for the bundled encoding model).
///
/// Serialized as a bare JSON array of numbers. Values are held as `f32`,
/// matching the model output, so float64 arrays from an older store are
/// narrowed on load and written back at `f32` precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding {
    pub values: Vec<f32>,
}

impl Encoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compute Euclidean distance between two encodings.
    ///
    /// Callers are expected to compare encodings of equal length; extra
    /// trailing values on either side are ignored.
    pub fn euclidean_distance(&self, other: &Encoding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// L2 norm of the encoding.
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }
}

impl From<Vec<f32>> for Encoding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// A registered face: the name it was registered under and its encoding.
///
/// Names are not unique; registering the same name twice keeps both records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub name: String,
    pub encoding: Encoding,
}

/// Result of matching a probe encoding against a gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Name of the nearest record, set only when its distance is within the threshold.
    pub name: Option<String>,
    /// Distance to the nearest record; `None` when the gallery is empty.
    pub distance: Option<f32>,
}

impl MatchResult {
    pub fn matched(&self) -> bool {
        self.name.is_some()
    }
}

/// Strategy for comparing a probe encoding against a gallery of registered faces.
pub trait Matcher {
    fn compare(&self, probe: &Encoding, gallery: &[FaceRecord], threshold: f32) -> MatchResult;
}

/// Nearest-neighbour matcher over Euclidean distance.
///
/// Scans the whole gallery; on equal distances the earliest record wins.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(&self, probe: &Encoding, gallery: &[FaceRecord], threshold: f32) -> MatchResult {
        let mut best: Option<(usize, f32)> = None;

        for (i, record) in gallery.iter().enumerate() {
            let dist = probe.euclidean_distance(&record.encoding);
            tracing::trace!(index = i, name = %record.name, distance = dist, "compared");
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((i, dist)),
            }
        }

        match best {
            Some((idx, dist)) if dist <= threshold => MatchResult {
                name: Some(gallery[idx].name.clone()),
                distance: Some(dist),
            },
            Some((_, dist)) => MatchResult {
                name: None,
                distance: Some(dist),
            },
            None => MatchResult {
                name: None,
                distance: None,
            },
        }
    }
}
