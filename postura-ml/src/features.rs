use ndarray::Array2;
use postura_types::{pose, Landmark, POSE_LANDMARK_COUNT};

use crate::error::{Result, RiskError};

/// Number of derived movement features appended after the coordinates.
pub const DERIVED_FEATURES: usize = 7;

/// Total feature vector dimensionality.
///
/// | Range    | Count | Feature Group                                            |
/// |----------|-------|----------------------------------------------------------|
/// | 0..99    |   99  | x, y, z of each of the 33 landmarks                      |
/// | 99       |    1  | Left elbow angle (shoulder–elbow–wrist), degrees          |
/// | 100      |    1  | Left hip angle (shoulder–hip–knee), degrees               |
/// | 101      |    1  | Left knee angle (hip–knee–ankle), degrees                 |
/// | 102      |    1  | Mean 2D step between consecutive landmark indices         |
/// | 103..105 |    2  | Balance: hip level difference, ankle level difference     |
/// | 105      |    1  | Posture: left shoulder–hip vertical offset                |
///
/// Index 100 is measured at the hip between shoulder and knee. Layouts that
/// fill this slot with a second hip–knee–ankle angle produce vectors that
/// are not interchangeable with these; models must be trained and scored on
/// the same layout.
pub const FEATURE_DIM: usize = POSE_LANDMARK_COUNT * 3 + DERIVED_FEATURES;

/// Source of fixed-dimension feature vectors, one per captured frame.
///
/// Pose estimation backends plug in here; the engine only ever sees the
/// vectors.
pub trait FeatureProvider {
    type Frame: ?Sized;

    /// Feature vector for `frame`, or [`RiskError::NotDetected`] when no body
    /// pose was found.
    fn extract(&mut self, frame: &Self::Frame) -> Result<Vec<f64>>;
}

/// Turns 33 pose landmarks into a [`FEATURE_DIM`]-wide vector.
pub struct PoseFeatureExtractor {
    scratch: Vec<f64>,
}

impl Default for PoseFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseFeatureExtractor {
    pub fn new() -> Self {
        PoseFeatureExtractor {
            scratch: Vec::with_capacity(FEATURE_DIM),
        }
    }

    pub fn dim(&self) -> usize {
        FEATURE_DIM
    }
}

impl FeatureProvider for PoseFeatureExtractor {
    type Frame = [Landmark];

    fn extract(&mut self, landmarks: &[Landmark]) -> Result<Vec<f64>> {
        if landmarks.len() < POSE_LANDMARK_COUNT {
            return Err(RiskError::NotDetected);
        }
        let lm = &landmarks[..POSE_LANDMARK_COUNT];
        self.scratch.clear();

        // ---- Coordinates (0..99) ----
        for l in lm {
            self.scratch
                .extend_from_slice(&[l.x as f64, l.y as f64, l.z as f64]);
        }

        // ---- Joint angles (99..102) ----
        let at = |i: usize| lm[i].xy();
        self.scratch.push(joint_angle(
            at(pose::LEFT_SHOULDER),
            at(pose::LEFT_ELBOW),
            at(pose::LEFT_WRIST),
        ));
        self.scratch.push(joint_angle(
            at(pose::LEFT_SHOULDER),
            at(pose::LEFT_HIP),
            at(pose::LEFT_KNEE),
        ));
        self.scratch.push(joint_angle(
            at(pose::LEFT_HIP),
            at(pose::LEFT_KNEE),
            at(pose::LEFT_ANKLE),
        ));

        // ---- Landmark chain step (102) ----
        let steps: f64 = lm
            .windows(2)
            .map(|w| {
                let (x0, y0) = w[0].xy();
                let (x1, y1) = w[1].xy();
                ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt()
            })
            .sum();
        self.scratch.push(steps / (POSE_LANDMARK_COUNT - 1) as f64);

        // ---- Balance (103..105) ----
        self.scratch
            .push((at(pose::LEFT_HIP).1 - at(pose::RIGHT_HIP).1).abs());
        self.scratch
            .push((at(pose::LEFT_ANKLE).1 - at(pose::RIGHT_ANKLE).1).abs());

        // ---- Posture (105) ----
        self.scratch
            .push((at(pose::LEFT_SHOULDER).1 - at(pose::LEFT_HIP).1).abs());

        Ok(self.scratch.clone())
    }
}

/// Angle ABC at vertex `b`, in degrees within [0, 180].
pub fn joint_angle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    let radians = (c.1 - b.1).atan2(c.0 - b.0) - (a.1 - b.1).atan2(a.0 - b.0);
    let degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        360.0 - degrees
    } else {
        degrees
    }
}

/// Extract features from up to `max_frames` frames, skipping frames where
/// no pose was detected. Returns a matrix with one row per detected frame.
pub fn collect_features<'a, P, I>(provider: &mut P, frames: I, max_frames: usize) -> Result<Array2<f64>>
where
    P: FeatureProvider,
    P::Frame: 'a,
    I: IntoIterator<Item = &'a P::Frame>,
{
    let mut rows: Vec<f64> = Vec::new();
    let mut dim = None;
    let mut detected = 0usize;
    let mut skipped = 0usize;

    for frame in frames {
        if detected >= max_frames {
            break;
        }
        match provider.extract(frame) {
            Ok(v) => {
                let expected = *dim.get_or_insert(v.len());
                if v.len() != expected {
                    return Err(RiskError::DimensionMismatch {
                        expected,
                        actual: v.len(),
                    });
                }
                rows.extend_from_slice(&v);
                detected += 1;
            }
            Err(RiskError::NotDetected) => skipped += 1,
            Err(e) => return Err(e),
        }
    }

    if skipped > 0 {
        log::debug!("Skipped {} frame(s) without a detected pose", skipped);
    }
    let dim = dim.ok_or(RiskError::EmptyInput("no frame produced a feature vector"))?;
    Array2::from_shape_vec((detected, dim), rows)
        .map_err(|e| RiskError::InvalidConfig(format!("feature matrix shape: {e}")))
}
