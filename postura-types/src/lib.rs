//! Shared data contract for postura, the unsupervised movement-risk engine.
//!
//! Pose estimation runs outside this workspace (MediaPipe, MoveNet, or any
//! other 33-point body model). What crosses the boundary into the engine is a
//! list of [`Landmark`]s per frame; what comes back out is a
//! [`PredictionResult`]. Both ends live here so that the scorer, the CLI, and
//! any downstream alerting layer agree on one definition.
//!
//! # Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Landmark`] | One normalized body landmark (x, y, z, visibility) |
//! | [`pose`] | Landmark indices of the 33-point pose topology |
//! | [`RiskLevel`] | Discrete `low` / `medium` / `high` classification |
//! | [`PredictionResult`] | Full per-frame scoring output |

use serde::{Deserialize, Serialize};

/// Number of landmarks in the full-body pose topology.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// Landmark indices (MediaPipe Pose ordering, 33 total).
pub mod pose {
    pub const NOSE: usize = 0;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_KNEE: usize = 25;
    pub const RIGHT_KNEE: usize = 26;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;
}

/// A single body landmark in normalized image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position, 0-1 normalized.
    pub x: f32,
    /// Vertical position, 0-1 normalized (grows downwards).
    pub y: f32,
    /// Relative depth; smaller is closer to the camera.
    pub z: f32,
    /// Detector visibility score (0.0–1.0).
    #[serde(default)]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark {
            x,
            y,
            z,
            visibility: 1.0,
        }
    }

    /// 2D position in the image plane.
    pub fn xy(&self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }
}

/// Discrete movement-risk classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

/// Scoring output for one captured pose.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Soft-boundary classification of the risk score.
    pub risk_level: RiskLevel,
    /// Risk value of the assigned movement cluster.
    pub movement_risk_score: f64,
    /// Confidence of the assignment (0.0–1.0).
    pub confidence: f64,
    /// Index of the nearest movement cluster.
    pub cluster_id: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landmark_new_is_fully_visible() {
        let l = Landmark::new(0.1, 0.2, -0.3);
        assert_eq!(l.visibility, 1.0);
        assert_eq!(l.xy(), (0.1f32 as f64, 0.2f32 as f64));
    }

    #[test]
    fn risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn risk_level_display_and_parse() {
        for level in RiskLevel::ALL {
            let parsed: RiskLevel = level.to_string().parse().unwrap();
            assert_eq!(parsed, level);
        }
        assert_eq!("HIGH".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert!("severe".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn pose_indices_within_topology() {
        for idx in [
            pose::NOSE,
            pose::LEFT_SHOULDER,
            pose::RIGHT_ANKLE,
            pose::LEFT_KNEE,
        ] {
            assert!(idx < POSE_LANDMARK_COUNT);
        }
    }
}
