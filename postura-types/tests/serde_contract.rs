//! Wire-format tests for the types that cross the engine boundary.

use postura_types::{Landmark, PredictionResult, RiskLevel};

#[test]
fn risk_level_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&RiskLevel::Low).unwrap(), "\"low\"");
    assert_eq!(
        serde_json::to_string(&RiskLevel::Medium).unwrap(),
        "\"medium\""
    );
    assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"high\"");
}

#[test]
fn prediction_result_json_shape() {
    let result = PredictionResult {
        risk_level: RiskLevel::Medium,
        movement_risk_score: 0.25,
        confidence: 0.8,
        cluster_id: 2,
    };

    let value: serde_json::Value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["risk_level"], "medium");
    assert_eq!(value["movement_risk_score"], 0.25);
    assert_eq!(value["confidence"], 0.8);
    assert_eq!(value["cluster_id"], 2);

    let back: PredictionResult = serde_json::from_value(value).unwrap();
    assert_eq!(back, result);
}

#[test]
fn landmark_visibility_defaults_when_missing() {
    let l: Landmark = serde_json::from_str(r#"{"x":0.5,"y":0.25,"z":-0.1}"#).unwrap();
    assert_eq!(l.x, 0.5);
    assert_eq!(l.y, 0.25);
    assert_eq!(l.visibility, 0.0);
}

#[test]
fn unknown_risk_level_rejected() {
    let err = serde_json::from_str::<RiskLevel>("\"critical\"");
    assert!(err.is_err());
}
