//! Clarity tile record type

use serde::{Deserialize, Serialize};

/// A normalized clarity tile.
///
/// Every instance that leaves the normalizer successfully satisfies the
/// shape invariants: `objective` and `single_next_action` are non-empty,
/// `five_step_flow` has exactly 5 entries, `metrics` has 2-5 entries, and
/// `followup_questions` has at most 2 entries. A tile is immutable after
/// creation; tags live on the persisted row, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarityTile {
    /// Clear, concise statement of what the work is for
    pub objective: String,

    /// Hard limits the plan must respect
    #[serde(default)]
    pub constraints: Vec<String>,

    /// What to eliminate before starting
    #[serde(default)]
    pub deletion_pass: Vec<String>,

    /// The plan, always exactly five steps
    pub five_step_flow: Vec<String>,

    /// One action doable in under 30 minutes
    pub single_next_action: String,

    /// How success is measured (2-5 entries)
    pub metrics: Vec<String>,

    /// How progress feeds back into the plan
    #[serde(default)]
    pub feedback_loop: String,

    /// Assumptions the plan rests on
    #[serde(default)]
    pub assumptions: Vec<String>,

    /// Open questions for the caller (at most 2)
    #[serde(default)]
    pub followup_questions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_round_trip() {
        let tile = ClarityTile {
            objective: "ship the beta".to_string(),
            constraints: vec!["two weeks".to_string()],
            deletion_pass: vec![],
            five_step_flow: vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
                "e".to_string(),
            ],
            single_next_action: "write the announcement draft".to_string(),
            metrics: vec!["Progress".to_string(), "Quality".to_string()],
            feedback_loop: String::new(),
            assumptions: vec![],
            followup_questions: vec![],
        };

        let json = serde_json::to_string(&tile).unwrap();
        let parsed: ClarityTile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tile);
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{
            "objective": "x",
            "five_step_flow": ["1", "2", "3", "4", "5"],
            "single_next_action": "y",
            "metrics": ["a", "b"]
        }"#;

        let tile: ClarityTile = serde_json::from_str(json).unwrap();
        assert!(tile.constraints.is_empty());
        assert!(tile.deletion_pass.is_empty());
        assert!(tile.feedback_loop.is_empty());
        assert!(tile.assumptions.is_empty());
        assert!(tile.followup_questions.is_empty());
    }
}
