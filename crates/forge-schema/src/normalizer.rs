//! Document normalizer
//!
//! Coerces a complete raw document (one JSON object produced by the model)
//! into a [`ClarityTile`]. Normalization is a pure function: parse, require
//! the two mandatory fields, repair the bounded lists, emit. Every repair is
//! returned as data so callers can observe it; repairs never block record
//! creation. Only a parse failure or a missing required field does.

use serde_json::Value;
use thiserror::Error;

use crate::record::ClarityTile;
use crate::{FIVE_STEP_FLOW_LEN, FOLLOWUP_QUESTIONS_MAX, METRICS_MAX, METRICS_MIN};

/// Placeholder metrics appended when the model supplies too few.
const METRIC_PLACEHOLDERS: [&str; 2] = ["Progress", "Quality"];

/// Errors that block record creation.
///
/// Messages are single-line and never echo the document contents.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The buffer is not one well-formed JSON object
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A mandatory field is absent or empty
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
}

impl NormalizeError {
    /// Stable code string for the wire-level error registry
    pub fn code(&self) -> &'static str {
        match self {
            NormalizeError::MalformedDocument(_) => "MALFORMED_DOCUMENT",
            NormalizeError::MissingRequiredField(_) => "MISSING_REQUIRED_FIELD",
        }
    }
}

/// A repair applied during normalization. Observable, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    /// `five_step_flow` was longer than 5 and was truncated
    FiveStepFlowTruncated { from: usize },
    /// `five_step_flow` was shorter than 5 and was padded with "Step {n}"
    FiveStepFlowPadded { from: usize },
    /// `five_step_flow` was absent or not a list and was replaced wholesale
    FiveStepFlowReplaced,
    /// `metrics` was longer than 5 and was truncated
    MetricsTruncated { from: usize },
    /// `metrics` was shorter than 2 and was padded with placeholders
    MetricsPadded { from: usize },
    /// `metrics` was absent or not a list and was replaced with placeholders
    MetricsReplaced,
    /// `followup_questions` was longer than 2 and was truncated
    FollowupQuestionsTruncated { from: usize },
}

/// A successfully normalized document: the tile plus the repairs applied.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub tile: ClarityTile,
    pub repairs: Vec<Repair>,
}

impl Normalized {
    /// True if any repair was applied
    pub fn was_repaired(&self) -> bool {
        !self.repairs.is_empty()
    }
}

/// Normalize a complete raw document into a tile.
pub fn normalize(document: &str) -> Result<Normalized, NormalizeError> {
    let value: Value = serde_json::from_str(document)
        .map_err(|e| NormalizeError::MalformedDocument(e.to_string()))?;

    let Value::Object(mut doc) = value else {
        return Err(NormalizeError::MalformedDocument(
            "expected a JSON object at the top level".to_string(),
        ));
    };

    let objective = require_string(&doc, "objective")?;
    let single_next_action = require_string(&doc, "single_next_action")?;

    let mut repairs = Vec::new();

    let five_step_flow = repair_five_step_flow(doc.remove("five_step_flow"), &mut repairs);
    let metrics = repair_metrics(doc.remove("metrics"), &mut repairs);
    let followup_questions =
        repair_followup_questions(doc.remove("followup_questions"), &mut repairs);

    let tile = ClarityTile {
        objective,
        constraints: string_list_or_empty(doc.remove("constraints")),
        deletion_pass: string_list_or_empty(doc.remove("deletion_pass")),
        five_step_flow,
        single_next_action,
        metrics,
        feedback_loop: string_or_empty(doc.remove("feedback_loop")),
        assumptions: string_list_or_empty(doc.remove("assumptions")),
        followup_questions,
    };

    Ok(Normalized { tile, repairs })
}

/// Fetch a mandatory non-empty string field.
fn require_string(
    doc: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<String, NormalizeError> {
    match doc.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(NormalizeError::MissingRequiredField(field)),
    }
}

/// Coerce one list entry to a string. Non-string entries keep their compact
/// JSON rendering rather than being dropped.
fn entry_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn string_list_or_empty(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.into_iter().map(entry_to_string).collect(),
        _ => Vec::new(),
    }
}

fn string_or_empty(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

/// Repair `five_step_flow` to exactly [`FIVE_STEP_FLOW_LEN`] entries.
fn repair_five_step_flow(value: Option<Value>, repairs: &mut Vec<Repair>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => {
            let mut steps: Vec<String> = items.into_iter().map(entry_to_string).collect();
            let original = steps.len();

            if original > FIVE_STEP_FLOW_LEN {
                steps.truncate(FIVE_STEP_FLOW_LEN);
                repairs.push(Repair::FiveStepFlowTruncated { from: original });
            } else if original < FIVE_STEP_FLOW_LEN {
                while steps.len() < FIVE_STEP_FLOW_LEN {
                    steps.push(format!("Step {}", steps.len() + 1));
                }
                repairs.push(Repair::FiveStepFlowPadded { from: original });
            }

            steps
        }
        _ => {
            repairs.push(Repair::FiveStepFlowReplaced);
            (1..=FIVE_STEP_FLOW_LEN).map(|n| format!("Step {n}")).collect()
        }
    }
}

/// Repair `metrics` into the [`METRICS_MIN`], [`METRICS_MAX`] range.
fn repair_metrics(value: Option<Value>, repairs: &mut Vec<Repair>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => {
            let mut metrics: Vec<String> = items.into_iter().map(entry_to_string).collect();
            let original = metrics.len();

            if original > METRICS_MAX {
                metrics.truncate(METRICS_MAX);
                repairs.push(Repair::MetricsTruncated { from: original });
            } else if original < METRICS_MIN {
                for placeholder in METRIC_PLACEHOLDERS {
                    if metrics.len() >= METRICS_MIN {
                        break;
                    }
                    metrics.push(placeholder.to_string());
                }
                repairs.push(Repair::MetricsPadded { from: original });
            }

            metrics
        }
        _ => {
            repairs.push(Repair::MetricsReplaced);
            METRIC_PLACEHOLDERS.iter().map(|s| s.to_string()).collect()
        }
    }
}

/// Truncate `followup_questions` to at most [`FOLLOWUP_QUESTIONS_MAX`].
/// Absence stays an empty list; no padding.
fn repair_followup_questions(value: Option<Value>, repairs: &mut Vec<Repair>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => {
            let mut questions: Vec<String> = items.into_iter().map(entry_to_string).collect();
            let original = questions.len();

            if original > FOLLOWUP_QUESTIONS_MAX {
                questions.truncate(FOLLOWUP_QUESTIONS_MAX);
                repairs.push(Repair::FollowupQuestionsTruncated { from: original });
            }

            questions
        }
        _ => Vec::new(),
    }
}
