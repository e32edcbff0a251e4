//! Clarity Tile Schema
//!
//! Defines the strictly-shaped tile record and the normalizer that coerces
//! a raw model-produced document into it.

pub mod normalizer;
pub mod record;

pub use normalizer::{normalize, NormalizeError, Normalized, Repair};
pub use record::ClarityTile;

/// Required length of the five-step flow.
pub const FIVE_STEP_FLOW_LEN: usize = 5;

/// Minimum number of metrics entries.
pub const METRICS_MIN: usize = 2;

/// Maximum number of metrics entries.
pub const METRICS_MAX: usize = 5;

/// Maximum number of follow-up questions.
pub const FOLLOWUP_QUESTIONS_MAX: usize = 2;
