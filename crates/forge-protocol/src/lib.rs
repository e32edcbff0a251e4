//! Tile Forge Wire Contract
//!
//! Defines the line-oriented event framing consumed from the model endpoint
//! and produced toward the caller, plus the error-code registry.

pub mod error;
pub mod frame;

pub use error::ErrorCode;
pub use frame::{DeltaChunk, InboundFrame, OutboundFrame};

/// Prefix of every event line carrying a payload.
pub const DATA_PREFIX: &str = "data: ";

/// Literal sentinel payload marking the logical end of a stream.
pub const DONE_SENTINEL: &str = "[DONE]";
