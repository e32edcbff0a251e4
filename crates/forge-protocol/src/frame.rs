//! Event frame types
//!
//! Inbound: line-oriented frames of the form `data: <json-payload>`,
//! terminated by a blank line, with the literal sentinel `data: [DONE]`
//! marking stream end. Lines without the data prefix (heartbeats, comments,
//! blank separators) are not frames.
//!
//! Outbound: progress and terminal frames emitted toward the caller while a
//! tile is generated.

use std::io::{self, Write};

use forge_schema::ClarityTile;
use serde::{Deserialize, Serialize};

use crate::{DATA_PREFIX, DONE_SENTINEL};

/// One classified inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame<'a> {
    /// A `data: <payload>` frame; payload is the raw JSON text
    Data(&'a str),
    /// The `data: [DONE]` sentinel
    Done,
    /// Not an event frame (blank separator, comment, heartbeat line)
    NotAFrame,
}

/// Classify one raw line from the upstream transport.
pub fn classify_line(line: &str) -> InboundFrame<'_> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return InboundFrame::NotAFrame;
    };
    if payload.trim() == DONE_SENTINEL {
        return InboundFrame::Done;
    }
    InboundFrame::Data(payload)
}

/// One streamed completion chunk from the model endpoint.
///
/// Only the delta text is consumed; every other field is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeltaChunk {
    #[serde(default)]
    pub choices: Vec<DeltaChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeltaChoice {
    #[serde(default)]
    pub delta: Delta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

impl DeltaChunk {
    /// Parse a frame payload into a chunk.
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// The text carried by the first choice, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }
}

/// Frame emitted toward the caller during generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutboundFrame {
    /// Generation is underway
    Processing {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Terminal success: the normalized tile
    Completed { result: ClarityTile },
    /// Terminal failure: single-line reason, no internals
    Error { message: String },
}

impl OutboundFrame {
    /// Standard progress frame
    pub fn processing() -> Self {
        OutboundFrame::Processing {
            message: Some("Generating clarity tile...".to_string()),
        }
    }

    /// Terminal success frame
    pub fn completed(result: ClarityTile) -> Self {
        OutboundFrame::Completed { result }
    }

    /// Terminal failure frame
    pub fn error(message: impl Into<String>) -> Self {
        OutboundFrame::Error {
            message: message.into(),
        }
    }

    /// True for `Completed` and `Error`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OutboundFrame::Processing { .. })
    }

    /// Write this frame in wire form: `data: <json>` plus a blank line.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let payload = serde_json::to_string(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(out, "{DATA_PREFIX}{payload}")?;
        writeln!(out)
    }
}
