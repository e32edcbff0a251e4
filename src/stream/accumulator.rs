//! Stream accumulation state machine
//!
//! A [`StreamSession`] consumes the ordered sequence of text deltas from one
//! generation stream and assembles the raw candidate document. The state is
//! an explicit tagged variant so every transition can be unit-tested without
//! a live stream:
//!
//! `Idle → Streaming → Terminated(Success | Error(reason))`
//!
//! One session exists per generation request and is discarded when the
//! stream terminates, successfully or not. Deltas are applied strictly in
//! arrival order; an individually malformed frame is skipped without
//! aborting the stream, since the upstream transport interleaves
//! heartbeat/control frames with content frames.

use forge_protocol::frame::{classify_line, DeltaChunk, InboundFrame};

/// Session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    /// No data frame has arrived yet
    Idle,
    /// At least one data frame has arrived
    Streaming,
    /// The stream has ended; no further transitions
    Terminated(StreamOutcome),
}

impl StreamState {
    /// True once the session has terminated
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Terminated(_))
    }
}

/// How a terminated stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The end-of-stream sentinel arrived
    Success,
    /// The stream failed before the sentinel
    Error(StreamFailure),
}

/// Terminal stream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFailure {
    /// Upstream closed without delivering the sentinel
    IncompleteStream,
    /// Upstream returned a non-success status before any data
    UpstreamUnavailable,
}

/// What one inbound line did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Delta applied; payload text (possibly empty) appended
    Appended,
    /// Malformed frame tolerated and skipped
    Skipped,
    /// Not an event frame (separator, heartbeat); nothing changed
    Ignored,
    /// Sentinel received; session is now `Terminated(Success)`
    Finished,
    /// Line arrived after termination; dropped
    AlreadyTerminal,
}

/// One in-progress accumulation. Never persisted.
#[derive(Debug)]
pub struct StreamSession {
    buffer: String,
    state: StreamState,
    deltas_applied: u64,
    frames_skipped: u64,
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            state: StreamState::Idle,
            deltas_applied: 0,
            frames_skipped: 0,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// The accumulated candidate document so far
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Number of deltas applied in order
    pub fn deltas_applied(&self) -> u64 {
        self.deltas_applied
    }

    /// Number of malformed frames tolerated
    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Feed one raw line from the transport, in arrival order.
    pub fn apply_line(&mut self, line: &str) -> SessionEvent {
        if self.state.is_terminal() {
            return SessionEvent::AlreadyTerminal;
        }

        match classify_line(line) {
            InboundFrame::NotAFrame => SessionEvent::Ignored,
            InboundFrame::Done => {
                self.state = StreamState::Terminated(StreamOutcome::Success);
                SessionEvent::Finished
            }
            InboundFrame::Data(payload) => {
                // The upstream has begun streaming even if this frame turns
                // out to be malformed.
                self.state = StreamState::Streaming;

                match DeltaChunk::parse(payload) {
                    Ok(chunk) => {
                        if let Some(content) = chunk.content() {
                            self.buffer.push_str(content);
                        }
                        self.deltas_applied += 1;
                        SessionEvent::Appended
                    }
                    Err(_) => {
                        self.frames_skipped += 1;
                        SessionEvent::Skipped
                    }
                }
            }
        }
    }

    /// Upstream returned a non-success status before any data arrived.
    ///
    /// Only meaningful from `Idle`; the session terminates without ever
    /// entering `Streaming`.
    pub fn mark_upstream_unavailable(&mut self) {
        if self.state == StreamState::Idle {
            self.state =
                StreamState::Terminated(StreamOutcome::Error(StreamFailure::UpstreamUnavailable));
        }
    }

    /// Upstream closed without ever delivering the sentinel.
    pub fn mark_closed(&mut self) {
        if !self.state.is_terminal() {
            self.state =
                StreamState::Terminated(StreamOutcome::Error(StreamFailure::IncompleteStream));
        }
    }

    /// Consume the session, yielding the complete document iff the stream
    /// terminated successfully.
    pub fn into_document(self) -> Option<String> {
        match self.state {
            StreamState::Terminated(StreamOutcome::Success) => Some(self.buffer),
            _ => None,
        }
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}
