//! Streaming structured-output pipeline
//!
//! Consumes an unreliable token stream from the model endpoint and
//! assembles the raw candidate document handed to the schema normalizer.

mod accumulator;
mod transport;

pub use accumulator::{
    SessionEvent, StreamFailure, StreamOutcome, StreamSession, StreamState,
};
pub use transport::{
    ChatMessage, ChatRequest, DeltaTransport, HttpDeltaTransport, ScriptedTransport,
    TransportError,
};
