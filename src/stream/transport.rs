//! Delta transport
//!
//! The seam between the accumulator and the model endpoint: a blocking,
//! line-oriented source of event frames. One live implementation speaks
//! HTTP to a chat-completions endpoint; a scripted implementation drives
//! tests without a network, including injected mid-stream failures.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};

use serde::Serialize;
use thiserror::Error;

/// Transport failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Upstream answered with a non-success status before any data
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16 },

    /// Connection could not be established
    #[error("upstream connection failed: {0}")]
    Connect(String),

    /// The stream broke mid-read
    #[error("transport read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A blocking source of raw event lines.
///
/// `next_line` suspends until the next line is available and returns
/// `Ok(None)` when the upstream closes. Exactly one consumer reads a
/// transport; dropping it releases the underlying stream handle.
pub trait DeltaTransport {
    fn next_line(&mut self) -> Result<Option<String>, TransportError>;
}

/// One chat message in the generation request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Request body for the streaming completion call.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ChatRequest {
    pub fn new(model: String, messages: Vec<ChatMessage>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            model,
            messages,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            stream: true,
            max_tokens,
            temperature,
        }
    }
}

/// Live HTTP transport over a chat-completions endpoint.
pub struct HttpDeltaTransport {
    reader: BufReader<Box<dyn Read + Send + 'static>>,
}

impl HttpDeltaTransport {
    /// Open the streaming request.
    ///
    /// A non-success status maps to [`TransportError::UpstreamStatus`]
    /// before any line is delivered.
    pub fn open(
        endpoint: &str,
        api_key: Option<&str>,
        request: &ChatRequest,
    ) -> Result<Self, TransportError> {
        let mut call = ureq::post(endpoint).set("Content-Type", "application/json");
        if let Some(key) = api_key {
            call = call.set("Authorization", &format!("Bearer {key}"));
        }

        let response = match call.send_json(request) {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(TransportError::UpstreamStatus { status })
            }
            Err(other) => return Err(TransportError::Connect(other.to_string())),
        };

        Ok(Self {
            reader: BufReader::new(Box::new(response.into_reader())),
        })
    }
}

impl DeltaTransport for HttpDeltaTransport {
    fn next_line(&mut self) -> Result<Option<String>, TransportError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

/// One scripted transport event.
#[derive(Debug)]
enum ScriptedEvent {
    Line(String),
    Fail(String),
}

/// In-memory transport for tests: replays a fixed script of lines and can
/// inject a mid-stream failure.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    events: VecDeque<ScriptedEvent>,
}

impl ScriptedTransport {
    /// Replay these lines, then close.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: lines
                .into_iter()
                .map(|l| ScriptedEvent::Line(l.into()))
                .collect(),
        }
    }

    /// Fail with an I/O error after the scripted lines are exhausted.
    pub fn failing_after<I, S>(lines: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut transport = Self::from_lines(lines);
        transport.events.push_back(ScriptedEvent::Fail(message.into()));
        transport
    }
}

impl DeltaTransport for ScriptedTransport {
    fn next_line(&mut self) -> Result<Option<String>, TransportError> {
        match self.events.pop_front() {
            None => Ok(None),
            Some(ScriptedEvent::Line(line)) => Ok(Some(line)),
            Some(ScriptedEvent::Fail(message)) => Err(TransportError::Io(
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, message),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_transport_replays_then_closes() {
        let mut transport = ScriptedTransport::from_lines(["a", "b"]);

        assert_eq!(transport.next_line().unwrap().as_deref(), Some("a"));
        assert_eq!(transport.next_line().unwrap().as_deref(), Some("b"));
        assert_eq!(transport.next_line().unwrap(), None);
    }

    #[test]
    fn test_scripted_transport_failure_injection() {
        let mut transport = ScriptedTransport::failing_after(["a"], "reset");

        assert_eq!(transport.next_line().unwrap().as_deref(), Some("a"));
        assert!(matches!(
            transport.next_line(),
            Err(TransportError::Io(_))
        ));
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest::new(
            "tile-model".to_string(),
            vec![ChatMessage::system("s"), ChatMessage::user("u")],
            3000,
            0.7,
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], serde_json::json!(true));
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
    }
}
