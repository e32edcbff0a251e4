//! Tile generation pipeline
//!
//! Drives one generation request end to end: assemble the prompt (including
//! decrypted attachment text), stream the model response through a
//! [`StreamSession`], normalize the accumulated document, persist the tile,
//! and consume single-use attachments once the record is finalized.
//! Progress and terminal frames are written to the caller's sink in wire
//! form as the stream advances.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use forge_protocol::OutboundFrame;
use forge_schema::{normalize, Repair};

use super::upload::{FileFailure, UploadPipeline};
use super::{PipelineError, PipelineResult};
use crate::config::ForgeConfig;
use crate::store::{MetadataStore, ObjectStore, TileRecord};
use crate::stream::{
    ChatMessage, ChatRequest, DeltaTransport, SessionEvent, StreamFailure, StreamOutcome,
    StreamSession, StreamState, TransportError,
};

/// Default generation mode label.
pub const DEFAULT_MODE: &str = "Razor";

/// System instruction sent with every generation request.
pub const SYSTEM_INSTRUCTION: &str = "\
You turn messy working notes into a structured clarity tile.

Output ONLY valid JSON matching this exact schema:
{
  \"objective\": \"string (clear, concise statement)\",
  \"constraints\": [\"string\", ...],
  \"deletion_pass\": [\"string (what to eliminate)\", ...],
  \"five_step_flow\": [\"step 1\", \"step 2\", \"step 3\", \"step 4\", \"step 5\"],
  \"single_next_action\": \"string (doable in under 30 minutes)\",
  \"metrics\": [\"metric 1\", \"metric 2\", ...],
  \"feedback_loop\": \"string (how progress is measured)\",
  \"assumptions\": [\"assumption 1\", ...],
  \"followup_questions\": [\"question 1\", \"question 2\"]
}

RULES:
- Be concise and actionable
- five_step_flow must have EXACTLY 5 items
- metrics must have 2-5 items
- followup_questions must have at most 2 items
- single_next_action must be completable in under 30 minutes
- Respond with raw JSON only: no code blocks, no markdown, no prose";

/// Reference to an uploaded attachment for prompt assembly.
#[derive(Debug, Clone)]
pub struct AttachmentRef {
    pub file_id: String,
    /// Password for an encrypted attachment, held only for this request
    pub password: Option<String>,
}

/// One generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub mode: Option<String>,
    pub objective: String,
    pub constraints: Option<String>,
    pub context_dump: Option<String>,
    pub attachments: Vec<AttachmentRef>,
}

/// A finished generation: the persisted tile plus everything observable
/// about how it got there.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub record: TileRecord,
    /// Repairs the normalizer applied; non-fatal by definition
    pub repairs: Vec<Repair>,
    /// Per-attachment failures that were isolated, not fatal
    pub attachment_failures: Vec<FileFailure>,
}

/// Generation orchestration over the stores and configuration.
pub struct GenerationPipeline<'a, O: ObjectStore, M: MetadataStore> {
    objects: &'a O,
    metadata: &'a M,
    config: &'a ForgeConfig,
}

impl<'a, O: ObjectStore, M: MetadataStore> GenerationPipeline<'a, O, M> {
    pub fn new(objects: &'a O, metadata: &'a M, config: &'a ForgeConfig) -> Self {
        Self {
            objects,
            metadata,
            config,
        }
    }

    /// Build the chat request for this generation.
    pub fn chat_request(&self, request: &GenerationRequest, attachment_texts: &[String]) -> ChatRequest {
        let mode = request.mode.as_deref().unwrap_or(DEFAULT_MODE);
        let mut user = format!(
            "Mode: {mode}\n\nObjective: {}\n\nConstraints:\n{}\n\nContext:\n{}",
            request.objective,
            request.constraints.as_deref().unwrap_or("None specified"),
            request.context_dump.as_deref().unwrap_or("None specified"),
        );
        for (index, text) in attachment_texts.iter().enumerate() {
            user.push_str(&format!("\n\nAttachment {}:\n{text}", index + 1));
        }
        user.push_str(
            "\n\nAnalyze this and produce a structured clarity tile following the JSON schema.",
        );

        ChatRequest::new(
            self.config.model.clone(),
            vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(user),
            ],
            self.config.max_tokens,
            self.config.temperature,
        )
    }

    /// Run one generation request.
    ///
    /// `open_transport` receives the assembled chat request and yields the
    /// delta stream; tests pass a scripted transport, the CLI opens the
    /// HTTP one. Frames are written to `out` as generation proceeds. On a
    /// pipeline-level failure the terminal error frame is written before
    /// the error is returned; a cancelled request writes nothing further.
    pub fn generate<T, F, W>(
        &self,
        request: GenerationRequest,
        open_transport: F,
        cancel: &AtomicBool,
        out: &mut W,
        now: DateTime<Utc>,
    ) -> PipelineResult<GenerationOutcome>
    where
        T: DeltaTransport,
        F: FnOnce(&ChatRequest) -> Result<T, TransportError>,
        W: Write,
    {
        let files = UploadPipeline::new(self.objects, self.metadata)
            .with_verbose(self.config.verbose);

        // Decrypt attachments up front; each failure is isolated and the
        // remaining attachments continue.
        let mut attachment_texts = Vec::new();
        let mut attachment_records = Vec::new();
        let mut attachment_failures = Vec::new();
        for attachment in &request.attachments {
            match files.open(&attachment.file_id, attachment.password.as_deref(), now) {
                Ok(opened) => {
                    attachment_texts.push(String::from_utf8_lossy(&opened.bytes).into_owned());
                    attachment_records.push(opened.record);
                }
                Err(error) => {
                    if self.config.verbose {
                        eprintln!("attachment {} skipped: {error}", attachment.file_id);
                    }
                    attachment_failures.push(FileFailure {
                        file: attachment.file_id.clone(),
                        error,
                    });
                }
            }
        }

        let chat = self.chat_request(&request, &attachment_texts);
        let mut session = StreamSession::new();

        let mut transport = match open_transport(&chat) {
            Ok(transport) => transport,
            Err(error) => {
                session.mark_upstream_unavailable();
                let failure = PipelineError::UpstreamUnavailable(error.to_string());
                self.emit_failure(out, &failure)?;
                return Err(failure);
            }
        };

        // Single consumer, in-order delivery; suspension happens inside
        // next_line. Cancellation is checked between reads and releases the
        // transport without any further observable transition.
        loop {
            if cancel.load(Ordering::SeqCst) {
                return Err(PipelineError::Cancelled);
            }

            match transport.next_line() {
                Ok(Some(line)) => match session.apply_line(&line) {
                    SessionEvent::Appended => {
                        OutboundFrame::processing().write_to(out)?;
                    }
                    SessionEvent::Finished => break,
                    SessionEvent::Skipped
                    | SessionEvent::Ignored
                    | SessionEvent::AlreadyTerminal => {}
                },
                Ok(None) => {
                    session.mark_closed();
                    break;
                }
                Err(TransportError::Io(_)) | Err(TransportError::Connect(_)) => {
                    session.mark_closed();
                    break;
                }
                Err(TransportError::UpstreamStatus { status }) => {
                    session.mark_upstream_unavailable();
                    if session.state().is_terminal() {
                        let failure = PipelineError::UpstreamUnavailable(format!(
                            "upstream returned status {status}"
                        ));
                        self.emit_failure(out, &failure)?;
                        return Err(failure);
                    }
                    // Status error after data began: a close without sentinel.
                    session.mark_closed();
                    break;
                }
            }
        }

        let final_state = session.state().clone();
        let document = match final_state {
            StreamState::Terminated(StreamOutcome::Success) => session
                .into_document()
                .unwrap_or_default(),
            StreamState::Terminated(StreamOutcome::Error(StreamFailure::UpstreamUnavailable)) => {
                let failure =
                    PipelineError::UpstreamUnavailable("no data received".to_string());
                self.emit_failure(out, &failure)?;
                return Err(failure);
            }
            _ => {
                let failure = PipelineError::IncompleteStream;
                self.emit_failure(out, &failure)?;
                return Err(failure);
            }
        };

        let normalized = match normalize(&document) {
            Ok(normalized) => normalized,
            Err(error) => {
                let failure = PipelineError::Normalize(error);
                self.emit_failure(out, &failure)?;
                return Err(failure);
            }
        };

        let record = TileRecord {
            id: Uuid::new_v4().to_string(),
            mode: request
                .mode
                .clone()
                .unwrap_or_else(|| DEFAULT_MODE.to_string()),
            raw_input: json!({
                "objective": request.objective,
                "constraints": request.constraints,
                "context_dump": request.context_dump,
                "attachments": request.attachments.iter()
                    .map(|a| a.file_id.clone())
                    .collect::<Vec<_>>(),
            }),
            tile: normalized.tile.clone(),
            tags: Vec::new(),
            created_at: now,
        };
        if let Err(error) = self.metadata.insert_tile(record.clone()) {
            let failure = PipelineError::Storage(error);
            self.emit_failure(out, &failure)?;
            return Err(failure);
        }

        // The record is finalized; single-use attachments are consumed now,
        // with failures isolated like any other per-file failure.
        for attachment in &attachment_records {
            if let Err(error) = files.consume_if_single_use(attachment, now) {
                attachment_failures.push(FileFailure {
                    file: attachment.id.clone(),
                    error,
                });
            }
        }

        OutboundFrame::completed(normalized.tile).write_to(out)?;

        Ok(GenerationOutcome {
            record,
            repairs: normalized.repairs,
            attachment_failures,
        })
    }

    fn emit_failure<W: Write>(&self, out: &mut W, failure: &PipelineError) -> PipelineResult<()> {
        if let Some(code) = failure.error_code() {
            OutboundFrame::error(format!("{code}: {failure}")).write_to(out)?;
        }
        Ok(())
    }
}
