//! Tile Forge - secure ephemeral files, structured tile generation
//!
//! This crate implements the two load-bearing subsystems behind the tile
//! workflow: a secure, ephemeral file pipeline (content digests,
//! password-derived keys, authenticated encryption, retention classes) and
//! a streaming structured-output pipeline (delta accumulation, schema
//! normalization). Session handling, record CRUD, and URL issuance are
//! external collaborators reached through the store traits.

pub mod audit;
pub mod config;
pub mod export;
pub mod maintenance;
pub mod pipeline;
pub mod retention;
pub mod store;
pub mod stream;
pub mod vault;

pub use config::ForgeConfig;
pub use pipeline::{GenerationPipeline, PipelineError, UploadPipeline};
pub use retention::RetentionClass;
pub use store::{MemoryStore, MetadataStore, ObjectStore};
pub use stream::{StreamSession, StreamState};
pub use vault::FileSecurityMetadata;
