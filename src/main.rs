//! Tile Forge CLI
//!
//! Entry point for the `tile-forge` command-line tool.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};

use tile_forge::config::{ConfigError, ForgeConfig};
use tile_forge::export::{build_export, tile_json, tile_markdown};
use tile_forge::maintenance::{authorize, Maintenance};
use tile_forge::pipeline::{
    AttachmentRef, GenerationPipeline, GenerationRequest, UploadPipeline, UploadRequest,
};
use tile_forge::retention::RetentionClass;
use tile_forge::store::{FsObjectStore, JsonMetadataStore, MetadataStore};
use tile_forge::stream::HttpDeltaTransport;

#[derive(Parser)]
#[command(name = "tile-forge")]
#[command(about = "Secure ephemeral file vault and clarity-tile generation", version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Emit progress lines on stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file into the vault
    Upload {
        /// File to upload
        path: PathBuf,

        /// Retention class (OneHour, OneDay, SevenDays, Never, SingleUse)
        #[arg(long, default_value = "SevenDays")]
        retention: RetentionClass,

        /// Encrypt under a key derived from this password
        #[arg(long)]
        password: Option<String>,

        /// MIME type recorded with the file
        #[arg(long, default_value = "application/octet-stream")]
        mime_type: String,
    },

    /// Read a file back out of the vault
    Reveal {
        /// File id
        id: String,

        /// Password for an encrypted file
        #[arg(long)]
        password: Option<String>,

        /// Write the content here instead of stdout
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Generate a clarity tile from an objective
    Generate {
        /// The objective to clarify
        objective: String,

        /// Generation mode label
        #[arg(long)]
        mode: Option<String>,

        /// Constraints, free-form
        #[arg(long)]
        constraints: Option<String>,

        /// Context dump, free-form
        #[arg(long)]
        context: Option<String>,

        /// Attachment as file_id or file_id:password (repeatable)
        #[arg(long = "attach")]
        attachments: Vec<String>,

        /// Print the finished tile as Markdown instead of frames
        #[arg(long)]
        markdown: bool,
    },

    /// Maintenance operations for the external scheduler
    Maintenance {
        #[command(subcommand)]
        action: MaintenanceCommands,
    },

    /// Export all tiles and file metadata as one JSON bundle
    Export {
        /// Write the bundle here instead of stdout
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Inline unencrypted objects up to this many bytes as base64
        #[arg(long)]
        inline_limit: Option<u64>,
    },

    /// Delete every file and tile
    BulkDelete {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Print a stored tile
    Show {
        /// Tile id
        id: String,

        /// Render as Markdown instead of JSON
        #[arg(long)]
        markdown: bool,
    },

    /// Replace the tag list of a stored tile
    Tag {
        /// Tile id
        id: String,

        /// New tags (replaces the existing list)
        tags: Vec<String>,
    },
}

#[derive(Subcommand)]
enum MaintenanceCommands {
    /// Counts of expired / expiring / total / never-expiring files
    Stats {
        /// Bearer credential
        #[arg(long)]
        token: String,
    },
    /// Delete expired files and their records
    Sweep {
        /// Bearer credential
        #[arg(long)]
        token: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut config = match ForgeConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            process::exit(1);
        }
    };
    if cli.verbose {
        config.verbose = true;
    }

    match run(cli.command, &config) {
        Ok(()) => {}
        Err(error) => {
            eprintln!("error: {error}");
            process::exit(error.exit_code());
        }
    }
}

/// Top-level command errors
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Pipeline(#[from] tile_forge::pipeline::PipelineError),

    #[error(transparent)]
    Storage(#[from] tile_forge::store::StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unauthorized: maintenance token mismatch")]
    Unauthorized,

    #[error("no maintenance token configured")]
    NoTokenConfigured,

    #[error("refusing to bulk-delete without --yes")]
    Unconfirmed,

    #[error("tile not found: {0}")]
    TileNotFound(String),

    #[error("invalid attachment spec: {0}")]
    BadAttachment(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Pipeline(e) => e.exit_code(),
            CliError::Storage(_) => 40,
            CliError::Unauthorized | CliError::NoTokenConfigured => 77,
            CliError::Unconfirmed => 2,
            _ => 1,
        }
    }
}

fn run(command: Commands, config: &ForgeConfig) -> Result<(), CliError> {
    let objects = FsObjectStore::new(config.storage_root.join("objects"))?;
    let metadata = JsonMetadataStore::new(config.storage_root.join("records.json"))?;
    let now = Utc::now();

    match command {
        Commands::Upload {
            path,
            retention,
            password,
            mime_type,
        } => {
            let bytes = fs::read(&path)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());

            let pipeline =
                UploadPipeline::new(&objects, &metadata).with_verbose(config.verbose);
            let record = pipeline.upload(
                UploadRequest {
                    file_name,
                    mime_type,
                    bytes,
                    retention,
                    password,
                },
                now,
            )?;

            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }

        Commands::Reveal { id, password, out } => {
            let pipeline =
                UploadPipeline::new(&objects, &metadata).with_verbose(config.verbose);
            let opened = pipeline.open(&id, password.as_deref(), now)?;
            // Direct access is the one authorized use of a single-use file.
            pipeline.consume_if_single_use(&opened.record, now)?;

            match out {
                Some(path) => fs::write(path, &opened.bytes)?,
                None => io::stdout().write_all(&opened.bytes)?,
            }
            Ok(())
        }

        Commands::Generate {
            objective,
            mode,
            constraints,
            context,
            attachments,
            markdown,
        } => {
            let attachments = attachments
                .iter()
                .map(|spec| parse_attachment(spec))
                .collect::<Result<Vec<_>, _>>()?;

            let request = GenerationRequest {
                mode,
                objective,
                constraints,
                context_dump: context,
                attachments,
            };

            // Ctrl-C abandons the request: the stream handle is released
            // and no further frames are emitted.
            let cancel = Arc::new(AtomicBool::new(false));
            let handler_flag = Arc::clone(&cancel);
            let _ = ctrlc::set_handler(move || {
                handler_flag.store(true, Ordering::SeqCst);
            });

            let pipeline = GenerationPipeline::new(&objects, &metadata, config);
            let mut stdout = io::stdout();
            let outcome = pipeline.generate(
                request,
                |chat| HttpDeltaTransport::open(&config.endpoint, config.api_key.as_deref(), chat),
                &cancel,
                &mut stdout,
                now,
            )?;

            if config.verbose {
                for failure in &outcome.attachment_failures {
                    eprintln!("attachment {} failed: {}", failure.file, failure.error);
                }
                if !outcome.repairs.is_empty() {
                    eprintln!("repairs applied: {:?}", outcome.repairs);
                }
            }
            if markdown {
                println!("{}", tile_markdown(&outcome.record.tile, &outcome.record.mode));
            }
            Ok(())
        }

        Commands::Maintenance { action } => {
            let configured = config
                .maintenance_token
                .as_deref()
                .ok_or(CliError::NoTokenConfigured)?;
            let maintenance =
                Maintenance::new(&objects, &metadata).with_verbose(config.verbose);

            match action {
                MaintenanceCommands::Stats { token } => {
                    if !authorize(&token, configured) {
                        return Err(CliError::Unauthorized);
                    }
                    let stats = maintenance.stats(now)?;
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                MaintenanceCommands::Sweep { token } => {
                    if !authorize(&token, configured) {
                        return Err(CliError::Unauthorized);
                    }
                    let outcome = maintenance.sweep(now)?;
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                }
            }
            Ok(())
        }

        Commands::Export { out, inline_limit } => {
            let export = build_export(&objects, &metadata, inline_limit, now)?;
            let json = serde_json::to_string_pretty(&export)?;
            match out {
                Some(path) => fs::write(path, json)?,
                None => println!("{json}"),
            }
            Ok(())
        }

        Commands::BulkDelete { yes } => {
            if !yes {
                return Err(CliError::Unconfirmed);
            }
            let outcome = Maintenance::new(&objects, &metadata)
                .with_verbose(config.verbose)
                .bulk_delete(now)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }

        Commands::Show { id, markdown } => {
            let tile = metadata
                .tiles()?
                .into_iter()
                .find(|t| t.id == id)
                .ok_or_else(|| CliError::TileNotFound(id.clone()))?;

            if markdown {
                println!("{}", tile_markdown(&tile.tile, &tile.mode));
            } else {
                println!("{}", tile_json(&tile.tile)?);
            }
            Ok(())
        }

        Commands::Tag { id, tags } => {
            metadata.set_tags(&id, tags)?;
            Ok(())
        }
    }
}

/// Parse `file_id` or `file_id:password` into an attachment reference.
fn parse_attachment(spec: &str) -> Result<AttachmentRef, CliError> {
    if spec.is_empty() {
        return Err(CliError::BadAttachment(spec.to_string()));
    }
    match spec.split_once(':') {
        Some((id, password)) if !id.is_empty() => Ok(AttachmentRef {
            file_id: id.to_string(),
            password: Some(password.to_string()),
        }),
        Some(_) => Err(CliError::BadAttachment(spec.to_string())),
        None => Ok(AttachmentRef {
            file_id: spec.to_string(),
            password: None,
        }),
    }
}
