//! Export surface
//!
//! Renders one tile as Markdown or pretty JSON, and builds the
//! whole-account data-export bundle: every tile row and every file's
//! metadata with its audit trail. Stored content is referenced by digest;
//! small objects can be inlined base64 on request. Ciphertext and key
//! material are never exported.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::AuditEntry;
use crate::store::{FileRecord, MetadataStore, ObjectStore, StorageError, TileRecord};
use forge_schema::ClarityTile;

/// Render a tile as Markdown.
pub fn tile_markdown(tile: &ClarityTile, mode: &str) -> String {
    let mut out = format!("# Clarity Tile - {mode}\n\n");

    out.push_str(&format!("## Objective\n{}\n\n", tile.objective));
    out.push_str(&format!(
        "## Constraints\n{}\n\n",
        bullet_list(&tile.constraints)
    ));
    out.push_str(&format!(
        "## Deletion Pass\n{}\n\n",
        bullet_list(&tile.deletion_pass)
    ));

    out.push_str("## 5-Step Flow\n");
    for (index, step) in tile.five_step_flow.iter().enumerate() {
        out.push_str(&format!("{}. {step}\n", index + 1));
    }
    out.push('\n');

    out.push_str(&format!(
        "## Single Next Action\n**{}**\n\n",
        tile.single_next_action
    ));
    out.push_str(&format!("## Metrics\n{}\n\n", bullet_list(&tile.metrics)));
    out.push_str(&format!("## Feedback Loop\n{}\n\n", tile.feedback_loop));
    out.push_str(&format!(
        "## Assumptions\n{}\n\n",
        bullet_list(&tile.assumptions)
    ));
    out.push_str(&format!(
        "## Follow-up Questions\n{}\n",
        bullet_list(&tile.followup_questions)
    ));

    out
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "None".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a tile as pretty JSON.
pub fn tile_json(tile: &ClarityTile) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(tile)
}

/// One file in the export bundle: the record plus its audit trail.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileExportEntry {
    #[serde(flatten)]
    pub record: FileRecord,

    pub audit: Vec<AuditEntry>,

    /// Base64 of the stored plaintext object, inlined only when requested
    /// and only for unencrypted objects under the size limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_content_b64: Option<String>,
}

/// The whole-account export bundle.
#[derive(Debug, Serialize, Deserialize)]
pub struct DataExport {
    pub export_date: DateTime<Utc>,
    pub tiles: Vec<TileRecord>,
    pub files: Vec<FileExportEntry>,
}

/// Build the export bundle.
///
/// `inline_limit` enables base64 inlining of unencrypted objects up to
/// that many bytes; `None` exports metadata only.
pub fn build_export<O: ObjectStore, M: MetadataStore>(
    objects: &O,
    metadata: &M,
    inline_limit: Option<u64>,
    now: DateTime<Utc>,
) -> Result<DataExport, StorageError> {
    let mut files = Vec::new();
    for record in metadata.files()? {
        let audit = metadata.audit_for(&record.id)?;

        let inline_content_b64 = match inline_limit {
            Some(limit) if !record.security.encrypted && record.size <= limit => {
                Some(BASE64.encode(objects.get(&record.object_key)?))
            }
            _ => None,
        };

        files.push(FileExportEntry {
            record,
            audit,
            inline_content_b64,
        });
    }

    Ok(DataExport {
        export_date: now,
        tiles: metadata.tiles()?,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{UploadPipeline, UploadRequest};
    use crate::retention::RetentionClass;
    use crate::store::MemoryStore;

    fn tile() -> ClarityTile {
        ClarityTile {
            objective: "ship it".to_string(),
            constraints: vec!["one week".to_string()],
            deletion_pass: vec![],
            five_step_flow: (1..=5).map(|n| format!("Step {n}")).collect(),
            single_next_action: "open the tracker".to_string(),
            metrics: vec!["Progress".to_string(), "Quality".to_string()],
            feedback_loop: "daily check".to_string(),
            assumptions: vec![],
            followup_questions: vec!["who reviews?".to_string()],
        }
    }

    #[test]
    fn test_markdown_sections() {
        let rendered = tile_markdown(&tile(), "Razor");

        assert!(rendered.starts_with("# Clarity Tile - Razor"));
        assert!(rendered.contains("## Objective\nship it"));
        assert!(rendered.contains("1. Step 1"));
        assert!(rendered.contains("5. Step 5"));
        assert!(rendered.contains("**open the tracker**"));
        assert!(rendered.contains("- one week"));
        // Empty lists render as None
        assert!(rendered.contains("## Deletion Pass\nNone"));
    }

    #[test]
    fn test_export_bundle_contents() {
        let store = MemoryStore::new();
        let now: DateTime<Utc> = "2026-03-01T00:00:00Z".parse().unwrap();

        let pipeline = UploadPipeline::new(&store, &store);
        pipeline
            .upload(
                UploadRequest {
                    file_name: "notes.txt".to_string(),
                    mime_type: "text/plain".to_string(),
                    bytes: b"plain notes".to_vec(),
                    retention: RetentionClass::SevenDays,
                    password: None,
                },
                now,
            )
            .unwrap();
        pipeline
            .upload(
                UploadRequest {
                    file_name: "secret.txt".to_string(),
                    mime_type: "text/plain".to_string(),
                    bytes: b"secret notes".to_vec(),
                    retention: RetentionClass::SevenDays,
                    password: Some("secret".to_string()),
                },
                now,
            )
            .unwrap();

        let export = build_export(&store, &store, Some(1024), now).unwrap();

        assert_eq!(export.files.len(), 2);
        let plain = export
            .files
            .iter()
            .find(|f| f.record.file_name == "notes.txt")
            .unwrap();
        let encrypted = export
            .files
            .iter()
            .find(|f| f.record.file_name == "secret.txt")
            .unwrap();

        // Plain content inlines; ciphertext never does
        assert_eq!(
            plain.inline_content_b64.as_deref(),
            Some(BASE64.encode(b"plain notes").as_str())
        );
        assert!(encrypted.inline_content_b64.is_none());

        // Every file carries its audit trail
        assert!(!plain.audit.is_empty());
    }

    #[test]
    fn test_export_without_inline_is_metadata_only() {
        let store = MemoryStore::new();
        let now: DateTime<Utc> = "2026-03-01T00:00:00Z".parse().unwrap();

        UploadPipeline::new(&store, &store)
            .upload(
                UploadRequest {
                    file_name: "notes.txt".to_string(),
                    mime_type: "text/plain".to_string(),
                    bytes: b"plain notes".to_vec(),
                    retention: RetentionClass::SevenDays,
                    password: None,
                },
                now,
            )
            .unwrap();

        let export = build_export(&store, &store, None, now).unwrap();
        assert!(export.files[0].inline_content_b64.is_none());
    }
}
