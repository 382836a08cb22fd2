/// Reading stored note content back for display or export.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose};
use rusqlite::Connection;

use crate::models::{Note, NoteId, NoteVersion};
use crate::notes::{self, URL_PLACEHOLDER_PREFIX};

/// Characters shown in a text preview.
pub const PREVIEW_CHARS: usize = 500;

const TEXTUAL_CONTENT_TYPES: [&str; 3] = ["text/plain", "text/html", "text/xml"];

/// Interpretation of a version's stored `note_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredContent {
    /// Still a `URL:` placeholder.
    Pending { url: String },
    /// Resolved content, decoded from base64.
    Binary { content_type: String, bytes: Vec<u8> },
    /// Plain text imported inline.
    Text(String),
    Empty,
}

impl StoredContent {
    /// Classifies a version's text using its content type.
    ///
    /// Text with a content type is expected to be base64; when it does not
    /// decode it is treated as plain text.
    pub fn classify(note_text: Option<&str>, content_type: Option<&str>) -> Self {
        let Some(text) = note_text else {
            return Self::Empty;
        };

        if let Some(url) = text.strip_prefix(URL_PLACEHOLDER_PREFIX) {
            return Self::Pending {
                url: url.trim().to_string(),
            };
        }

        match content_type {
            Some(content_type) => match general_purpose::STANDARD.decode(text) {
                Ok(bytes) => Self::Binary {
                    content_type: content_type.to_string(),
                    bytes,
                },
                Err(e) => {
                    tracing::warn!(content_type, error = %e, "stored content is not base64");
                    Self::Text(text.to_string())
                }
            },
            None => Self::Text(text.to_string()),
        }
    }
}

/// A note together with its current version and classified content.
#[derive(Debug, Clone)]
pub struct NoteContent {
    pub note: Note,
    pub version: NoteVersion,
    pub content: StoredContent,
}

/// Loads a note's current version.
///
/// Falls back to the latest version when `current_version_id` was never set.
/// Returns `None` if the note does not exist or has no version.
pub fn load_note_content(conn: &Connection, note_id: NoteId) -> Result<Option<NoteContent>> {
    let Some(note) = notes::get_note(conn, note_id).context("Failed to load note")? else {
        return Ok(None);
    };

    let version = match note.current_version_id {
        Some(version_id) => notes::get_version(conn, version_id)?,
        None => notes::list_versions(conn, note_id)?.pop(),
    };
    let Some(version) = version else {
        return Ok(None);
    };

    let content = StoredContent::classify(version.note_text.as_deref(), version.content_type.as_deref());
    Ok(Some(NoteContent {
        note,
        version,
        content,
    }))
}

/// Whether content of this type is shown as text.
pub fn is_textual(content_type: &str) -> bool {
    TEXTUAL_CONTENT_TYPES.contains(&content_type)
}

/// File extension used when exporting content of this type.
pub fn file_extension(content_type: &str) -> &str {
    match content_type {
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        "text/html" => "html",
        "text/xml" => "xml",
        other => match other.strip_prefix("image/") {
            Some(subtype) if !subtype.is_empty() => subtype,
            _ => "bin",
        },
    }
}

/// Text preview of up to [`PREVIEW_CHARS`] characters, with `...` when cut.
///
/// Returns `None` for content that cannot be shown as text.
pub fn preview(content: &StoredContent) -> Option<String> {
    let text = match content {
        StoredContent::Text(text) => text.as_str(),
        StoredContent::Binary {
            content_type,
            bytes,
        } if is_textual(content_type) => std::str::from_utf8(bytes).ok()?,
        _ => return None,
    };

    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => Some(format!("{}...", &text[..cut])),
        None => Some(text.to_string()),
    }
}

/// Writes resolved content to `<dir>/note_<id>.<ext>`.
///
/// Creates `dir` if needed. Returns `None` when there is no binary payload
/// to save.
pub fn save_content(content: &NoteContent, dir: &Path) -> Result<Option<PathBuf>> {
    let StoredContent::Binary {
        content_type,
        bytes,
    } = &content.content
    else {
        return Ok(None);
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let path = dir.join(format!(
        "note_{}.{}",
        content.note.id,
        file_extension(content_type)
    ));
    fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(Some(path))
}
