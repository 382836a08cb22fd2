//! Import of DocumentReference resources into notes and note versions.

use base64::{Engine, engine::general_purpose};
use serde_json::Value;

use crate::category::{CategoryNormalizer, category_id_for_code};
use crate::db::Database;
use crate::error::{DecodeFailure, ImportError};
use crate::fhir::{DOCUMENT_REFERENCE, DocumentReference};
use crate::models::{DocumentImportSummary, ImportedNote, NoteRecord};
use crate::notes::{self, url_placeholder};
use crate::reference::strip_type_prefix;

/// Decodes an inline attachment payload into text.
///
/// Whitespace is dropped first so that line-wrapped base64 decodes.
pub fn decode_inline_data(data: &str) -> Result<String, DecodeFailure> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = general_purpose::STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}

/// Maps a document onto the column values of its note and first version.
///
/// Absent fields become `None`. Inline data that cannot be decoded is kept
/// as the raw string.
pub fn extract_note(doc: &DocumentReference) -> NoteRecord {
    let kind = doc.kind.as_ref();

    NoteRecord {
        external_id: doc.id.clone(),
        category_code: doc.primary_category_code().map(String::from),
        note_type: kind.and_then(|k| k.first_display()).map(String::from),
        note_type_code: kind.and_then(|k| k.first_code()).map(String::from),
        encounter_id: doc
            .encounter_reference()
            .map(|r| strip_type_prefix(r, "Encounter").to_string()),
        note_date: doc.date.clone(),
        note_text: note_text(doc),
        practitioner_id: doc
            .author_reference()
            .map(|r| strip_type_prefix(r, "Practitioner").to_string()),
    }
}

fn note_text(doc: &DocumentReference) -> Option<String> {
    let attachment = doc.primary_attachment()?;

    if let Some(data) = attachment.data.as_deref() {
        return Some(match decode_inline_data(data) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    document = doc.id.as_deref().unwrap_or("<no id>"),
                    error = %e,
                    "could not decode inline content, storing raw data"
                );
                data.to_string()
            }
        });
    }

    attachment.url.as_deref().map(url_placeholder)
}

/// Writes DocumentReference resources, one transaction per document.
///
/// # Examples
///
/// ```
/// use clinotes::{Database, DocumentImporter};
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Database::in_memory()?;
/// let importer = DocumentImporter::new(&db);
///
/// let summary = importer.import_batch(vec![serde_json::json!({
///     "resourceType": "DocumentReference",
///     "id": "doc-1",
///     "content": [{"attachment": {"url": "https://fhir.example/Binary/1"}}]
/// })]);
/// assert_eq!(summary.notes_added, 1);
/// # Ok(())
/// # }
/// ```
pub struct DocumentImporter<'a> {
    db: &'a Database,
}

impl<'a> DocumentImporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Imports a batch of raw DocumentReference JSON values.
    ///
    /// Categories are registered first, from every document that parsed.
    /// A document that fails to parse or to store is rolled back, logged and
    /// counted; the rest of the batch continues.
    pub fn import_batch(&self, resources: Vec<Value>) -> DocumentImportSummary {
        let mut summary = DocumentImportSummary::default();

        let parsed: Vec<Result<DocumentReference, ImportError>> = resources
            .into_iter()
            .map(|resource| {
                serde_json::from_value(resource)
                    .map_err(|e| ImportError::malformed(DOCUMENT_REFERENCE, e))
            })
            .collect();

        let valid = parsed.iter().filter_map(|doc| doc.as_ref().ok());
        match CategoryNormalizer::new(self.db).import_categories(valid) {
            Ok(added) => summary.categories_added = added,
            Err(e) => tracing::error!(error = %e, "failed to register document categories"),
        }

        for (index, doc) in parsed.into_iter().enumerate() {
            let (id, result) = match doc {
                Ok(doc) => (doc.id.clone(), self.import_document(&doc)),
                Err(e) => (None, Err(e)),
            };

            match result {
                Ok(_) => {
                    summary.notes_added += 1;
                    summary.versions_added += 1;
                }
                Err(e) => {
                    tracing::error!(
                        index,
                        document = id.as_deref().unwrap_or("<no id>"),
                        error = %e,
                        "document import failed"
                    );
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            notes = summary.notes_added,
            versions = summary.versions_added,
            failed = summary.failed,
            "document import finished"
        );
        summary
    }

    /// Imports one document as a note with version 1.
    ///
    /// Runs in its own transaction. Re-importing an id that is already
    /// stored creates another note; documents are not deduplicated.
    pub fn import_document(&self, doc: &DocumentReference) -> Result<ImportedNote, ImportError> {
        let record = extract_note(doc);

        self.db.with_transaction(|conn| {
            let category_id = match record.category_code.as_deref() {
                Some(code) => category_id_for_code(conn, code)?,
                None => None,
            };

            let note_id = notes::insert_note(conn, &record, category_id)?;
            let version_id = notes::insert_version(
                conn,
                note_id,
                1,
                record.note_text.as_deref(),
                record.practitioner_id.as_deref(),
            )?;
            notes::set_current_version(conn, note_id, version_id)?;

            Ok(ImportedNote {
                note_id,
                version_id,
            })
        })
    }
}

#[cfg(test)]
mod tests;
