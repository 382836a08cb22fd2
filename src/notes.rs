//! Parameterized statements against the `note` and `note_version` tables.
//!
//! Functions take a `&Connection` so they run inside whatever transaction
//! the caller opened with [`Database::with_transaction`](crate::Database::with_transaction).

use rusqlite::{Connection, OptionalExtension, Row, params};
use time::OffsetDateTime;

use crate::models::{CategoryId, Note, NoteId, NoteRecord, NoteVersion, VersionId};

/// Prefix of a note text that still points at remote content.
pub const URL_PLACEHOLDER_PREFIX: &str = "URL: ";

/// Builds the placeholder stored for attachments that only carry a URL.
pub fn url_placeholder(url: &str) -> String {
    format!("{URL_PLACEHOLDER_PREFIX}{url}")
}

/// A note version whose content has not been fetched yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingContent {
    pub note_id: NoteId,
    pub version_id: VersionId,
    pub url: String,
}

/// Inserts the `note` row and returns its surrogate key.
pub fn insert_note(
    conn: &Connection,
    record: &NoteRecord,
    category_id: Option<CategoryId>,
) -> rusqlite::Result<NoteId> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    conn.execute(
        "INSERT INTO note
            (note_id_external, category_id, note_type, note_type_code, encounter_id, note_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.external_id,
            category_id.map(CategoryId::get),
            record.note_type,
            record.note_type_code,
            record.encounter_id,
            record.note_date,
            now,
        ],
    )?;
    Ok(NoteId::new(conn.last_insert_rowid()))
}

/// Inserts a `note_version` row and returns its surrogate key.
pub fn insert_version(
    conn: &Connection,
    note_id: NoteId,
    version_number: i64,
    note_text: Option<&str>,
    practitioner_id: Option<&str>,
) -> rusqlite::Result<VersionId> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    conn.execute(
        "INSERT INTO note_version (note_id, version_number, note_text, practitioner_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![note_id.get(), version_number, note_text, practitioner_id, now],
    )?;
    Ok(VersionId::new(conn.last_insert_rowid()))
}

/// Points the note at its current version.
pub fn set_current_version(
    conn: &Connection,
    note_id: NoteId,
    version_id: VersionId,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE note SET current_version_id = ?1 WHERE note_id = ?2",
        params![version_id.get(), note_id.get()],
    )?;
    Ok(())
}

/// Replaces a version's text with resolved content.
///
/// Updates in place; content resolution never creates a new version.
pub fn update_version_content(
    conn: &Connection,
    version_id: VersionId,
    note_text: &str,
    content_type: &str,
) -> rusqlite::Result<bool> {
    let updated = conn.execute(
        "UPDATE note_version SET note_text = ?1, content_type = ?2 WHERE version_id = ?3",
        params![note_text, content_type, version_id.get()],
    )?;
    Ok(updated == 1)
}

/// Lists every version whose text is still a [`URL_PLACEHOLDER_PREFIX`] placeholder.
pub fn pending_content(conn: &Connection) -> rusqlite::Result<Vec<PendingContent>> {
    let mut stmt = conn.prepare(
        "SELECT note_id, version_id, note_text
         FROM note_version
         WHERE substr(note_text, 1, length(?1)) = ?1
         ORDER BY version_id",
    )?;

    let rows = stmt.query_map(params![URL_PLACEHOLDER_PREFIX], |row| {
        let text: String = row.get(2)?;
        let url = text.strip_prefix(URL_PLACEHOLDER_PREFIX).unwrap_or(&text);
        Ok(PendingContent {
            note_id: NoteId::new(row.get(0)?),
            version_id: VersionId::new(row.get(1)?),
            url: url.trim().to_string(),
        })
    })?;

    rows.collect()
}

/// Retrieves a note by its surrogate key.
///
/// Returns `None` if no note exists with the given ID.
pub fn get_note(conn: &Connection, id: NoteId) -> rusqlite::Result<Option<Note>> {
    conn.query_row(
        &format!("{NOTE_COLUMNS} WHERE note_id = ?1"),
        [id.get()],
        note_from_row,
    )
    .optional()
}

/// Retrieves every note imported from the given source identifier.
///
/// Documents are not deduplicated, so one external id can map to many notes.
pub fn find_notes_by_external_id(conn: &Connection, external_id: &str) -> rusqlite::Result<Vec<Note>> {
    let mut stmt = conn.prepare(&format!(
        "{NOTE_COLUMNS} WHERE note_id_external = ?1 ORDER BY note_id"
    ))?;
    let rows = stmt.query_map([external_id], note_from_row)?;
    rows.collect()
}

/// Retrieves a version by its surrogate key.
pub fn get_version(conn: &Connection, id: VersionId) -> rusqlite::Result<Option<NoteVersion>> {
    conn.query_row(
        &format!("{VERSION_COLUMNS} WHERE version_id = ?1"),
        [id.get()],
        version_from_row,
    )
    .optional()
}

/// Lists the versions of a note in version order.
pub fn list_versions(conn: &Connection, note_id: NoteId) -> rusqlite::Result<Vec<NoteVersion>> {
    let mut stmt = conn.prepare(&format!(
        "{VERSION_COLUMNS} WHERE note_id = ?1 ORDER BY version_number"
    ))?;
    let rows = stmt.query_map([note_id.get()], version_from_row)?;
    rows.collect()
}

/// Counts all stored notes.
pub fn count_notes(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM note", [], |row| row.get(0))
}

const NOTE_COLUMNS: &str = "SELECT note_id, note_id_external, category_id, note_type, note_type_code,
        encounter_id, note_date, current_version_id, created_at
     FROM note";

const VERSION_COLUMNS: &str = "SELECT version_id, note_id, version_number, note_text, practitioner_id,
        content_type
     FROM note_version";

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let created_at: Option<i64> = row.get(8)?;
    Ok(Note {
        id: NoteId::new(row.get(0)?),
        external_id: row.get(1)?,
        category_id: row.get::<_, Option<i64>>(2)?.map(CategoryId::new),
        note_type: row.get(3)?,
        note_type_code: row.get(4)?,
        encounter_id: row.get(5)?,
        note_date: row.get(6)?,
        current_version_id: row.get::<_, Option<i64>>(7)?.map(VersionId::new),
        created_at: created_at.and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok()),
    })
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<NoteVersion> {
    Ok(NoteVersion {
        id: VersionId::new(row.get(0)?),
        note_id: NoteId::new(row.get(1)?),
        version_number: row.get(2)?,
        note_text: row.get(3)?,
        practitioner_id: row.get(4)?,
        content_type: row.get(5)?,
    })
}
