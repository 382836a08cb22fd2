use time::OffsetDateTime;

use super::{CategoryId, NoteId, VersionId};

/// Column values extracted from one DocumentReference, ready for insert.
///
/// The category is carried as its code; it is resolved to a `CategoryId`
/// inside the insert transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteRecord {
    pub external_id: Option<String>,
    pub category_code: Option<String>,
    pub note_type: Option<String>,
    pub note_type_code: Option<String>,
    pub encounter_id: Option<String>,
    pub note_date: Option<String>,
    pub note_text: Option<String>,
    pub practitioner_id: Option<String>,
}

/// A stored `note` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub external_id: Option<String>,
    pub category_id: Option<CategoryId>,
    pub note_type: Option<String>,
    pub note_type_code: Option<String>,
    pub encounter_id: Option<String>,
    pub note_date: Option<String>,
    pub current_version_id: Option<VersionId>,
    pub created_at: Option<OffsetDateTime>,
}

/// A stored `note_version` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteVersion {
    pub id: VersionId,
    pub note_id: NoteId,
    pub version_number: i64,
    pub note_text: Option<String>,
    pub practitioner_id: Option<String>,
    pub content_type: Option<String>,
}

/// Keys of the rows written for one imported document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportedNote {
    pub note_id: NoteId,
    pub version_id: VersionId,
}
