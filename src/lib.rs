pub mod category;
pub mod config;
pub mod content;
pub mod db;
pub mod document;
pub mod error;
pub mod fhir;
pub mod logging;
pub mod medication;
pub mod models;
pub mod notes;
pub mod reference;

pub use category::CategoryNormalizer;
pub use config::{Config, ConfigBuilder};
pub use content::{
    ContentFetcher, ContentResolver, FetchError, HttpContentFetcher, HttpContentFetcherBuilder,
    NoteContent, ResolutionState, StoredContent,
};
pub use db::Database;
pub use document::DocumentImporter;
pub use error::{DecodeFailure, ImportError};
pub use fhir::{DocumentReference, Medication, MedicationAdministration, MedicationRequest};
pub use medication::{ImportOutcome, MedicationImporter};
pub use models::{
    BatchSummary, Category, CategoryId, DocumentImportSummary, ImportedNote,
    MedicationImportSummary, MedicationRowId, Note, NoteId, NoteVersion, ResolutionSummary,
    VersionId,
};
