mod category;
mod ids;
mod medication;
mod note;
mod summary;

pub use category::{Category, CategoryCoding};
pub use ids::{CategoryId, MedicationRowId, NoteId, VersionId};
pub use medication::{
    DosageColumns, MedicationAdministrationRow, MedicationRequestRow, MedicationRow, TimingColumns,
};
pub use note::{ImportedNote, Note, NoteRecord, NoteVersion};
pub use summary::{BatchSummary, DocumentImportSummary, MedicationImportSummary, ResolutionSummary};
