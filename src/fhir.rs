//! Typed views of the FHIR resources the importer understands.
//!
//! Every field is optional: source systems populate these resources
//! inconsistently, and an absent field must surface as `None` rather than
//! a lookup failure. Only the fields the relational mapping reads are
//! modelled; everything else is ignored during deserialization.

mod bundle;
mod datatypes;
mod document_reference;
mod medication;

pub use bundle::{collect_resources, load_json, resource_type_of};
pub use datatypes::{
    Attachment, CodeableConcept, CodeableReference, Coding, Period, Quantity, Ratio, Reference,
};
pub use document_reference::{DocumentContent, DocumentContext, DocumentReference};
pub use medication::{
    AdministrationDosage, ContainedResource, DoseAndRate, Dosage, Ingredient, Medication,
    MedicationAdministration, MedicationRequest, Organization, Performer, PerformerActor, Timing,
    TimingRepeat,
};

/// `resourceType` of a clinical document.
pub const DOCUMENT_REFERENCE: &str = "DocumentReference";
/// `resourceType` of a medication definition.
pub const MEDICATION: &str = "Medication";
/// `resourceType` of a prescription.
pub const MEDICATION_REQUEST: &str = "MedicationRequest";
/// `resourceType` of an administration event.
pub const MEDICATION_ADMINISTRATION: &str = "MedicationAdministration";
