/// Column values for a `medication` row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicationRow {
    pub external_id: String,
    pub medication: Option<String>,
    pub form: Option<String>,
    pub ingredient: Option<String>,
    pub strength: Option<String>,
    pub manufacturer: Option<String>,
}

/// Dosage columns shared by requests and administrations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DosageColumns {
    pub text: Option<String>,
    pub route: Option<String>,
    pub method: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

/// Timing columns of a request's dosage instruction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingColumns {
    pub frequency: Option<u32>,
    pub period: Option<f64>,
    pub period_unit: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Column values for a `medication_request` row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicationRequestRow {
    pub external_id: String,
    pub medication_id: Option<String>,
    pub medication: Option<String>,
    pub status: Option<String>,
    pub practitioner_id: Option<String>,
    pub encounter_id: Option<String>,
    pub authored_on: Option<String>,
    pub dosage: DosageColumns,
    pub timing: TimingColumns,
}

/// Column values for a `medication_administration` row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicationAdministrationRow {
    pub external_id: String,
    pub medication_id: Option<String>,
    pub medication_display: Option<String>,
    pub status: Option<String>,
    pub practitioner_id: Option<String>,
    pub request_id: Option<String>,
    pub encounter_id: Option<String>,
    pub effective_start: Option<String>,
    pub effective_end: Option<String>,
    pub dosage: DosageColumns,
}
