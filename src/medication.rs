//! Import of Medication, MedicationRequest and MedicationAdministration.
//!
//! Each resource is one unit of work: its existence check and insert share a
//! transaction, and a failure never stops the rest of the batch.

use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::db::{Database, is_unique_violation};
use crate::error::ImportError;
use crate::fhir::{
    AdministrationDosage, CodeableConcept, CodeableReference, ContainedResource, Dosage,
    MEDICATION, MEDICATION_ADMINISTRATION, MEDICATION_REQUEST, Medication,
    MedicationAdministration, MedicationRequest, Period, Quantity, Ratio, Reference,
    resource_type_of,
};
use crate::models::{
    BatchSummary, DosageColumns, MedicationAdministrationRow, MedicationImportSummary,
    MedicationRequestRow, MedicationRow, MedicationRowId, TimingColumns,
};
use crate::reference::{contained_id, trailing_id};

/// Resource types handled by [`MedicationImporter::import_resources`].
pub const MEDICATION_RESOURCE_TYPES: [&str; 3] =
    [MEDICATION, MEDICATION_REQUEST, MEDICATION_ADMINISTRATION];

/// What happened to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(MedicationRowId),
    /// A row with the same external id already exists.
    Skipped,
}

fn first_display(concept: Option<&CodeableConcept>) -> Option<String> {
    concept.and_then(CodeableConcept::first_display).map(String::from)
}

fn trailing(reference: Option<&Reference>) -> Option<String> {
    reference
        .and_then(|r| r.reference.as_deref())
        .map(|r| trailing_id(r).to_string())
}

fn required_id(id: Option<&String>, resource_type: &'static str) -> Result<String, ImportError> {
    id.cloned().ok_or(ImportError::MissingField {
        resource_type,
        field: "id",
    })
}

/// `"<value> <code>"` of a ratio's numerator, when both are present.
///
/// A zero value or an empty code yields no strength.
fn strength_of(ratio: &Ratio) -> Option<String> {
    let numerator = ratio.numerator.as_ref()?;
    let value = numerator.value.as_ref().filter(|v| v.as_f64() != Some(0.0))?;
    let code = numerator.code.as_deref().filter(|c| !c.is_empty())?;
    Some(format!("{value} {code}"))
}

/// Name of the manufacturer, from a contained Organization when the
/// reference is local, else the reference display.
fn manufacturer_of(medication: &Medication) -> Option<String> {
    let holder = medication
        .marketing_authorization_holder
        .as_ref()
        .or(medication.manufacturer.as_ref())?;

    match holder.reference.as_deref().and_then(contained_id) {
        Some(local_id) => medication.contained.iter().find_map(|c| match c {
            ContainedResource::Organization(org) if org.id.as_deref() == Some(local_id) => {
                org.name.clone()
            }
            _ => None,
        }),
        None => holder.display.clone(),
    }
}

/// Maps a Medication onto its `medication` row.
pub fn extract_medication(medication: &Medication) -> Result<MedicationRow, ImportError> {
    let external_id = required_id(medication.id.as_ref(), MEDICATION)?;
    let ingredient = medication.ingredient.first();

    Ok(MedicationRow {
        external_id,
        medication: first_display(medication.code.as_ref()),
        form: first_display(medication.dose_form.as_ref().or(medication.form.as_ref())),
        ingredient: ingredient.and_then(|i| {
            let concept = i
                .item
                .as_ref()
                .and_then(|item| item.concept.as_ref())
                .or(i.item_codeable_concept.as_ref());
            first_display(concept)
        }),
        strength: ingredient
            .and_then(|i| i.strength_ratio.as_ref().or(i.strength.as_ref()))
            .and_then(strength_of),
        manufacturer: manufacturer_of(medication),
    })
}

/// Medication id and display referenced by a request or administration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicationLink {
    pub id: Option<String>,
    pub display: Option<String>,
}

impl MedicationLink {
    /// Resolves the medication a resource points at.
    ///
    /// A contained Medication wins; when several are contained the last one
    /// is used. Otherwise the R5 `medication`, then the R4
    /// `medicationReference`/`medicationCodeableConcept`, are consulted.
    pub fn resolve(
        contained: &[ContainedResource],
        medication: Option<&CodeableReference>,
        medication_reference: Option<&Reference>,
        medication_concept: Option<&CodeableConcept>,
    ) -> Self {
        let from_contained = contained.iter().rev().find_map(|c| match c {
            ContainedResource::Medication(m) => Some(Self {
                id: m.id.clone(),
                display: first_display(m.code.as_ref()),
            }),
            _ => None,
        });
        if let Some(link) = from_contained {
            return link;
        }

        if let Some(medication) = medication {
            if let Some(reference) = medication.reference.as_ref() {
                return Self::from_reference(reference);
            }
            if let Some(concept) = medication.concept.as_ref() {
                return Self::from_concept(concept);
            }
        }

        match (medication_reference, medication_concept) {
            (Some(reference), _) => Self::from_reference(reference),
            (None, Some(concept)) => Self::from_concept(concept),
            (None, None) => Self::default(),
        }
    }

    fn from_reference(reference: &Reference) -> Self {
        let id = reference
            .reference
            .as_deref()
            .map(|r| contained_id(r).unwrap_or_else(|| trailing_id(r)).to_string());
        Self {
            id,
            display: reference.display.clone(),
        }
    }

    fn from_concept(concept: &CodeableConcept) -> Self {
        Self {
            id: None,
            display: concept
                .first_display()
                .map(String::from)
                .or_else(|| concept.text.clone()),
        }
    }
}

fn quantity_columns(quantity: Option<&Quantity>) -> (Option<f64>, Option<String>) {
    match quantity {
        Some(q) => (q.value_f64(), q.unit_code().map(String::from)),
        None => (None, None),
    }
}

fn request_dosage(dosage: Option<&Dosage>) -> (DosageColumns, TimingColumns) {
    let Some(dosage) = dosage else {
        return Default::default();
    };

    let dose = dosage
        .dose_and_rate
        .first()
        .and_then(|d| d.dose_quantity.as_ref());
    let (quantity, unit) = quantity_columns(dose);

    let repeat = dosage.timing.as_ref().and_then(|t| t.repeat.as_ref());
    let bounds = repeat.and_then(|r| r.bounds_period.as_ref());

    (
        DosageColumns {
            text: dosage.text.clone(),
            route: first_display(dosage.route.as_ref()),
            method: first_display(dosage.method.as_ref()),
            quantity,
            unit,
        },
        TimingColumns {
            frequency: repeat.and_then(|r| r.frequency),
            period: repeat
                .and_then(|r| r.period.as_ref())
                .and_then(serde_json::Number::as_f64),
            period_unit: repeat.and_then(|r| r.period_unit.clone()),
            start: bounds.and_then(|b| b.start.clone()),
            end: bounds.and_then(|b| b.end.clone()),
        },
    )
}

/// Maps a MedicationRequest onto its `medication_request` row.
pub fn extract_request(request: &MedicationRequest) -> Result<MedicationRequestRow, ImportError> {
    let external_id = required_id(request.id.as_ref(), MEDICATION_REQUEST)?;
    let link = MedicationLink::resolve(
        &request.contained,
        request.medication.as_ref(),
        request.medication_reference.as_ref(),
        request.medication_codeable_concept.as_ref(),
    );
    let (dosage, timing) = request_dosage(request.dosage_instruction.first());

    Ok(MedicationRequestRow {
        external_id,
        medication_id: link.id,
        medication: link.display,
        status: request.status.clone(),
        practitioner_id: trailing(request.requester.as_ref()),
        encounter_id: trailing(request.encounter.as_ref()),
        authored_on: request.authored_on.clone(),
        dosage,
        timing,
    })
}

fn administration_dosage(dosage: Option<&AdministrationDosage>) -> DosageColumns {
    let Some(dosage) = dosage else {
        return DosageColumns::default();
    };
    let (quantity, unit) = quantity_columns(dosage.dose.as_ref());

    DosageColumns {
        text: dosage.text.clone(),
        route: first_display(dosage.route.as_ref()),
        method: first_display(dosage.method.as_ref()),
        quantity,
        unit,
    }
}

/// Start and end of an administration.
///
/// A single date-time sets the start only.
fn effective_window(admin: &MedicationAdministration) -> (Option<String>, Option<String>) {
    let period: Option<&Period> = admin
        .occurence_period
        .as_ref()
        .or(admin.effective_period.as_ref());

    match period {
        Some(p) => (p.start.clone(), p.end.clone()),
        None => (
            admin
                .occurence_date_time
                .clone()
                .or_else(|| admin.effective_date_time.clone()),
            None,
        ),
    }
}

/// Maps a MedicationAdministration onto its `medication_administration` row.
pub fn extract_administration(
    admin: &MedicationAdministration,
) -> Result<MedicationAdministrationRow, ImportError> {
    let external_id = required_id(admin.id.as_ref(), MEDICATION_ADMINISTRATION)?;
    let link = MedicationLink::resolve(
        &admin.contained,
        admin.medication.as_ref(),
        admin.medication_reference.as_ref(),
        admin.medication_codeable_concept.as_ref(),
    );
    let (effective_start, effective_end) = effective_window(admin);

    Ok(MedicationAdministrationRow {
        external_id,
        medication_id: link.id,
        medication_display: link.display,
        status: admin.status.clone(),
        practitioner_id: admin
            .performer
            .first()
            .and_then(|p| p.actor.as_ref())
            .and_then(|actor| actor.reference())
            .map(|r| trailing_id(r).to_string()),
        request_id: trailing(admin.request.as_ref()),
        encounter_id: trailing(admin.encounter.as_ref().or(admin.context.as_ref())),
        effective_start,
        effective_end,
        dosage: administration_dosage(admin.dosage.as_ref()),
    })
}

/// Table metadata for the existence check.
struct Target {
    entity: &'static str,
    lookup: &'static str,
}

const MEDICATION_TARGET: Target = Target {
    entity: "medication",
    lookup: "SELECT medication_id FROM medication WHERE medication_id_external = ?1",
};

const REQUEST_TARGET: Target = Target {
    entity: "medication request",
    lookup: "SELECT medication_request_id FROM medication_request
             WHERE medication_request_id_external = ?1",
};

const ADMINISTRATION_TARGET: Target = Target {
    entity: "medication administration",
    lookup: "SELECT medication_administration_id FROM medication_administration
             WHERE medication_administration_id_external = ?1",
};

fn insert_medication(conn: &Connection, row: &MedicationRow) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO medication
            (medication_id_external, medication, form, ingredient, strength, manufacturer)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            row.external_id,
            row.medication,
            row.form,
            row.ingredient,
            row.strength,
            row.manufacturer,
        ],
    )
}

fn insert_request(conn: &Connection, row: &MedicationRequestRow) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO medication_request (
            medication_request_id_external, medication_id, medication, status,
            practitioner_id, encounter_id, authored_on, dosage_text, dosage_route,
            dosage_method, dosage_quantity, dosage_unit, timing_frequency, timing_period,
            timing_period_unit, timing_start, timing_end
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            row.external_id,
            row.medication_id,
            row.medication,
            row.status,
            row.practitioner_id,
            row.encounter_id,
            row.authored_on,
            row.dosage.text,
            row.dosage.route,
            row.dosage.method,
            row.dosage.quantity,
            row.dosage.unit,
            row.timing.frequency,
            row.timing.period,
            row.timing.period_unit,
            row.timing.start,
            row.timing.end,
        ],
    )
}

fn insert_administration(
    conn: &Connection,
    row: &MedicationAdministrationRow,
) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO medication_administration (
            medication_administration_id_external, medication_id, medication_display, status,
            practitioner_id, request_id, encounter_id, effective_start, effective_end,
            dosage_text, dosage_route, dosage_method, dosage_quantity, dosage_unit
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            row.external_id,
            row.medication_id,
            row.medication_display,
            row.status,
            row.practitioner_id,
            row.request_id,
            row.encounter_id,
            row.effective_start,
            row.effective_end,
            row.dosage.text,
            row.dosage.route,
            row.dosage.method,
            row.dosage.quantity,
            row.dosage.unit,
        ],
    )
}

/// Writes medication-family resources, skipping ids that are already stored.
pub struct MedicationImporter<'a> {
    db: &'a Database,
}

impl<'a> MedicationImporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn import_medication(&self, medication: &Medication) -> Result<ImportOutcome, ImportError> {
        let row = extract_medication(medication)?;
        self.import_unit(&MEDICATION_TARGET, &row.external_id, |conn| {
            insert_medication(conn, &row)
        })
    }

    pub fn import_request(&self, request: &MedicationRequest) -> Result<ImportOutcome, ImportError> {
        let row = extract_request(request)?;
        self.import_unit(&REQUEST_TARGET, &row.external_id, |conn| {
            insert_request(conn, &row)
        })
    }

    pub fn import_administration(
        &self,
        admin: &MedicationAdministration,
    ) -> Result<ImportOutcome, ImportError> {
        let row = extract_administration(admin)?;
        self.import_unit(&ADMINISTRATION_TARGET, &row.external_id, |conn| {
            insert_administration(conn, &row)
        })
    }

    /// Check-then-insert inside one transaction.
    fn import_unit<F>(
        &self,
        target: &Target,
        external_id: &str,
        insert: F,
    ) -> Result<ImportOutcome, ImportError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<usize>,
    {
        let result: Result<ImportOutcome, ImportError> = self.db.with_transaction(|conn| {
            let existing: Option<i64> = conn
                .query_row(target.lookup, [external_id], |row| row.get(0))
                .optional()?;
            if existing.is_some() {
                return Ok(ImportOutcome::Skipped);
            }

            match insert(conn) {
                Ok(_) => Ok(ImportOutcome::Imported(MedicationRowId::new(
                    conn.last_insert_rowid(),
                ))),
                Err(e) if is_unique_violation(&e) => Err(ImportError::DuplicateEntity {
                    entity: target.entity,
                    key: external_id.to_string(),
                }),
                Err(e) => Err(e.into()),
            }
        });

        let outcome = match result {
            Err(ImportError::DuplicateEntity { .. }) => ImportOutcome::Skipped,
            other => other?,
        };
        if outcome == ImportOutcome::Skipped {
            tracing::info!(entity = target.entity, id = external_id, "already exists, skipping");
        }
        Ok(outcome)
    }

    /// Imports a mixed sequence of resources, dispatching on `resourceType`.
    ///
    /// Resources of any other type are ignored.
    pub fn import_resources(&self, resources: Vec<Value>) -> MedicationImportSummary {
        let mut summary = MedicationImportSummary::default();

        for resource in resources {
            let (counts, result) = match resource_type_of(&resource) {
                Some(MEDICATION) => (
                    &mut summary.medications,
                    parse(resource, MEDICATION).and_then(|m| self.import_medication(&m)),
                ),
                Some(MEDICATION_REQUEST) => (
                    &mut summary.requests,
                    parse(resource, MEDICATION_REQUEST).and_then(|r| self.import_request(&r)),
                ),
                Some(MEDICATION_ADMINISTRATION) => (
                    &mut summary.administrations,
                    parse(resource, MEDICATION_ADMINISTRATION)
                        .and_then(|a| self.import_administration(&a)),
                ),
                other => {
                    tracing::debug!(resource_type = other.unwrap_or("<none>"), "ignoring resource");
                    continue;
                }
            };

            tally(counts, result);
        }

        tracing::info!(
            medications = %summary.medications,
            requests = %summary.requests,
            administrations = %summary.administrations,
            "medication import finished"
        );
        summary
    }
}

fn parse<T: DeserializeOwned>(resource: Value, resource_type: &'static str) -> Result<T, ImportError> {
    serde_json::from_value(resource).map_err(|e| ImportError::malformed(resource_type, e))
}

fn tally(counts: &mut BatchSummary, result: Result<ImportOutcome, ImportError>) {
    match result {
        Ok(ImportOutcome::Imported(_)) => counts.imported += 1,
        Ok(ImportOutcome::Skipped) => counts.skipped += 1,
        Err(e) => {
            tracing::error!(error = %e, "medication resource import failed");
            counts.failed += 1;
        }
    }
}
