use serde::Deserialize;
use serde_json::Number;

use super::datatypes::{CodeableConcept, CodeableReference, Period, Quantity, Ratio, Reference};

/// A resource embedded in another resource's `contained` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "resourceType")]
pub enum ContainedResource {
    Medication(Medication),
    Organization(Organization),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Organization {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// A medication definition (R5 with R4 field fallbacks).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: Option<String>,
    pub code: Option<CodeableConcept>,
    pub dose_form: Option<CodeableConcept>,
    /// R4 name of `doseForm`.
    pub form: Option<CodeableConcept>,
    #[serde(default)]
    pub ingredient: Vec<Ingredient>,
    pub marketing_authorization_holder: Option<Reference>,
    /// R4 name of `marketingAuthorizationHolder`.
    pub manufacturer: Option<Reference>,
    #[serde(default)]
    pub contained: Vec<ContainedResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub item: Option<CodeableReference>,
    pub item_codeable_concept: Option<CodeableConcept>,
    pub strength_ratio: Option<Ratio>,
    /// R4 name of `strengthRatio`.
    pub strength: Option<Ratio>,
}

/// A prescription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    pub id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub contained: Vec<ContainedResource>,
    pub medication: Option<CodeableReference>,
    pub medication_reference: Option<Reference>,
    pub medication_codeable_concept: Option<CodeableConcept>,
    pub requester: Option<Reference>,
    pub encounter: Option<Reference>,
    pub authored_on: Option<String>,
    #[serde(default)]
    pub dosage_instruction: Vec<Dosage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dosage {
    pub text: Option<String>,
    pub route: Option<CodeableConcept>,
    pub method: Option<CodeableConcept>,
    #[serde(default)]
    pub dose_and_rate: Vec<DoseAndRate>,
    pub timing: Option<Timing>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseAndRate {
    pub dose_quantity: Option<Quantity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Timing {
    pub repeat: Option<TimingRepeat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingRepeat {
    pub frequency: Option<u32>,
    pub period: Option<Number>,
    pub period_unit: Option<String>,
    pub bounds_period: Option<Period>,
}

/// A single administration event.
///
/// R5 spells the occurrence element `occurence[x]`; R4 uses `effective[x]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationAdministration {
    pub id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub contained: Vec<ContainedResource>,
    pub medication: Option<CodeableReference>,
    pub medication_reference: Option<Reference>,
    pub medication_codeable_concept: Option<CodeableConcept>,
    #[serde(default)]
    pub performer: Vec<Performer>,
    pub request: Option<Reference>,
    pub encounter: Option<Reference>,
    /// R4 name of `encounter`.
    pub context: Option<Reference>,
    pub occurence_period: Option<Period>,
    pub occurence_date_time: Option<String>,
    pub effective_period: Option<Period>,
    pub effective_date_time: Option<String>,
    pub dosage: Option<AdministrationDosage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Performer {
    pub actor: Option<PerformerActor>,
}

/// Performer actor: a `CodeableReference` in R5, a plain `Reference` in R4.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PerformerActor {
    Codeable(CodeableReference),
    Plain(Reference),
}

impl PerformerActor {
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Codeable(actor) => actor.reference.as_ref()?.reference.as_deref(),
            Self::Plain(actor) => actor.reference.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AdministrationDosage {
    pub text: Option<String>,
    pub route: Option<CodeableConcept>,
    pub method: Option<CodeableConcept>,
    pub dose: Option<Quantity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contained_resources_are_tagged_by_resource_type() {
        let medication: Medication = serde_json::from_value(json!({
            "id": "m1",
            "contained": [
                {"resourceType": "Organization", "id": "org1", "name": "Acme Pharma"},
                {"resourceType": "Substance", "id": "s1"},
                {"resourceType": "Medication", "id": "inner"}
            ]
        }))
        .unwrap();

        assert_eq!(medication.contained.len(), 3);
        assert!(matches!(
            &medication.contained[0],
            ContainedResource::Organization(org) if org.name.as_deref() == Some("Acme Pharma")
        ));
        assert_eq!(medication.contained[1], ContainedResource::Other);
        assert!(matches!(
            &medication.contained[2],
            ContainedResource::Medication(m) if m.id.as_deref() == Some("inner")
        ));
    }

    #[test]
    fn performer_actor_accepts_r5_and_r4_shapes() {
        let r5: Performer = serde_json::from_value(json!({
            "actor": {"reference": {"reference": "Practitioner/p1"}}
        }))
        .unwrap();
        assert_eq!(r5.actor.unwrap().reference(), Some("Practitioner/p1"));

        let r4: Performer = serde_json::from_value(json!({
            "actor": {"reference": "Practitioner/p2"}
        }))
        .unwrap();
        assert_eq!(r4.actor.unwrap().reference(), Some("Practitioner/p2"));
    }

    #[test]
    fn timing_repeat_reads_bounds_period() {
        let timing: Timing = serde_json::from_value(json!({
            "repeat": {
                "frequency": 2,
                "period": 1,
                "periodUnit": "d",
                "boundsPeriod": {"start": "2024-01-01", "end": "2024-01-10"}
            }
        }))
        .unwrap();

        let repeat = timing.repeat.unwrap();
        assert_eq!(repeat.frequency, Some(2));
        assert_eq!(repeat.period_unit.as_deref(), Some("d"));
        assert_eq!(
            repeat.bounds_period.and_then(|p| p.end).as_deref(),
            Some("2024-01-10")
        );
    }
}
