//! Lenient FHIR resource model
//!
//! One permissive struct covers every resource kind this system reads.
//! Every field is optional and unknown fields are ignored, so a partial
//! resource from the upstream server never fails deserialization. The
//! accessors return empty strings or `None` for absent fields, never panic.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::reference::{ResourceType, local_id};

/// A name of a person
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HumanName {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

/// A business identifier, e.g. a personnummer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
}

impl CodeableConcept {
    /// Preferred display text: `text`, else the first coding's `display`.
    pub fn display_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or_else(|| self.coding.first().and_then(|c| c.display.as_deref()))
    }
}

/// A literal reference to another resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Reference {
    pub fn to(resource_type: ResourceType, id: &str) -> Self {
        Self {
            reference: Some(format!("{}/{}", resource_type, id)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// An encounter participant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub participant_type: Vec<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub individual: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

/// A measured quantity with a unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Quantity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A practitioner qualification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Qualification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,
}

/// A generic bundle-entry resource shape with optional fields.
///
/// Covers Patient, Practitioner, Encounter, Condition, CareTeam and
/// Observation in one struct, the way the upstream returns them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FhirResource {
    #[serde(rename = "resourceType", default, skip_serializing_if = "String::is_empty")]
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    // Patient / Practitioner
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,
    #[serde(rename = "birthDate", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualification: Vec<Qualification>,

    // Condition / Observation coding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,
    #[serde(rename = "clinicalStatus", skip_serializing_if = "Option::is_none")]
    pub clinical_status: Option<CodeableConcept>,
    #[serde(rename = "verificationStatus", skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorder: Option<Reference>,
    #[serde(rename = "recordedDate", skip_serializing_if = "Option::is_none")]
    pub recorded_date: Option<String>,
    #[serde(rename = "onsetDateTime", skip_serializing_if = "Option::is_none")]
    pub onset_date_time: Option<String>,

    // Encounter
    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_code: Option<Coding>,
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub encounter_type: Vec<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participant: Vec<Participant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(rename = "serviceProvider", skip_serializing_if = "Option::is_none")]
    pub service_provider: Option<Reference>,

    // Observation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub performer: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,
    #[serde(rename = "effectiveDateTime", skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued: Option<String>,
    #[serde(rename = "valueQuantity", skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,
    #[serde(rename = "valueString", skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
}

impl FhirResource {
    pub fn is_type(&self, resource_type: ResourceType) -> bool {
        self.resource_type == resource_type.as_str()
    }

    /// First given name of the first name entry, empty string when absent
    pub fn first_given(&self) -> &str {
        self.name
            .first()
            .and_then(|n| n.given.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Family name of the first name entry, empty string when absent
    pub fn family(&self) -> &str {
        self.name
            .first()
            .and_then(|n| n.family.as_deref())
            .unwrap_or("")
    }

    /// "Given Family" display form, trimmed when either part is absent
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_given(), self.family())
            .trim()
            .to_string()
    }

    /// Value of the first identifier carrying one
    pub fn first_identifier(&self) -> Option<&str> {
        self.identifier.iter().find_map(|i| i.value.as_deref())
    }

    /// Bare ID of the subject reference
    pub fn subject_id(&self) -> Option<&str> {
        self.subject
            .as_ref()
            .and_then(|s| s.reference.as_deref())
            .map(local_id)
    }

    /// Bare ID of the first participant referencing a Practitioner
    pub fn practitioner_participant_id(&self) -> Option<&str> {
        self.participant.iter().find_map(|p| {
            p.individual
                .as_ref()
                .and_then(|r| r.reference.as_deref())
                .filter(|r| r.starts_with("Practitioner/"))
                .map(local_id)
        })
    }

    /// Display text of `code`, or the given placeholder
    pub fn description_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.code
            .as_ref()
            .and_then(|c| c.display_text())
            .unwrap_or(placeholder)
    }

    /// Build a Condition resource for the write path.
    ///
    /// Active/confirmed statuses, a SNOMED coding carrying the free-text
    /// description, subject and optional recorder references.
    pub fn condition(
        patient: &str,
        practitioner: Option<&str>,
        description: &str,
        recorded: NaiveDate,
    ) -> Self {
        let date = recorded.format("%Y-%m-%d").to_string();
        Self {
            resource_type: "Condition".to_string(),
            clinical_status: Some(CodeableConcept {
                coding: vec![Coding {
                    system: Some(
                        "http://terminology.hl7.org/CodeSystem/condition-clinical".to_string(),
                    ),
                    code: Some("active".to_string()),
                    display: None,
                }],
                ..Default::default()
            }),
            verification_status: Some(CodeableConcept {
                coding: vec![Coding {
                    system: Some(
                        "http://terminology.hl7.org/CodeSystem/condition-ver-status".to_string(),
                    ),
                    code: Some("confirmed".to_string()),
                    display: None,
                }],
                ..Default::default()
            }),
            code: Some(CodeableConcept {
                text: Some(description.to_string()),
                coding: vec![Coding {
                    system: Some("http://snomed.info/sct".to_string()),
                    code: Some("404684003".to_string()),
                    display: Some(description.to_string()),
                }],
            }),
            subject: Some(Reference::to(ResourceType::Patient, patient)),
            recorder: practitioner
                .filter(|p| !p.is_empty())
                .map(|p| Reference::to(ResourceType::Practitioner, p)),
            recorded_date: Some(date.clone()),
            onset_date_time: Some(date),
            ..Default::default()
        }
    }

    /// Build a finished ambulatory Encounter resource for the write path.
    pub fn encounter(
        patient: &str,
        practitioner: Option<&str>,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    ) -> Self {
        let period = Period {
            start: Some(start.format("%Y-%m-%dT%H:%M:%S").to_string()),
            end: end.map(|e| e.format("%Y-%m-%dT%H:%M:%S").to_string()),
        };
        let participant = practitioner
            .filter(|p| !p.is_empty())
            .map(|p| Participant {
                participant_type: vec![CodeableConcept {
                    coding: vec![Coding {
                        system: Some(
                            "http://terminology.hl7.org/CodeSystem/v3-ParticipationType"
                                .to_string(),
                        ),
                        code: Some("PPRF".to_string()),
                        display: Some("primary performer".to_string()),
                    }],
                    ..Default::default()
                }],
                individual: Some(Reference::to(ResourceType::Practitioner, p)),
                period: Some(period.clone()),
            })
            .into_iter()
            .collect();

        Self {
            resource_type: "Encounter".to_string(),
            status: Some("finished".to_string()),
            class_code: Some(Coding {
                system: Some("http://terminology.hl7.org/CodeSystem/v3-ActCode".to_string()),
                code: Some("AMB".to_string()),
                display: Some("ambulatory".to_string()),
            }),
            encounter_type: vec![CodeableConcept {
                coding: vec![Coding {
                    system: Some("http://snomed.info/sct".to_string()),
                    code: Some("185349003".to_string()),
                    display: Some("Encounter for check up (procedure)".to_string()),
                }],
                ..Default::default()
            }],
            subject: Some(Reference::to(ResourceType::Patient, patient)),
            participant,
            period: Some(period),
            ..Default::default()
        }
    }

    /// Build a final vital-signs Observation resource for the write path.
    ///
    /// The value keeps its dual representation: a value that parses as a
    /// decimal becomes a quantity (unit falling back to the sentinel
    /// "{score}" when none is supplied), anything else is stored as opaque
    /// text. Heterogeneous clinical values stay representable either way.
    pub fn observation(
        patient: &str,
        performer: Option<&str>,
        description: &str,
        value: Option<&str>,
        unit: Option<&str>,
        effective: NaiveDate,
    ) -> Self {
        let effective = effective.format("%Y-%m-%d").to_string();
        let mut resource = Self {
            resource_type: "Observation".to_string(),
            status: Some("final".to_string()),
            category: vec![CodeableConcept {
                coding: vec![Coding {
                    system: Some(
                        "http://terminology.hl7.org/CodeSystem/observation-category".to_string(),
                    ),
                    code: Some("vital-signs".to_string()),
                    display: Some("Vital signs".to_string()),
                }],
                ..Default::default()
            }],
            code: Some(CodeableConcept {
                text: Some(description.to_string()),
                coding: vec![Coding {
                    system: Some("http://loinc.org".to_string()),
                    code: Some("8310-5".to_string()),
                    display: Some(description.to_string()),
                }],
            }),
            subject: Some(Reference::to(ResourceType::Patient, patient)),
            performer: performer
                .filter(|p| !p.is_empty())
                .map(|p| Reference::to(ResourceType::Practitioner, p))
                .into_iter()
                .collect(),
            effective_date_time: Some(effective.clone()),
            issued: Some(effective),
            ..Default::default()
        };

        if let Some(value) = value.filter(|v| !v.is_empty()) {
            match value.parse::<f64>() {
                Ok(numeric) => {
                    let unit = unit.filter(|u| !u.is_empty()).unwrap_or("{score}");
                    resource.value_quantity = Some(Quantity {
                        value: Some(numeric),
                        unit: Some(unit.to_string()),
                        system: Some("http://unitsofmeasure.org".to_string()),
                        code: Some(unit.to_string()),
                    });
                }
                Err(_) => resource.value_string = Some(value.to_string()),
            }
        }

        resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_tolerate_empty_resource() {
        let resource = FhirResource::default();
        assert_eq!(resource.first_given(), "");
        assert_eq!(resource.family(), "");
        assert_eq!(resource.display_name(), "");
        assert_eq!(resource.first_identifier(), None);
        assert_eq!(resource.subject_id(), None);
        assert_eq!(resource.description_or("fallback"), "fallback");
    }

    #[test]
    fn name_extraction_uses_first_entries() {
        let resource: FhirResource = serde_json::from_str(
            r#"{
                "resourceType": "Patient",
                "id": "123",
                "name": [
                    {"given": ["Anna", "Maria"], "family": "Andersson"},
                    {"given": ["A."], "family": "A."}
                ],
                "identifier": [{"value": "197001011234"}]
            }"#,
        )
        .unwrap();
        assert_eq!(resource.first_given(), "Anna");
        assert_eq!(resource.family(), "Andersson");
        assert_eq!(resource.display_name(), "Anna Andersson");
        assert_eq!(resource.first_identifier(), Some("197001011234"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let resource: FhirResource = serde_json::from_str(
            r#"{"resourceType": "Patient", "id": "1", "meta": {"versionId": "3"}, "active": true}"#,
        )
        .unwrap();
        assert!(resource.is_type(ResourceType::Patient));
        assert_eq!(resource.id.as_deref(), Some("1"));
    }

    #[test]
    fn description_prefers_text_over_coding() {
        let resource: FhirResource = serde_json::from_str(
            r#"{
                "resourceType": "Condition",
                "code": {"text": "Diabetes", "coding": [{"display": "Diabetes mellitus"}]}
            }"#,
        )
        .unwrap();
        assert_eq!(resource.description_or("Unknown condition"), "Diabetes");
    }

    #[test]
    fn description_falls_back_to_first_coding_display() {
        let resource: FhirResource = serde_json::from_str(
            r#"{
                "resourceType": "Condition",
                "code": {"coding": [{"display": "Hypertension"}, {"display": "HTN"}]}
            }"#,
        )
        .unwrap();
        assert_eq!(resource.description_or("Unknown condition"), "Hypertension");
    }

    #[test]
    fn practitioner_participant_skips_non_practitioners() {
        let resource: FhirResource = serde_json::from_str(
            r#"{
                "resourceType": "Encounter",
                "participant": [
                    {"individual": {"reference": "RelatedPerson/7"}},
                    {"individual": {"reference": "Practitioner/999"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(resource.practitioner_participant_id(), Some("999"));
    }

    #[test]
    fn observation_numeric_value_becomes_quantity() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let obs = FhirResource::observation(
            "197001011234",
            Some("999"),
            "Heart rate",
            Some("72.5"),
            Some("bpm"),
            date,
        );
        let quantity = obs.value_quantity.expect("quantity value");
        assert_eq!(quantity.value, Some(72.5));
        assert_eq!(quantity.unit.as_deref(), Some("bpm"));
        assert!(obs.value_string.is_none());
    }

    #[test]
    fn observation_missing_unit_falls_back_to_score_sentinel() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let obs = FhirResource::observation("p", None, "Pain level", Some("4"), None, date);
        let quantity = obs.value_quantity.expect("quantity value");
        assert_eq!(quantity.unit.as_deref(), Some("{score}"));
        assert_eq!(quantity.code.as_deref(), Some("{score}"));
    }

    #[test]
    fn observation_text_value_stays_text() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let obs = FhirResource::observation("p", None, "Overall", Some("Normal"), None, date);
        assert!(obs.value_quantity.is_none());
        assert_eq!(obs.value_string.as_deref(), Some("Normal"));
    }

    #[test]
    fn condition_builder_carries_description_in_text_and_coding() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let condition = FhirResource::condition("197001011234", Some("999"), "Migraine", date);
        let code = condition.code.as_ref().expect("code");
        assert_eq!(code.text.as_deref(), Some("Migraine"));
        assert_eq!(code.coding[0].display.as_deref(), Some("Migraine"));
        assert_eq!(
            condition.subject.as_ref().unwrap().reference.as_deref(),
            Some("Patient/197001011234")
        );
        assert_eq!(condition.recorded_date.as_deref(), Some("2024-03-05"));
    }

    #[test]
    fn encounter_builder_omits_participant_without_practitioner() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let encounter = FhirResource::encounter("197001011234", None, start, None);
        assert!(encounter.participant.is_empty());
        assert_eq!(
            encounter.period.as_ref().unwrap().start.as_deref(),
            Some("2024-01-01T10:00:00")
        );
        assert!(encounter.period.as_ref().unwrap().end.is_none());
    }
}
