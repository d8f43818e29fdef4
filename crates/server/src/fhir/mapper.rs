//! Projections from upstream resources into API DTOs
//!
//! Two DTO families share these rules: the search results (string IDs, flat
//! display fields) and the clinical DTOs (numeric IDs recovered from the
//! upstream ID string, Swedish display defaults kept from the original
//! system). Absent fields map to empty strings or None, never to errors.

use serde::{Deserialize, Serialize};

use journal_core::{FhirResource, ResourceType, local_id};

/// Canonical placeholder when a condition carries neither text nor coding
pub const UNKNOWN_CONDITION: &str = "Unknown condition";

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientSearchResult {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub social_security_number: String,
    pub date_of_birth: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSearchResult {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub description: String,
    pub recorded_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncounterSearchResult {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub practitioner_id: String,
    pub practitioner_name: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorPatientsResult {
    pub doctor_id: String,
    pub doctor_name: String,
    pub patients: Vec<PatientSearchResult>,
}

/// Map a Patient resource to a search result. Non-Patient input yields None.
pub fn to_patient_search_result(resource: &FhirResource) -> Option<PatientSearchResult> {
    if !resource.is_type(ResourceType::Patient) {
        return None;
    }
    Some(PatientSearchResult {
        id: resource.id.clone().unwrap_or_default(),
        first_name: resource.first_given().to_string(),
        last_name: resource.family().to_string(),
        social_security_number: resource.first_identifier().unwrap_or_default().to_string(),
        date_of_birth: resource.birth_date.clone().unwrap_or_default(),
    })
}

/// Map a Condition resource to a search result, with the patient display
/// name supplied by the caller (the aggregation layer joins it in).
pub fn to_condition_search_result(
    resource: &FhirResource,
    patient_name: &str,
) -> Option<ConditionSearchResult> {
    if !resource.is_type(ResourceType::Condition) {
        return None;
    }
    Some(ConditionSearchResult {
        id: resource.id.clone().unwrap_or_default(),
        patient_id: resource.subject_id().unwrap_or_default().to_string(),
        patient_name: patient_name.to_string(),
        description: resource.description_or(UNKNOWN_CONDITION).to_string(),
        recorded_date: resource.recorded_date.clone().unwrap_or_default(),
    })
}

/// Map an Encounter resource to a search result, with the joined patient
/// and practitioner display names supplied by the caller.
pub fn to_encounter_search_result(
    resource: &FhirResource,
    patient_name: &str,
    practitioner_name: &str,
) -> Option<EncounterSearchResult> {
    if !resource.is_type(ResourceType::Encounter) {
        return None;
    }
    let (start_time, end_time) = match &resource.period {
        Some(p) => (
            p.start.clone().unwrap_or_default(),
            p.end.clone().unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };
    Some(EncounterSearchResult {
        id: resource.id.clone().unwrap_or_default(),
        patient_id: resource.subject_id().unwrap_or_default().to_string(),
        patient_name: patient_name.to_string(),
        practitioner_id: resource
            .practitioner_participant_id()
            .unwrap_or_default()
            .to_string(),
        practitioner_name: practitioner_name.to_string(),
        start_time,
        end_time,
    })
}

// ---------------------------------------------------------------------------
// Clinical DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientDto {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub social_security_number: String,
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PractitionerDto {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub social_security_number: String,
    pub date_of_birth: Option<String>,
    pub title: String,
    pub organization_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionDto {
    pub id: i64,
    pub patient_id: Option<i64>,
    pub practitioner_id: Option<i64>,
    pub description: String,
    pub asserted_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncounterDto {
    pub id: i64,
    pub patient_id: Option<i64>,
    pub practitioner_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDto {
    pub id: i64,
    pub patient_id: Option<i64>,
    pub performer_id: Option<i64>,
    pub encounter_id: Option<i64>,
    pub description: String,
    pub effective_date_time: Option<String>,
}

/// Recover a numeric ID from an upstream ID or reference string.
///
/// The clinical API exposes numeric IDs; a non-numeric upstream ID maps to 0
/// with a warning, a preserved quirk of the original system.
pub fn extract_numeric_id(raw: &str) -> i64 {
    let id = local_id(raw);
    match id.parse::<i64>() {
        Ok(n) => n,
        Err(_) => {
            tracing::warn!(id = %raw, "Non-numeric FHIR ID mapped to 0");
            0
        }
    }
}

fn reference_numeric_id(reference: &Option<journal_core::Reference>) -> Option<i64> {
    reference
        .as_ref()
        .and_then(|r| r.reference.as_deref())
        .map(extract_numeric_id)
}

pub fn to_patient_dto(resource: &FhirResource) -> PatientDto {
    PatientDto {
        id: extract_numeric_id(resource.id.as_deref().unwrap_or("")),
        first_name: resource.first_given().to_string(),
        last_name: resource.family().to_string(),
        social_security_number: resource
            .first_identifier()
            .unwrap_or("Okänt")
            .to_string(),
        date_of_birth: resource.birth_date.clone(),
    }
}

pub fn to_practitioner_dto(resource: &FhirResource) -> PractitionerDto {
    let title = resource
        .qualification
        .first()
        .and_then(|q| q.code.as_ref())
        .and_then(|c| c.text.as_deref())
        .unwrap_or("Vårdpersonal")
        .to_string();
    PractitionerDto {
        id: extract_numeric_id(resource.id.as_deref().unwrap_or("")),
        first_name: resource.first_given().to_string(),
        last_name: resource.family().to_string(),
        social_security_number: resource
            .first_identifier()
            .unwrap_or("Okänt")
            .to_string(),
        date_of_birth: resource.birth_date.clone(),
        title,
        organization_id: None,
    }
}

pub fn to_condition_dto(resource: &FhirResource) -> ConditionDto {
    ConditionDto {
        id: extract_numeric_id(resource.id.as_deref().unwrap_or("")),
        patient_id: reference_numeric_id(&resource.subject),
        practitioner_id: reference_numeric_id(&resource.recorder),
        description: resource.description_or("Okänd diagnos").to_string(),
        asserted_date: resource.recorded_date.clone(),
    }
}

pub fn to_encounter_dto(resource: &FhirResource) -> EncounterDto {
    let practitioner_id = resource.practitioner_participant_id().map(extract_numeric_id);
    let (start_time, end_time) = match &resource.period {
        Some(p) => (p.start.clone(), p.end.clone()),
        None => (None, None),
    };
    EncounterDto {
        id: extract_numeric_id(resource.id.as_deref().unwrap_or("")),
        patient_id: reference_numeric_id(&resource.subject),
        practitioner_id,
        organization_id: reference_numeric_id(&resource.service_provider),
        start_time,
        end_time,
    }
}

pub fn to_observation_dto(resource: &FhirResource) -> ObservationDto {
    let performer_id = resource
        .performer
        .iter()
        .find_map(|r| r.reference.as_deref())
        .filter(|r| r.starts_with("Practitioner/"))
        .map(extract_numeric_id);

    // The measured value rides along inside the description, either as a
    // quantity with unit or as opaque text.
    let mut description = resource.description_or("Okänd observation").to_string();
    if let Some(q) = &resource.value_quantity {
        if let Some(v) = q.value {
            description = format!("{}: {} {}", description, v, q.unit.as_deref().unwrap_or(""));
        }
    } else if let Some(text) = &resource.value_string {
        description = format!("{}: {}", description, text);
    }

    ObservationDto {
        id: extract_numeric_id(resource.id.as_deref().unwrap_or("")),
        patient_id: reference_numeric_id(&resource.subject),
        performer_id,
        encounter_id: reference_numeric_id(&resource.encounter),
        description,
        effective_date_time: resource.effective_date_time.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::Bundle;

    fn patient_json(id: &str, given: &str, family: &str, ssn: &str, born: &str) -> FhirResource {
        serde_json::from_str(&format!(
            r#"{{
                "resourceType": "Patient",
                "id": "{id}",
                "name": [{{"given": ["{given}"], "family": "{family}"}}],
                "identifier": [{{"value": "{ssn}"}}],
                "birthDate": "{born}"
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn patient_search_result_extracts_display_fields() {
        let patient = patient_json("123", "Anna", "Andersson", "197001011234", "1970-01-01");
        let result = to_patient_search_result(&patient).unwrap();
        assert_eq!(
            result,
            PatientSearchResult {
                id: "123".into(),
                first_name: "Anna".into(),
                last_name: "Andersson".into(),
                social_security_number: "197001011234".into(),
                date_of_birth: "1970-01-01".into(),
            }
        );
    }

    #[test]
    fn patient_search_result_rejects_other_resource_types() {
        let condition: FhirResource =
            serde_json::from_str(r#"{"resourceType": "Condition", "id": "c1"}"#).unwrap();
        assert!(to_patient_search_result(&condition).is_none());
    }

    #[test]
    fn patient_search_result_tolerates_missing_fields() {
        let bare: FhirResource =
            serde_json::from_str(r#"{"resourceType": "Patient", "id": "9"}"#).unwrap();
        let result = to_patient_search_result(&bare).unwrap();
        assert_eq!(result.first_name, "");
        assert_eq!(result.last_name, "");
        assert_eq!(result.social_security_number, "");
        assert_eq!(result.date_of_birth, "");
    }

    #[test]
    fn condition_search_result_placeholder_when_code_absent() {
        let condition: FhirResource = serde_json::from_str(
            r#"{"resourceType": "Condition", "id": "c1", "subject": {"reference": "Patient/123"}}"#,
        )
        .unwrap();
        let result = to_condition_search_result(&condition, "Anna Andersson").unwrap();
        assert_eq!(result.description, UNKNOWN_CONDITION);
        assert_eq!(result.patient_id, "123");
        assert_eq!(result.patient_name, "Anna Andersson");
    }

    #[test]
    fn condition_subject_without_prefix_is_used_verbatim() {
        let condition: FhirResource = serde_json::from_str(
            r#"{"resourceType": "Condition", "id": "c1", "subject": {"reference": "197001011234"}}"#,
        )
        .unwrap();
        let result = to_condition_search_result(&condition, "").unwrap();
        assert_eq!(result.patient_id, "197001011234");
    }

    #[test]
    fn encounter_search_result_joins_names_and_period() {
        let encounter: FhirResource = serde_json::from_str(
            r#"{
                "resourceType": "Encounter",
                "id": "enc1",
                "subject": {"reference": "Patient/123"},
                "participant": [{"individual": {"reference": "Practitioner/999"}}],
                "period": {"start": "2024-01-01T10:00:00", "end": "2024-01-01T11:00:00"}
            }"#,
        )
        .unwrap();
        let result =
            to_encounter_search_result(&encounter, "Anna Andersson", "Erik Karlsson").unwrap();
        assert_eq!(result.patient_id, "123");
        assert_eq!(result.practitioner_id, "999");
        assert_eq!(result.start_time, "2024-01-01T10:00:00");
        assert_eq!(result.end_time, "2024-01-01T11:00:00");
    }

    #[test]
    fn numeric_id_extraction_handles_prefixes_and_garbage() {
        assert_eq!(extract_numeric_id("42"), 42);
        assert_eq!(extract_numeric_id("Patient/42"), 42);
        assert_eq!(extract_numeric_id("not-a-number"), 0);
    }

    #[test]
    fn observation_dto_appends_quantity_to_description() {
        let obs: FhirResource = serde_json::from_str(
            r#"{
                "resourceType": "Observation",
                "id": "5",
                "code": {"text": "Heart rate"},
                "valueQuantity": {"value": 72.5, "unit": "bpm"}
            }"#,
        )
        .unwrap();
        assert_eq!(to_observation_dto(&obs).description, "Heart rate: 72.5 bpm");
    }

    #[test]
    fn observation_dto_appends_text_value_to_description() {
        let obs: FhirResource = serde_json::from_str(
            r#"{
                "resourceType": "Observation",
                "id": "5",
                "code": {"text": "Overall state"},
                "valueString": "Normal"
            }"#,
        )
        .unwrap();
        assert_eq!(
            to_observation_dto(&obs).description,
            "Overall state: Normal"
        );
    }

    #[test]
    fn practitioner_dto_title_defaults_in_swedish() {
        let practitioner: FhirResource =
            serde_json::from_str(r#"{"resourceType": "Practitioner", "id": "7"}"#).unwrap();
        let dto = to_practitioner_dto(&practitioner);
        assert_eq!(dto.title, "Vårdpersonal");
        assert_eq!(dto.social_security_number, "Okänt");
    }

    #[test]
    fn bundle_maps_to_patient_list_skipping_foreign_entries() {
        let bundle: Bundle = serde_json::from_str(
            r#"{
                "resourceType": "Bundle",
                "type": "searchset",
                "entry": [
                    {"resource": {"resourceType": "Patient", "id": "1"}},
                    {"resource": {"resourceType": "OperationOutcome"}},
                    {"resource": {"resourceType": "Patient", "id": "2"}}
                ]
            }"#,
        )
        .unwrap();
        let patients: Vec<_> = bundle
            .resources()
            .filter_map(to_patient_search_result)
            .collect();
        assert_eq!(patients.len(), 2);
        assert_eq!(patients[0].id, "1");
        assert_eq!(patients[1].id, "2");
    }
}
