//! Multi-resource search aggregation
//!
//! Joins Practitioner/Encounter/Condition/CareTeam/Patient resources from
//! the upstream server into flat, denormalized search results. Every fetch
//! site degrades independently: a failed sub-fetch becomes an empty bundle
//! or a dropped row plus a warning, never a failed request. Results follow
//! first-seen order of the deduplicated patient IDs, so repeated queries
//! against unchanged data are stable.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use futures::future::join_all;

use journal_core::{Bundle, ClinicalReference, FhirResource, ResourceType};

use crate::fhir::mapper::{
    self, ConditionSearchResult, DoctorPatientsResult, EncounterSearchResult, PatientSearchResult,
};
use crate::fhir::{FhirApiError, FhirClient};
use crate::search::resolve::resolve_practitioner;

/// Degrade an upstream search failure to an empty bundle, logging a warning
fn degrade(context: &str, result: Result<Bundle, FhirApiError>) -> Bundle {
    match result {
        Ok(bundle) => bundle,
        Err(err) => {
            tracing::warn!(context = %context, error = %err, "Upstream search failed, degrading to empty");
            Bundle::empty()
        }
    }
}

/// Unique patient IDs referenced by the given bundles, in first-seen order
fn unique_patient_ids<'a>(bundles: impl IntoIterator<Item = &'a Bundle>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for bundle in bundles {
        for resource in bundle.resources() {
            if let Some(id) = resource.subject_id()
                && !id.is_empty()
                && seen.insert(id.to_string())
            {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

/// Fetch full patient records for the given IDs concurrently.
///
/// Failed reads are filtered out silently apart from a warning; partial
/// results beat an all-or-nothing failure.
async fn fetch_patients(fhir: &FhirClient, ids: &[String]) -> Vec<FhirResource> {
    let fetches = ids.iter().map(|id| fhir.get_patient(id));
    join_all(fetches)
        .await
        .into_iter()
        .zip(ids)
        .filter_map(|(result, id)| match result {
            Ok(patient) => Some(patient),
            Err(err) => {
                tracing::warn!(patient_id = %id, error = %err, "Patient detail fetch failed, dropping");
                None
            }
        })
        .collect()
}

/// Display names for the given patient IDs, fetched concurrently.
/// A failed read simply leaves the ID out of the map.
async fn patient_name_map(fhir: &FhirClient, ids: &[String]) -> HashMap<String, String> {
    fetch_patients(fhir, ids)
        .await
        .into_iter()
        .filter_map(|p| p.id.clone().map(|id| (id, p.display_name())))
        .collect()
}

/// Search patients by name
pub async fn patients_by_name(fhir: &FhirClient, name: &str) -> Vec<PatientSearchResult> {
    let bundle = degrade("Patient?name", fhir.search_patients_by_name(name).await);
    bundle
        .resources()
        .filter_map(mapper::to_patient_search_result)
        .collect()
}

/// Search patients by condition text: find matching Conditions, then join
/// the unique referenced patients.
pub async fn patients_by_condition(fhir: &FhirClient, condition: &str) -> Vec<PatientSearchResult> {
    let conditions = degrade(
        "Condition?code:text",
        fhir.search_conditions_by_text(condition).await,
    );
    let ids = unique_patient_ids([&conditions]);
    fetch_patients(fhir, &ids)
        .await
        .iter()
        .filter_map(mapper::to_patient_search_result)
        .collect()
}

/// Patients under a practitioner's care, via both Encounter and CareTeam
/// participation. The two lookups run concurrently and fail independently.
pub async fn patients_by_practitioner(
    fhir: &FhirClient,
    practitioner: &str,
) -> Vec<PatientSearchResult> {
    let Some(practitioner_id) = resolve_practitioner(fhir, practitioner).await else {
        return Vec::new();
    };

    let participant_ref =
        ClinicalReference::new(ResourceType::Practitioner, &practitioner_id).to_string();
    let (encounters, care_teams) = tokio::join!(
        fhir.search_encounters_by_participant(&participant_ref),
        fhir.search_careteams_by_participant(&participant_ref),
    );
    let encounters = degrade("Encounter?participant", encounters);
    let care_teams = degrade("CareTeam?participant", care_teams);

    let ids = unique_patient_ids([&encounters, &care_teams]);
    fetch_patients(fhir, &ids)
        .await
        .iter()
        .filter_map(mapper::to_patient_search_result)
        .collect()
}

/// Encounters for a practitioner, optionally filtered to one date, with
/// patient and practitioner display names joined in.
pub async fn encounters_by_practitioner(
    fhir: &FhirClient,
    practitioner: &str,
    date: Option<NaiveDate>,
) -> Vec<EncounterSearchResult> {
    let Some(practitioner_id) = resolve_practitioner(fhir, practitioner).await else {
        return Vec::new();
    };

    let date = date.map(|d| d.format("%Y-%m-%d").to_string());
    let encounters = degrade(
        "Encounter?practitioner",
        fhir.search_encounters_by_practitioner(&practitioner_id, date.as_deref())
            .await,
    );

    let practitioner_name = match fhir.get_practitioner(&practitioner_id).await {
        Ok(p) => p.display_name(),
        Err(err) => {
            tracing::warn!(practitioner_id = %practitioner_id, error = %err, "Practitioner detail fetch failed");
            String::new()
        }
    };

    let patient_ids = unique_patient_ids([&encounters]);
    let names = patient_name_map(fhir, &patient_ids).await;

    encounters
        .resources()
        .filter_map(|encounter| {
            // An encounter with no subject reference has nothing to show.
            let patient_id = encounter.subject_id().filter(|id| !id.is_empty())?;
            let patient_name = names.get(patient_id).map(String::as_str).unwrap_or("");
            mapper::to_encounter_search_result(encounter, patient_name, &practitioner_name)
        })
        .collect()
}

/// Conditions matching a text search, with patient display names joined in
pub async fn conditions_by_text(fhir: &FhirClient, condition: &str) -> Vec<ConditionSearchResult> {
    let conditions = degrade(
        "Condition?code:text",
        fhir.search_conditions_by_text(condition).await,
    );
    let patient_ids = unique_patient_ids([&conditions]);
    let names = patient_name_map(fhir, &patient_ids).await;

    conditions
        .resources()
        .filter_map(|resource| {
            let patient_name = resource
                .subject_id()
                .and_then(|id| names.get(id))
                .map(String::as_str)
                .unwrap_or("");
            mapper::to_condition_search_result(resource, patient_name)
        })
        .collect()
}

/// A doctor's identity plus every patient under their care.
/// `None` when the doctor identifier cannot be resolved.
pub async fn doctor_patients(fhir: &FhirClient, doctor: &str) -> Option<DoctorPatientsResult> {
    let doctor_id = resolve_practitioner(fhir, doctor).await?;

    let doctor_name = match fhir.get_practitioner(&doctor_id).await {
        Ok(p) => p.display_name(),
        Err(err) => {
            tracing::warn!(doctor_id = %doctor_id, error = %err, "Doctor detail fetch failed");
            String::new()
        }
    };

    let patients = patients_by_practitioner(fhir, &doctor_id).await;
    Some(DoctorPatientsResult {
        doctor_id,
        doctor_name,
        patients,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::BundleEntry;

    fn bundle_with_subjects(refs: &[&str]) -> Bundle {
        let entries = refs
            .iter()
            .map(|r| {
                let resource: FhirResource = serde_json::from_str(&format!(
                    r#"{{"resourceType": "Encounter", "subject": {{"reference": "{r}"}}}}"#
                ))
                .unwrap();
                BundleEntry::new(None, resource)
            })
            .collect();
        Bundle::searchset(refs.len() as u32, entries)
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        let bundle = bundle_with_subjects(&["Patient/A", "Patient/B", "Patient/A", "Patient/C"]);
        assert_eq!(unique_patient_ids([&bundle]), vec!["A", "B", "C"]);
    }

    #[test]
    fn dedup_spans_bundles_encounters_first() {
        let encounters = bundle_with_subjects(&["Patient/123"]);
        let care_teams = bundle_with_subjects(&["Patient/456", "Patient/123"]);
        assert_eq!(
            unique_patient_ids([&encounters, &care_teams]),
            vec!["123", "456"]
        );
    }

    #[test]
    fn dedup_skips_entries_without_subject() {
        let mut bundle = bundle_with_subjects(&["Patient/123"]);
        let no_subject: FhirResource =
            serde_json::from_str(r#"{"resourceType": "Encounter", "id": "enc2"}"#).unwrap();
        bundle.entry.push(BundleEntry::new(None, no_subject));
        assert_eq!(unique_patient_ids([&bundle]), vec!["123"]);
    }

    #[test]
    fn dedup_uses_exact_string_equality() {
        // "007" and "7" are distinct IDs; no normalization happens.
        let bundle = bundle_with_subjects(&["Patient/007", "Patient/7"]);
        assert_eq!(unique_patient_ids([&bundle]), vec!["007", "7"]);
    }
}
