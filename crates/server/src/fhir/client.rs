//! REST client for the external FHIR R4 server
//!
//! A thin wrapper over reqwest: generic search/read/create operations plus
//! named wrappers carrying the exact query parameters each caller needs.
//! All clinical data lives on the upstream server; this client never caches.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use journal_core::{Bundle, FhirResource, ResourceType};

/// Errors from talking to the upstream FHIR server
#[derive(Debug, thiserror::Error)]
pub enum FhirApiError {
    #[error("FHIR request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("FHIR server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Client for the external FHIR REST endpoint
#[derive(Clone)]
pub struct FhirClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl FhirClient {
    /// Create a new client against the given base URL, e.g.
    /// `http://localhost:8081/fhir`. Every call is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FhirApiError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(FhirApiError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FhirApiError::Status { status, body });
        }

        Ok(response.json::<T>().await?)
    }

    /// Search for resources of one type with the given query parameters
    pub async fn search(
        &self,
        resource_type: ResourceType,
        query: &[(&str, &str)],
    ) -> Result<Bundle, FhirApiError> {
        self.get_json(resource_type.as_str(), query).await
    }

    /// Read a single resource by server-assigned ID
    pub async fn read(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> Result<FhirResource, FhirApiError> {
        self.get_json(&format!("{}/{}", resource_type, id), &[])
            .await
    }

    /// Create a resource on the upstream server, returning its new ID
    pub async fn create(&self, resource: &FhirResource) -> Result<String, FhirApiError> {
        let url = format!("{}/{}", self.base_url, resource.resource_type);
        let response = self
            .http
            .post(&url)
            .json(resource)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FhirApiError::Status { status, body });
        }

        // The server advertises the assigned ID in the Location header;
        // some return the stored resource in the body instead.
        let from_location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|loc| id_from_location(&resource.resource_type, loc));
        if let Some(id) = from_location {
            return Ok(id);
        }

        let body: FhirResource = response.json().await?;
        body.id.ok_or(FhirApiError::Status {
            status,
            body: "create response carried no resource ID".to_string(),
        })
    }

    // ---- Patient ----

    pub async fn list_patients(&self) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Patient, &[]).await
    }

    pub async fn search_patients_by_name(&self, name: &str) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Patient, &[("name", name)]).await
    }

    pub async fn search_patients_by_identifier(
        &self,
        personnummer: &str,
    ) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Patient, &[("identifier", personnummer)])
            .await
    }

    pub async fn get_patient(&self, id: &str) -> Result<FhirResource, FhirApiError> {
        self.read(ResourceType::Patient, id).await
    }

    // ---- Practitioner ----

    pub async fn list_practitioners(&self) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Practitioner, &[]).await
    }

    pub async fn search_practitioners_by_name(&self, name: &str) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Practitioner, &[("name", name)])
            .await
    }

    pub async fn search_practitioners_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Practitioner, &[("identifier", identifier)])
            .await
    }

    pub async fn get_practitioner(&self, id: &str) -> Result<FhirResource, FhirApiError> {
        self.read(ResourceType::Practitioner, id).await
    }

    // ---- Condition ----

    pub async fn list_conditions(&self) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Condition, &[]).await
    }

    pub async fn search_conditions_by_text(&self, text: &str) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Condition, &[("code:text", text)])
            .await
    }

    pub async fn search_conditions_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Condition, &[("patient", patient_id)])
            .await
    }

    pub async fn get_condition(&self, id: &str) -> Result<FhirResource, FhirApiError> {
        self.read(ResourceType::Condition, id).await
    }

    // ---- Encounter ----

    pub async fn list_encounters(&self) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Encounter, &[]).await
    }

    /// Encounters where the given reference (`Practitioner/{id}`) participates
    pub async fn search_encounters_by_participant(
        &self,
        participant_ref: &str,
    ) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Encounter, &[("participant", participant_ref)])
            .await
    }

    /// Encounters for a practitioner ID, optionally date-filtered.
    /// The date is passed through verbatim (`YYYY-MM-DD`).
    pub async fn search_encounters_by_practitioner(
        &self,
        practitioner_id: &str,
        date: Option<&str>,
    ) -> Result<Bundle, FhirApiError> {
        match date {
            Some(date) => {
                self.search(
                    ResourceType::Encounter,
                    &[("practitioner", practitioner_id), ("date", date)],
                )
                .await
            }
            None => {
                self.search(ResourceType::Encounter, &[("practitioner", practitioner_id)])
                    .await
            }
        }
    }

    pub async fn search_encounters_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Encounter, &[("patient", patient_id)])
            .await
    }

    pub async fn get_encounter(&self, id: &str) -> Result<FhirResource, FhirApiError> {
        self.read(ResourceType::Encounter, id).await
    }

    // ---- CareTeam ----

    /// Care teams where the given reference (`Practitioner/{id}`) participates
    pub async fn search_careteams_by_participant(
        &self,
        participant_ref: &str,
    ) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::CareTeam, &[("participant", participant_ref)])
            .await
    }

    // ---- Observation ----

    pub async fn list_observations(&self) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Observation, &[]).await
    }

    pub async fn search_observations_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Bundle, FhirApiError> {
        self.search(ResourceType::Observation, &[("patient", patient_id)])
            .await
    }

    pub async fn get_observation(&self, id: &str) -> Result<FhirResource, FhirApiError> {
        self.read(ResourceType::Observation, id).await
    }
}

/// Parse the new resource ID out of a create response Location header,
/// e.g. `http://fhir/Encounter/42/_history/1` yields `42`.
fn id_from_location(resource_type: &str, location: &str) -> Option<String> {
    let mut segments = location.trim_end_matches('/').split('/').peekable();
    while let Some(segment) = segments.next() {
        if segment == resource_type {
            return segments
                .peek()
                .filter(|id| !id.is_empty())
                .map(|id| id.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_header_with_history_segment() {
        assert_eq!(
            id_from_location("Encounter", "http://fhir/Encounter/42/_history/1"),
            Some("42".to_string())
        );
    }

    #[test]
    fn location_header_without_history() {
        assert_eq!(
            id_from_location("Condition", "/fhir/Condition/abc-123"),
            Some("abc-123".to_string())
        );
    }

    #[test]
    fn location_header_missing_type_yields_none() {
        assert_eq!(id_from_location("Observation", "http://fhir/other/1"), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = FhirClient::new("http://localhost:8081/fhir/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://localhost:8081/fhir");
    }
}
