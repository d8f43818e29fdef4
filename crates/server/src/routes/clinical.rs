//! Clinical API handlers (`/api/v1/clinical`)
//!
//! Thin CRUD against the upstream FHIR server: parse the request, build or
//! query a resource, map the response into a flat DTO. Reads degrade to
//! empty lists on upstream failure; creates propagate failure since there
//! is no safe partial state to return.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use journal_core::{Bundle, FhirResource, ResourceType};

use crate::AppState;
use crate::error::AppError;
use crate::fhir::mapper;
use crate::fhir::{FhirApiError, FhirClient};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients))
        .route("/patients/{id}", get(get_patient))
        .route("/patients/personnummer/{pnr}", get(get_patient_by_personnummer))
        .route("/practitioners", get(list_practitioners))
        .route("/practitioners/{id}", get(get_practitioner))
        .route("/practitioners/search", get(search_practitioners))
        .route("/conditions", get(list_conditions).post(create_condition))
        .route("/conditions/{id}", get(get_condition))
        .route("/conditions/patient/{patientId}", get(conditions_for_patient))
        .route("/encounters", get(list_encounters).post(create_encounter))
        .route("/encounters/{id}", get(get_encounter))
        .route("/encounters/patient/{patientId}", get(encounters_for_patient))
        .route("/observations", get(list_observations).post(create_observation))
        .route("/observations/{id}", get(get_observation))
        .route(
            "/observations/patient/{patientId}",
            get(observations_for_patient),
        )
}

/// Degrade a failed upstream list fetch to an empty bundle with a warning
fn degrade(context: &str, result: Result<Bundle, FhirApiError>) -> Bundle {
    match result {
        Ok(bundle) => bundle,
        Err(err) => {
            tracing::warn!(context = %context, error = %err, "Upstream fetch failed, degrading to empty");
            Bundle::empty()
        }
    }
}

fn map_list<T>(bundle: Bundle, expected: ResourceType, f: impl Fn(&FhirResource) -> T) -> Vec<T> {
    bundle
        .resources()
        .filter(|r| r.is_type(expected))
        .map(|r| f(r))
        .collect()
}

/// Read one resource, mapping upstream not-found to a 404
fn read_or_404<T>(
    result: Result<FhirResource, FhirApiError>,
    what: &str,
    f: impl Fn(&FhirResource) -> T,
) -> Result<Json<T>, AppError> {
    match result {
        Ok(resource) => Ok(Json(f(&resource))),
        Err(FhirApiError::NotFound(_)) => Err(AppError::NotFound(format!("{} not found", what))),
        Err(err) => Err(err.into()),
    }
}

/// Create a resource upstream, re-read it, and answer 201 with a Location
/// header. When the re-read fails the built resource (with the new ID) is
/// mapped instead, like the original create paths did.
async fn create_and_reply<T: serde::Serialize>(
    fhir: &FhirClient,
    mut resource: FhirResource,
    location_base: &str,
    f: impl Fn(&FhirResource) -> T,
) -> Result<Response, AppError> {
    let resource_type = resource.resource_type.clone();
    let id = fhir.create(&resource).await?;
    tracing::info!(resource_type = %resource_type, id = %id, "Resource created upstream");

    let stored = match fhir.read(resource_type.parse().map_err(|_| {
        AppError::Internal(format!("unexpected resource type {}", resource_type))
    })?, &id)
    .await
    {
        Ok(stored) => stored,
        Err(err) => {
            tracing::warn!(id = %id, error = %err, "Re-read after create failed, answering with the built resource");
            resource.id = Some(id.clone());
            resource
        }
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!("{}/{}", location_base, id).parse() {
        headers.insert(header::LOCATION, value);
    }
    Ok((StatusCode::CREATED, headers, Json(f(&stored))).into_response())
}

// ---- Patients ----

pub async fn list_patients(State(state): State<AppState>) -> impl IntoResponse {
    let bundle = degrade("Patient", state.fhir.list_patients().await);
    Json(map_list(bundle, ResourceType::Patient, mapper::to_patient_dto))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    read_or_404(
        state.fhir.get_patient(&id).await,
        &format!("Patient/{}", id),
        mapper::to_patient_dto,
    )
}

/// GET /patients/personnummer/{pnr}: identifier search, first match wins
pub async fn get_patient_by_personnummer(
    State(state): State<AppState>,
    Path(pnr): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bundle = degrade(
        "Patient?identifier",
        state.fhir.search_patients_by_identifier(&pnr).await,
    );
    match bundle.first_resource() {
        Some(patient) => Ok(Json(mapper::to_patient_dto(patient))),
        None => Err(AppError::NotFound(format!(
            "Patient with personnummer {} not found",
            pnr
        ))),
    }
}

// ---- Practitioners ----

pub async fn list_practitioners(State(state): State<AppState>) -> impl IntoResponse {
    let bundle = degrade("Practitioner", state.fhir.list_practitioners().await);
    Json(map_list(
        bundle,
        ResourceType::Practitioner,
        mapper::to_practitioner_dto,
    ))
}

pub async fn get_practitioner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    read_or_404(
        state.fhir.get_practitioner(&id).await,
        &format!("Practitioner/{}", id),
        mapper::to_practitioner_dto,
    )
}

#[derive(Debug, Deserialize)]
pub struct PractitionerSearchParams {
    pub name: Option<String>,
}

pub async fn search_practitioners(
    State(state): State<AppState>,
    axum::extract::Query(params): axum::extract::Query<PractitionerSearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let Some(name) = params.name.as_deref().filter(|n| !n.is_empty()) else {
        return Err(AppError::BadRequest(
            "Query parameter 'name' is required".to_string(),
        ));
    };
    let bundle = degrade(
        "Practitioner?name",
        state.fhir.search_practitioners_by_name(name).await,
    );
    Ok(Json(map_list(
        bundle,
        ResourceType::Practitioner,
        mapper::to_practitioner_dto,
    )))
}

// ---- Conditions ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConditionRequest {
    pub patient_personnummer: String,
    pub practitioner_personnummer: Option<String>,
    pub description: String,
    pub asserted_date: String,
}

pub async fn create_condition(
    State(state): State<AppState>,
    Json(request): Json<CreateConditionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let recorded = NaiveDate::parse_from_str(&request.asserted_date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Invalid date format. Use: yyyy-MM-dd".to_string()))?;

    let condition = FhirResource::condition(
        &request.patient_personnummer,
        request.practitioner_personnummer.as_deref(),
        &request.description,
        recorded,
    );
    create_and_reply(
        &state.fhir,
        condition,
        "/api/v1/clinical/conditions",
        mapper::to_condition_dto,
    )
    .await
}

pub async fn list_conditions(State(state): State<AppState>) -> impl IntoResponse {
    let bundle = degrade("Condition", state.fhir.list_conditions().await);
    Json(map_list(
        bundle,
        ResourceType::Condition,
        mapper::to_condition_dto,
    ))
}

pub async fn get_condition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    read_or_404(
        state.fhir.get_condition(&id).await,
        &format!("Condition/{}", id),
        mapper::to_condition_dto,
    )
}

pub async fn conditions_for_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> impl IntoResponse {
    let bundle = degrade(
        "Condition?patient",
        state.fhir.search_conditions_for_patient(&patient_id).await,
    );
    Json(map_list(
        bundle,
        ResourceType::Condition,
        mapper::to_condition_dto,
    ))
}

// ---- Encounters ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEncounterRequest {
    pub patient_personnummer: String,
    pub practitioner_personnummer: Option<String>,
    pub start_time: String,
    pub end_time: Option<String>,
}

pub async fn create_encounter(
    State(state): State<AppState>,
    Json(request): Json<CreateEncounterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let parse = |raw: &str| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").map_err(|_| {
            AppError::BadRequest("Invalid time format. Use: yyyy-MM-dd'T'HH:mm".to_string())
        })
    };
    let start = parse(&request.start_time)?;
    let end = match request.end_time.as_deref().filter(|e| !e.is_empty()) {
        Some(raw) => Some(parse(raw)?),
        None => None,
    };

    let encounter = FhirResource::encounter(
        &request.patient_personnummer,
        request.practitioner_personnummer.as_deref(),
        start,
        end,
    );
    create_and_reply(
        &state.fhir,
        encounter,
        "/api/v1/clinical/encounters",
        mapper::to_encounter_dto,
    )
    .await
}

pub async fn list_encounters(State(state): State<AppState>) -> impl IntoResponse {
    let bundle = degrade("Encounter", state.fhir.list_encounters().await);
    Json(map_list(
        bundle,
        ResourceType::Encounter,
        mapper::to_encounter_dto,
    ))
}

pub async fn get_encounter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    read_or_404(
        state.fhir.get_encounter(&id).await,
        &format!("Encounter/{}", id),
        mapper::to_encounter_dto,
    )
}

pub async fn encounters_for_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> impl IntoResponse {
    let bundle = degrade(
        "Encounter?patient",
        state.fhir.search_encounters_for_patient(&patient_id).await,
    );
    Json(map_list(
        bundle,
        ResourceType::Encounter,
        mapper::to_encounter_dto,
    ))
}

// ---- Observations ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateObservationRequest {
    pub patient_personnummer: String,
    pub performer_personnummer: Option<String>,
    pub description: String,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub effective_date: String,
}

pub async fn create_observation(
    State(state): State<AppState>,
    Json(request): Json<CreateObservationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let effective = NaiveDate::parse_from_str(&request.effective_date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Invalid date format. Use: yyyy-MM-dd".to_string()))?;

    let observation = FhirResource::observation(
        &request.patient_personnummer,
        request.performer_personnummer.as_deref(),
        &request.description,
        request.value.as_deref(),
        request.unit.as_deref(),
        effective,
    );
    create_and_reply(
        &state.fhir,
        observation,
        "/api/v1/clinical/observations",
        mapper::to_observation_dto,
    )
    .await
}

pub async fn list_observations(State(state): State<AppState>) -> impl IntoResponse {
    let bundle = degrade("Observation", state.fhir.list_observations().await);
    Json(map_list(
        bundle,
        ResourceType::Observation,
        mapper::to_observation_dto,
    ))
}

pub async fn get_observation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    read_or_404(
        state.fhir.get_observation(&id).await,
        &format!("Observation/{}", id),
        mapper::to_observation_dto,
    )
}

pub async fn observations_for_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> impl IntoResponse {
    let bundle = degrade(
        "Observation?patient",
        state.fhir.search_observations_for_patient(&patient_id).await,
    );
    Json(map_list(
        bundle,
        ResourceType::Observation,
        mapper::to_observation_dto,
    ))
}
