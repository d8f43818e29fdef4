//! Search API handlers (`/api/search`)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::search::service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", get(patients))
        .route("/encounters", get(encounters))
        .route("/conditions", get(conditions))
        .route("/doctors/{doctorId}/patients", get(doctor_patients))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Query parameters for patient search
#[derive(Debug, Deserialize, Default)]
pub struct PatientSearchParams {
    pub name: Option<String>,
    pub condition: Option<String>,
    #[serde(rename = "practitionerId")]
    pub practitioner_id: Option<String>,
}

/// GET /api/search/patients?name=|condition=|practitionerId=
///
/// Exactly one parameter is expected; when several are present the first of
/// name, condition, practitionerId wins.
pub async fn patients(
    State(state): State<AppState>,
    Query(params): Query<PatientSearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let results = if let Some(name) = non_empty(&params.name) {
        service::patients_by_name(&state.fhir, name).await
    } else if let Some(condition) = non_empty(&params.condition) {
        service::patients_by_condition(&state.fhir, condition).await
    } else if let Some(practitioner) = non_empty(&params.practitioner_id) {
        service::patients_by_practitioner(&state.fhir, practitioner).await
    } else {
        return Err(AppError::BadRequest(
            "Provide one of 'name', 'condition' or 'practitionerId'".to_string(),
        ));
    };
    Ok(Json(results))
}

/// Query parameters for encounter search
#[derive(Debug, Deserialize, Default)]
pub struct EncounterSearchParams {
    #[serde(rename = "practitionerId")]
    pub practitioner_id: Option<String>,
    pub date: Option<String>,
}

/// GET /api/search/encounters?practitionerId=&date=
pub async fn encounters(
    State(state): State<AppState>,
    Query(params): Query<EncounterSearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let Some(practitioner) = non_empty(&params.practitioner_id) else {
        return Err(AppError::BadRequest(
            "Query parameter 'practitionerId' is required".to_string(),
        ));
    };

    let date = match non_empty(&params.date) {
        Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            AppError::BadRequest("Invalid date format. Use: YYYY-MM-DD".to_string())
        })?),
        None => None,
    };

    let results = service::encounters_by_practitioner(&state.fhir, practitioner, date).await;
    Ok(Json(results))
}

/// Query parameters for condition search
#[derive(Debug, Deserialize, Default)]
pub struct ConditionSearchParams {
    pub condition: Option<String>,
}

/// GET /api/search/conditions?condition=
pub async fn conditions(
    State(state): State<AppState>,
    Query(params): Query<ConditionSearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let Some(condition) = non_empty(&params.condition) else {
        return Err(AppError::BadRequest(
            "Query parameter 'condition' is required".to_string(),
        ));
    };
    Ok(Json(service::conditions_by_text(&state.fhir, condition).await))
}

/// GET /api/search/doctors/{doctorId}/patients
pub async fn doctor_patients(
    State(state): State<AppState>,
    Path(doctor_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    match service::doctor_patients(&state.fhir, &doctor_id).await {
        Some(result) => Ok(Json(result)),
        None => Err(AppError::NotFound(format!(
            "Doctor {} not found",
            doctor_id
        ))),
    }
}
