//! Messaging API handlers (`/api/v1/messages`)
//!
//! Messages are stored verbatim in the relational store. The patient
//! personnummer is a weak reference into the upstream FHIR server: it is
//! advisory-checked and warn-logged on mismatch, never blocking the write.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::db::{Message, MessageRepository, NewMessage, UserRepository};
use crate::error::AppError;
use crate::fhir::FhirClient;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(send))
        .route("/patient/{personnummer}", get(for_patient))
        .route("/from-user/{userId}", get(from_user))
        .route("/to-user/{userId}", get(to_user))
}

/// Wire shape of a message
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub patient_personnummer: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<Message> for MessageDto {
    fn from(m: Message) -> Self {
        Self {
            id: Some(m.id),
            from_user_id: m.from_user_id,
            to_user_id: m.to_user_id,
            patient_personnummer: m.patient_personnummer,
            content: m.content,
            sent_at: Some(m.sent_at),
        }
    }
}

/// Advisory check that the personnummer matches a patient upstream.
/// Only ever logs; the caller proceeds regardless.
async fn advisory_patient_check(fhir: &FhirClient, personnummer: &str) {
    match fhir.search_patients_by_identifier(personnummer).await {
        Ok(bundle) if bundle.first_resource().is_none() => {
            tracing::warn!(
                personnummer = %personnummer,
                "Patient not found on the FHIR server, proceeding anyway"
            );
        }
        Err(err) => {
            tracing::warn!(
                personnummer = %personnummer,
                error = %err,
                "Could not validate patient against the FHIR server, proceeding anyway"
            );
        }
        Ok(_) => {}
    }
}

/// POST /api/v1/messages
pub async fn send(
    State(state): State<AppState>,
    Json(dto): Json<MessageDto>,
) -> Result<impl IntoResponse, AppError> {
    let users = UserRepository::new(state.pool.clone());

    if !users.exists_by_id(dto.from_user_id).await? {
        return Err(AppError::NotFound(format!(
            "Sender not found: {}",
            dto.from_user_id
        )));
    }
    if !users.exists_by_id(dto.to_user_id).await? {
        return Err(AppError::NotFound(format!(
            "Recipient not found: {}",
            dto.to_user_id
        )));
    }
    if dto.patient_personnummer.is_empty() {
        return Err(AppError::BadRequest(
            "Patient personnummer is required".to_string(),
        ));
    }

    advisory_patient_check(&state.fhir, &dto.patient_personnummer).await;

    let repo = MessageRepository::new(state.pool.clone());
    let saved = repo
        .insert(NewMessage {
            from_user_id: dto.from_user_id,
            to_user_id: dto.to_user_id,
            patient_personnummer: dto.patient_personnummer,
            content: dto.content,
            sent_at: dto.sent_at.unwrap_or_else(Utc::now),
        })
        .await?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!("/api/v1/messages/{}", saved.id).parse() {
        headers.insert(header::LOCATION, value);
    }
    Ok((StatusCode::CREATED, headers, Json(MessageDto::from(saved))))
}

/// GET /api/v1/messages/patient/{personnummer}
pub async fn for_patient(
    State(state): State<AppState>,
    Path(personnummer): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    advisory_patient_check(&state.fhir, &personnummer).await;

    let repo = MessageRepository::new(state.pool.clone());
    let messages = repo.for_patient(&personnummer).await?;
    Ok(Json(
        messages.into_iter().map(MessageDto::from).collect::<Vec<_>>(),
    ))
}

/// GET /api/v1/messages/from-user/{userId}
pub async fn from_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let repo = MessageRepository::new(state.pool.clone());
    let messages = repo.from_user(user_id).await?;
    Ok(Json(
        messages.into_iter().map(MessageDto::from).collect::<Vec<_>>(),
    ))
}

/// GET /api/v1/messages/to-user/{userId}
pub async fn to_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let repo = MessageRepository::new(state.pool.clone());
    let messages = repo.to_user(user_id).await?;
    Ok(Json(
        messages.into_iter().map(MessageDto::from).collect::<Vec<_>>(),
    ))
}
