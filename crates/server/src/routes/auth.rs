//! Auth API handlers (`/api/v1/auth`)
//!
//! Registration pre-checks username and foreignId uniqueness so duplicates
//! answer 400 with the original fixed messages; the UNIQUE constraints on
//! the table close the remaining race. Passwords are stored as salted
//! PBKDF2 hashes, never as plaintext.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::db::{NewUser, Role, User, UserRepository};
use crate::error::AppError;
use crate::password;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/user/{id}", get(user_by_id))
        .route("/user-by-foreign/{foreignId}", get(user_by_foreign_id))
}

/// Wire shape of a user; never carries the password hash
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub foreign_id: Option<String>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            foreign_id: user.foreign_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub role: Option<Role>,
    pub foreign_id: Option<String>,
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let users = UserRepository::new(state.pool.clone());

    if users.exists_by_username(&request.username).await? {
        return Err(AppError::BadRequest("Username already taken".to_string()));
    }
    if let Some(foreign_id) = request.foreign_id.as_deref().filter(|f| !f.is_empty())
        && users.find_by_foreign_id(foreign_id).await?.is_some()
    {
        return Err(AppError::BadRequest(
            "This person is already registered".to_string(),
        ));
    }

    let user = users
        .create(NewUser {
            username: request.username,
            email: request.email,
            password_hash: password::hash_password(&request.password),
            role: request.role,
            foreign_id: request.foreign_id.filter(|f| !f.is_empty()),
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");
    Ok(Json(UserDto::from(user)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let users = UserRepository::new(state.pool.clone());

    let user = users.find_by_username(&request.username).await?;
    let valid = user
        .as_ref()
        .is_some_and(|u| password::verify_password(&request.password, &u.password_hash));
    if !valid {
        return Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    // `valid` guarantees the user is present here.
    let user = user.ok_or_else(|| AppError::Internal("user vanished during login".to_string()))?;
    Ok(Json(UserDto::from(user)))
}

/// GET /api/v1/auth/user/{id}
pub async fn user_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let users = UserRepository::new(state.pool.clone());
    match users.find_by_id(id).await? {
        Some(user) => Ok(Json(UserDto::from(user))),
        None => Err(AppError::NotFound(format!("User {} not found", id))),
    }
}

/// GET /api/v1/auth/user-by-foreign/{foreignId}
pub async fn user_by_foreign_id(
    State(state): State<AppState>,
    Path(foreign_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let users = UserRepository::new(state.pool.clone());
    match users.find_by_foreign_id(&foreign_id).await? {
        Some(user) => Ok(Json(UserDto::from(user))),
        None => Err(AppError::NotFound(format!(
            "User with foreignId {} not found",
            foreign_id
        ))),
    }
}
