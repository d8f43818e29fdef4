use std::fmt;
use std::str::FromStr;

use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

use crate::error::AppError;

/// User role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Patient,
    Doctor,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "PATIENT",
            Role::Doctor => "DOCTOR",
            Role::Staff => "STAFF",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PATIENT" => Ok(Role::Patient),
            "DOCTOR" => Ok(Role::Doctor),
            "STAFF" => Ok(Role::Staff),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A registered user. `foreign_id` links to a FHIR Patient/Practitioner
/// identifier (a personnummer) and is unique per person.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Option<Role>,
    pub foreign_id: Option<String>,
}

/// Fields for creating a user
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Option<Role>,
    pub foreign_id: Option<String>,
}

fn row_to_user(row: &Row) -> User {
    let role: Option<String> = row.get("role");
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: role.as_deref().and_then(|r| r.parse().ok()),
        foreign_id: row.get("foreign_id"),
    }
}

/// Repository for user rows
#[derive(Clone)]
pub struct UserRepository {
    pool: Pool,
}

impl UserRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO users (username, email, password_hash, role, foreign_id) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING id, username, email, password_hash, role, foreign_id",
                &[
                    &user.username,
                    &user.email,
                    &user.password_hash,
                    &user.role.map(|r| r.as_str()),
                    &user.foreign_id,
                ],
            )
            .await?;
        Ok(row_to_user(&row))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, username, email, password_hash, role, foreign_id \
                 FROM users WHERE id = $1",
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(row_to_user))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, username, email, password_hash, role, foreign_id \
                 FROM users WHERE username = $1",
                &[&username],
            )
            .await?;
        Ok(row.as_ref().map(row_to_user))
    }

    pub async fn find_by_foreign_id(&self, foreign_id: &str) -> Result<Option<User>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, username, email, password_hash, role, foreign_id \
                 FROM users WHERE foreign_id = $1",
                &[&foreign_id],
            )
            .await?;
        Ok(row.as_ref().map(row_to_user))
    }

    pub async fn exists_by_username(&self, username: &str) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
                &[&username],
            )
            .await?;
        Ok(row.get(0))
    }

    pub async fn exists_by_id(&self, id: i64) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)", &[&id])
            .await?;
        Ok(row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::Patient, Role::Doctor, Role::Staff] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("ADMIN".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Doctor).unwrap(), "\"DOCTOR\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"PATIENT\"").unwrap(),
            Role::Patient
        );
    }
}
