use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// The three fixed authorization levels. Stored as lowercase TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Captura,
    Lectura,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Captura, Role::Lectura];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Captura => "captura",
            Role::Lectura => "lectura",
        }
    }

    /// Accepts only the three enumerated values.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "captura" => Some(Role::Captura),
            "lectura" => Some(Role::Lectura),
            _ => None,
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String, // argon2 hash, never rendered or logged
    pub role: Role,
    pub created_at: OffsetDateTime,
}
