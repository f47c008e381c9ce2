use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

/// A user's role in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
    Admin,
}

impl Role {
    /// The role as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Faculty => "faculty",
            Role::Admin => "admin",
        }
    }

    /// Parses a role from its database representation.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "student" => Some(Role::Student),
            "faculty" => Some(Role::Faculty),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Per-student reference data used by the verification pipeline.
///
/// The face vector is a simulated 128-d embedding, not a real biometric
/// signature. The fingerprint hash only exists for the legacy factor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiometricProfile {
    /// Simulated face embedding, if enrolled.
    pub face_vector: Option<Vec<f64>>,
    /// Simulated fingerprint reference hash (legacy factor).
    pub fingerprint_hash: Option<String>,
}

/// Represents a user in the system.
#[derive(Debug, Clone)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's full name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// The user's hashed password.
    pub password: String,
    /// The user's role.
    pub role: Role,
    /// The user's biometric reference data.
    pub biometric_profile: BiometricProfile,
    /// Whether the user accepted the biometric consent terms.
    pub consent_accepted: bool,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&Row> for User {
    type Error = crate::error::AppError;

    fn try_from(row: &Row) -> crate::error::Result<Self> {
        let role_str: String = row.try_get("role")?;
        let role = Role::parse(&role_str)
            .ok_or_else(|| crate::error::AppError::MissingData(format!("role: {}", role_str)))?;

        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password: row.try_get("password")?,
            role,
            biometric_profile: BiometricProfile {
                face_vector: row.try_get("face_vector")?,
                fingerprint_hash: row.try_get("fingerprint_hash")?,
            },
            consent_accepted: row.try_get("consent_accepted")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
