use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::engine::policy::VerificationPolicy;
use crate::error::{AppError, Result};

/// Which verification factors a session requires.
///
/// Disabled factors are reported as trivially successful by the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorRules {
    pub face: bool,
    /// Legacy factor; off unless a session explicitly asks for it.
    pub fingerprint: bool,
    pub id_card: bool,
    pub liveness: bool,
}

impl Default for FactorRules {
    fn default() -> Self {
        Self {
            face: true,
            fingerprint: false,
            id_card: true,
            liveness: true,
        }
    }
}

/// Represents one class meeting during which attendance may be marked.
#[derive(Debug, Clone)]
pub struct ClassSession {
    /// The unique identifier for the session.
    pub id: Uuid,
    /// The course this session belongs to.
    pub course_id: String,
    /// The faculty member who owns the session.
    pub faculty_id: Uuid,
    /// The factors this session requires.
    pub verification_rules: FactorRules,
    /// The rule variant this session runs under, fixed at creation.
    pub policy: VerificationPolicy,
    /// The token students must present for the id-card factor.
    pub qr_token: String,
    /// Whether attendance may currently be marked.
    pub active: bool,
    /// The timestamp when the session started.
    pub start_time: DateTime<Utc>,
    /// The timestamp when the session ended, if it has.
    pub end_time: Option<DateTime<Utc>>,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Row> for ClassSession {
    type Error = AppError;

    fn try_from(row: &Row) -> Result<Self> {
        let rules: serde_json::Value = row.try_get("verification_rules")?;
        let policy: serde_json::Value = row.try_get("policy")?;

        Ok(Self {
            id: row.try_get("id")?,
            course_id: row.try_get("course_id")?,
            faculty_id: row.try_get("faculty_id")?,
            verification_rules: serde_json::from_value(rules)
                .map_err(|e| AppError::MissingData(format!("verification_rules: {}", e)))?,
            policy: serde_json::from_value(policy)
                .map_err(|e| AppError::MissingData(format!("policy: {}", e)))?,
            qr_token: row.try_get("qr_token")?,
            active: row.try_get("active")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
