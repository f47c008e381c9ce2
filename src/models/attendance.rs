use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// The overall outcome of verification for a (student, session) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    /// Every evaluated factor succeeded; terminal.
    Marked,
    /// Verification failed.
    Failed,
    /// Verification failed on multiple factors at once.
    Flagged,
}

impl AttendanceStatus {
    /// The status as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Marked => "MARKED",
            AttendanceStatus::Failed => "FAILED",
            AttendanceStatus::Flagged => "FLAGGED",
        }
    }

    /// Parses a status from its database representation.
    pub fn parse(s: &str) -> Option<AttendanceStatus> {
        match s {
            "MARKED" => Some(AttendanceStatus::Marked),
            "FAILED" => Some(AttendanceStatus::Failed),
            "FLAGGED" => Some(AttendanceStatus::Flagged),
            _ => None,
        }
    }
}

/// The face factor's result, carrying the similarity score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FaceCheck {
    pub success: bool,
    pub confidence: f64,
}

/// Per-factor verification results for one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorResults {
    pub face: FaceCheck,
    pub fingerprint: bool,
    pub id_card: bool,
    pub liveness: bool,
}

impl FactorResults {
    /// All factors trivially successful; the pipeline degrades individual
    /// entries as enabled factors fail.
    pub fn all_passing() -> Self {
        Self {
            face: FaceCheck {
                success: true,
                confidence: 100.0,
            },
            fingerprint: true,
            id_card: true,
            liveness: true,
        }
    }

    /// Whether every factor succeeded.
    pub fn is_success(&self) -> bool {
        self.face.success && self.fingerprint && self.id_card && self.liveness
    }
}

/// The durable outcome of verification for one (student, session) pair.
///
/// At most one row exists per pair; a MARKED row is never mutated again.
#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    /// The unique identifier for the record.
    pub id: Uuid,
    /// The student this record belongs to.
    pub student_id: Uuid,
    /// The session this record belongs to.
    pub session_id: Uuid,
    /// Per-factor results of the most recent attempt.
    pub results: FactorResults,
    /// The overall status of the most recent attempt.
    pub status: AttendanceStatus,
    /// How many times this pair has submitted verification.
    pub attempts: i32,
    /// Device fingerprint from the most recent attempt.
    pub device_hash: Option<String>,
    /// IP fingerprint from the most recent attempt.
    pub ip_hash: Option<String>,
    /// The timestamp when the record was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&Row> for AttendanceRecord {
    type Error = AppError;

    fn try_from(row: &Row) -> Result<Self> {
        let status_str: String = row.try_get("status")?;
        let status = AttendanceStatus::parse(&status_str)
            .ok_or_else(|| AppError::MissingData(format!("status: {}", status_str)))?;
        let results: serde_json::Value = row.try_get("results")?;

        Ok(Self {
            id: row.try_get("id")?,
            student_id: row.try_get("student_id")?,
            session_id: row.try_get("session_id")?,
            results: serde_json::from_value(results)
                .map_err(|e| AppError::MissingData(format!("results: {}", e)))?,
            status,
            attempts: row.try_get("attempts")?,
            device_hash: row.try_get("device_hash")?,
            ip_hash: row.try_get("ip_hash")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
