use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// How suspicious a verification attempt was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// The severity as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }

    /// Parses a severity from its database representation.
    pub fn parse(s: &str) -> Option<Severity> {
        match s {
            "LOW" => Some(Severity::Low),
            "MEDIUM" => Some(Severity::Medium),
            "HIGH" => Some(Severity::High),
            _ => None,
        }
    }
}

/// An append-only audit record for a suspicious verification attempt.
#[derive(Debug, Clone)]
pub struct Anomaly {
    /// The unique identifier for the event.
    pub id: Uuid,
    /// The student whose attempt triggered the event.
    pub student_id: Uuid,
    /// The session the attempt targeted.
    pub session_id: Uuid,
    /// Joined descriptions of the failed factors.
    pub reason: String,
    /// How suspicious the attempt was.
    pub severity: Severity,
    /// Triggering context: factor results, device/IP, attempt count.
    pub details: serde_json::Value,
    /// The timestamp when the event was recorded.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Row> for Anomaly {
    type Error = AppError;

    fn try_from(row: &Row) -> Result<Self> {
        let severity_str: String = row.try_get("severity")?;
        let severity = Severity::parse(&severity_str)
            .ok_or_else(|| AppError::MissingData(format!("severity: {}", severity_str)))?;

        Ok(Self {
            id: row.try_get("id")?,
            student_id: row.try_get("student_id")?,
            session_id: row.try_get("session_id")?,
            reason: row.try_get("reason")?,
            severity,
            details: row.try_get("details")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
