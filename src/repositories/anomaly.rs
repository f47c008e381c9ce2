use deadpool_postgres::Pool;
use tokio_postgres::GenericClient;
use uuid::Uuid;
use crate::{
    error::Result,
    models::anomaly::{Anomaly, Severity},
};

/// Appends one anomaly event to the audit trail.
///
/// Generic over the client so it can run inside the attendance write
/// transaction.
pub async fn create_anomaly<C: GenericClient>(
    client: &C,
    student_id: &Uuid,
    session_id: &Uuid,
    reason: &str,
    severity: Severity,
    details: &serde_json::Value,
) -> Result<Anomaly> {
    let row = client
        .query_one(
            r#"
            INSERT INTO anomalies (id, student_id, session_id, reason, severity, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
            &[
                &Uuid::new_v4(),
                student_id,
                session_id,
                &reason,
                &severity.as_str(),
                details,
            ],
        )
        .await?;
    Anomaly::try_from(&row)
}

/// Lists every anomaly event with the student's name/email and the
/// session's course, newest first.
pub async fn list_with_context(
    pool: &Pool,
) -> Result<Vec<(Anomaly, String, String, String)>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT a.*, u.name AS student_name, u.email AS student_email, s.course_id
            FROM anomalies a
            JOIN users u ON u.id = a.student_id
            JOIN class_sessions s ON s.id = a.session_id
            ORDER BY a.created_at DESC
            "#,
            &[],
        )
        .await?;
    rows.iter()
        .map(|r| {
            Ok((
                Anomaly::try_from(r)?,
                r.try_get("student_name")?,
                r.try_get("student_email")?,
                r.try_get("course_id")?,
            ))
        })
        .collect()
}

/// Lists the most recent anomaly events.
pub async fn list_recent(pool: &Pool, limit: i64) -> Result<Vec<Anomaly>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM anomalies
            ORDER BY created_at DESC
            LIMIT $1
            "#,
            &[&limit],
        )
        .await?;
    rows.iter().map(Anomaly::try_from).collect()
}

/// Counts anomaly events per severity for the admin overview.
pub async fn count_by_severity(pool: &Pool) -> Result<Vec<(String, i64)>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT severity, COUNT(*) AS total
            FROM anomalies
            GROUP BY severity
            "#,
            &[],
        )
        .await?;
    rows.iter()
        .map(|r| Ok((r.try_get("severity")?, r.try_get("total")?)))
        .collect()
}
