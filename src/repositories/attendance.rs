use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use uuid::Uuid;
use crate::{
    engine::anomaly::AnomalyDraft,
    error::{AppError, Result},
    models::attendance::{AttendanceRecord, AttendanceStatus, FactorResults},
    repositories::anomaly as anomaly_repo,
};

/// Finds the attendance record for a (student, session) pair, if any.
pub async fn find_by_pair(
    pool: &Pool,
    student_id: &Uuid,
    session_id: &Uuid,
) -> Result<Option<AttendanceRecord>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM attendance
            WHERE student_id = $1 AND session_id = $2
            "#,
            &[student_id, session_id],
        )
        .await?;
    row.as_ref().map(AttendanceRecord::try_from).transpose()
}

/// Atomically writes the outcome of one verification attempt together with
/// its anomaly events.
///
/// The unique constraint on (student_id, session_id) plus the conditional
/// update guarantee at most one row per pair and leave a MARKED row
/// untouched, even under concurrent duplicate submissions. Returns `None`
/// when the row already reached MARKED; in that case the transaction is
/// rolled back and no anomaly events are written either.
pub async fn record_attempt(
    pool: &Pool,
    student_id: &Uuid,
    session_id: &Uuid,
    results: &FactorResults,
    status: AttendanceStatus,
    device_hash: Option<&str>,
    ip_hash: Option<&str>,
    anomalies: &[AnomalyDraft],
) -> Result<Option<AttendanceRecord>> {
    let mut client = pool.get().await?;
    let results_json = serde_json::to_value(results)
        .map_err(|e| AppError::Internal(format!("Results serialization failed: {}", e)))?;

    let tx = client.transaction().await?;

    let row = tx
        .query_opt(
            r#"
            INSERT INTO attendance (id, student_id, session_id, results, status, attempts, device_hash, ip_hash)
            VALUES ($1, $2, $3, $4, $5, 1, $6, $7)
            ON CONFLICT (student_id, session_id) DO UPDATE SET
                results = EXCLUDED.results,
                status = EXCLUDED.status,
                attempts = attendance.attempts + 1,
                device_hash = EXCLUDED.device_hash,
                ip_hash = EXCLUDED.ip_hash,
                updated_at = NOW()
            WHERE attendance.status <> 'MARKED'
            RETURNING *
            "#,
            &[
                &Uuid::new_v4(),
                student_id,
                session_id,
                &results_json,
                &status.as_str(),
                &device_hash,
                &ip_hash,
            ],
        )
        .await?;

    let Some(row) = row else {
        // Lost the race against a concurrent MARKED write; dropping the
        // transaction rolls everything back.
        return Ok(None);
    };

    for draft in anomalies {
        anomaly_repo::create_anomaly(
            &*tx,
            student_id,
            session_id,
            &draft.reason,
            draft.severity,
            &draft.details,
        )
        .await?;
    }

    tx.commit().await?;
    AttendanceRecord::try_from(&row).map(Some)
}

/// Lists a session's attendance with each student's name and email.
pub async fn list_for_session(
    pool: &Pool,
    session_id: &Uuid,
) -> Result<Vec<(AttendanceRecord, String, String)>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT a.*, u.name AS student_name, u.email AS student_email
            FROM attendance a
            JOIN users u ON u.id = a.student_id
            WHERE a.session_id = $1
            ORDER BY a.updated_at DESC
            "#,
            &[session_id],
        )
        .await?;
    rows.iter()
        .map(|r| {
            Ok((
                AttendanceRecord::try_from(r)?,
                r.try_get("student_name")?,
                r.try_get("student_email")?,
            ))
        })
        .collect()
}

/// Lists a student's attendance history with each session's course and
/// start time, newest first.
pub async fn list_for_student(
    pool: &Pool,
    student_id: &Uuid,
) -> Result<Vec<(AttendanceRecord, String, DateTime<Utc>)>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT a.*, s.course_id, s.start_time
            FROM attendance a
            JOIN class_sessions s ON s.id = a.session_id
            WHERE a.student_id = $1
            ORDER BY a.created_at DESC
            "#,
            &[student_id],
        )
        .await?;
    rows.iter()
        .map(|r| {
            Ok((
                AttendanceRecord::try_from(r)?,
                r.try_get("course_id")?,
                r.try_get("start_time")?,
            ))
        })
        .collect()
}

/// Counts attendance records per status for the admin overview.
pub async fn count_by_status(pool: &Pool) -> Result<Vec<(String, i64)>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT status, COUNT(*) AS total
            FROM attendance
            GROUP BY status
            "#,
            &[],
        )
        .await?;
    rows.iter()
        .map(|r| Ok((r.try_get("status")?, r.try_get("total")?)))
        .collect()
}
