use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    engine::anomaly::{plan_anomalies, AttemptContext},
    engine::decision::decide,
    engine::pipeline::{run_pipeline, VerificationAttempt},
    error::{AppError, Result},
    models::anomaly::Anomaly,
    models::attendance::{AttendanceRecord, AttendanceStatus},
    repositories::anomaly as anomaly_repo,
    repositories::attendance as attendance_repo,
    repositories::class_session as session_repo,
    repositories::user as user_repo,
    services::live,
    state::AppState,
};

/// What one verification call returns to the student.
#[derive(Debug)]
pub struct VerificationOutcome {
    /// Whether every evaluated factor succeeded.
    pub success: bool,
    /// The overall status written to the record.
    pub status: AttendanceStatus,
    /// The persisted record after this attempt.
    pub record: AttendanceRecord,
    /// Failure reasons, in factor evaluation order.
    pub reasons: Vec<String>,
}

/// Verifies one attendance submission and persists the outcome.
///
/// Guard order matters: a closed session and an already-marked pair are
/// rejected before any factor check runs, so the pipeline never re-evaluates
/// a terminal record. The anomaly detector only observes; the decision is
/// made before it runs and is never altered by it.
pub async fn verify_attendance(
    state: &AppState,
    student_id: Uuid,
    session_id: Uuid,
    attempt: VerificationAttempt,
) -> Result<VerificationOutcome> {
    // 1. Validate the session once, at entry.
    let session = session_repo::find_by_id(&state.db, &session_id)
        .await?
        .filter(|s| s.active)
        .ok_or(AppError::SessionClosed)?;

    // 2. Terminal-state guard, before the pipeline runs.
    let existing = attendance_repo::find_by_pair(&state.db, &student_id, &session_id).await?;
    if let Some(ref record) = existing {
        if record.status == AttendanceStatus::Marked {
            return Err(AppError::AlreadyMarked);
        }
    }

    let student = user_repo::find_by_id(&state.db, &student_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let attempts = existing.as_ref().map(|r| r.attempts + 1).unwrap_or(1);

    // 3. Multi-factor pipeline.
    let outcome = run_pipeline(
        &session.verification_rules,
        &session.policy,
        &student.biometric_profile,
        &session.qr_token,
        &attempt,
        &mut rand::thread_rng(),
    );

    // First-use enrollment side effect on the profile store.
    if let Some(ref vector) = outcome.adopted_face_vector {
        user_repo::update_face_vector(&state.db, &student_id, vector).await?;
        tracing::info!("📸 Enrolled face vector for student {}", student_id);
    }

    // 4. Decision engine.
    let status = decide(&outcome.results, &outcome.reasons, session.policy.severity);

    // 5. Proxy-prevention audit trail.
    let drafts = plan_anomalies(
        status,
        session.policy.severity,
        &AttemptContext {
            attempts,
            results: &outcome.results,
            reasons: &outcome.reasons,
            device_hash: attempt.device_hash.as_deref(),
            ip_hash: attempt.ip_hash.as_deref(),
        },
    );
    // 6. One transaction for the record and its anomaly events. A `None`
    // here means a concurrent submission reached MARKED after our entry
    // guard; surface the same rejection.
    let record = attendance_repo::record_attempt(
        &state.db,
        &student_id,
        &session_id,
        &outcome.results,
        status,
        attempt.device_hash.as_deref(),
        attempt.ip_hash.as_deref(),
        &drafts,
    )
    .await?
    .ok_or(AppError::AlreadyMarked)?;

    if !drafts.is_empty() {
        tracing::warn!(
            "⚠️ Recorded {} anomaly event(s) for student {} in session {} (attempt {})",
            drafts.len(),
            student_id,
            session_id,
            attempts
        );
    }

    if status == AttendanceStatus::Marked {
        tracing::info!(
            "✅ Attendance marked: student {} in session {}",
            student_id,
            session_id
        );
        let redis = state.redis.clone();
        let student_name = student.name.clone();
        tokio::spawn(async move {
            live::publish_attendance_update(redis, session_id, &student_name, status).await;
        });
    }

    Ok(VerificationOutcome {
        success: status == AttendanceStatus::Marked,
        status,
        record,
        reasons: outcome.reasons,
    })
}

/// A session's attendance report for the faculty dashboard.
pub async fn session_report(
    state: &AppState,
    session_id: Uuid,
) -> Result<Vec<(AttendanceRecord, String, String)>> {
    attendance_repo::list_for_session(&state.db, &session_id).await
}

/// The full anomaly trail with student and session context, newest first.
pub async fn anomaly_trail(state: &AppState) -> Result<Vec<(Anomaly, String, String, String)>> {
    anomaly_repo::list_with_context(&state.db).await
}

/// A student's own attendance history across sessions.
pub async fn student_history(
    state: &AppState,
    student_id: Uuid,
) -> Result<Vec<(AttendanceRecord, String, DateTime<Utc>)>> {
    attendance_repo::list_for_student(&state.db, &student_id).await
}
