use axum::{
    extract::{ConnectInfo, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use uuid::Uuid;

use crate::{
    engine::pipeline::VerificationAttempt,
    error::Result,
    middleware_layer::auth::CurrentUser,
    models::attendance::AttendanceStatus,
    services::attendance as attendance_service,
    state::AppState,
    validation::attendance::{validate_blink_count, validate_face_vector},
};

/// The request payload for one verification attempt.
#[derive(Deserialize)]
pub struct VerifyRequest {
    pub session_id: Uuid,
    pub face_vector: Option<Vec<f64>>,
    pub fingerprint: Option<String>,
    pub qr_token: Option<String>,
    pub blink_count: Option<i32>,
    pub device_hash: Option<String>,
    pub ip_hash: Option<String>,
}

/// Fingerprint of the client address, for the audit trail.
fn hash_ip(addr: &SocketAddr) -> String {
    hex::encode(Sha256::digest(addr.ip().to_string().as_bytes()))
}

/// Verifies and marks attendance for the calling student.
#[axum::debug_handler]
pub async fn verify(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<VerifyRequest>,
) -> Result<Response> {
    tracing::info!(
        "🎓 Verification attempt: student {} in session {}",
        user.id,
        req.session_id
    );

    if let Some(ref vector) = req.face_vector {
        validate_face_vector(vector)?;
    }
    if let Some(blinks) = req.blink_count {
        validate_blink_count(blinks)?;
    }

    let ip_hash = req.ip_hash.or_else(|| Some(hash_ip(&addr)));
    let attempt = VerificationAttempt {
        face_vector: req.face_vector,
        fingerprint: req.fingerprint,
        qr_token: req.qr_token,
        blink_count: req.blink_count,
        device_hash: req.device_hash,
        ip_hash,
    };

    let outcome =
        attendance_service::verify_attendance(&state, user.id, req.session_id, attempt).await?;

    let message = if outcome.success {
        "Attendance marked successfully"
    } else {
        "Verification failed"
    };

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "success": outcome.success,
        "status": outcome.status.as_str(),
        "results": {
            "face": {
                "success": outcome.record.results.face.success,
                "confidence": outcome.record.results.face.confidence,
            },
            "fingerprint": outcome.record.results.fingerprint,
            "id_card": outcome.record.results.id_card,
            "liveness": outcome.record.results.liveness,
        },
        "attempts": outcome.record.attempts,
        "message": message,
        "anomalies": outcome.reasons,
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}

/// Reports a session's attendance for the faculty dashboard.
#[axum::debug_handler]
pub async fn session_report(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Response> {
    let report = attendance_service::session_report(&state, session_id).await?;

    let records_json: Vec<_> = report
        .into_iter()
        .map(|(record, name, email)| {
            sonic_rs::json!({
                "id": record.id.to_string(),
                "student": {
                    "id": record.student_id.to_string(),
                    "name": name,
                    "email": email,
                },
                "status": record.status.as_str(),
                "attempts": record.attempts,
                "marked": record.status == AttendanceStatus::Marked,
                "updated_at": record.updated_at.to_rfc3339(),
            })
        })
        .collect();

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "attendance": records_json,
        "count": records_json.len(),
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}

/// Lists every anomaly event with student and session context.
#[axum::debug_handler]
pub async fn anomalies(State(state): State<AppState>) -> Result<Response> {
    let trail = attendance_service::anomaly_trail(&state).await?;

    let events_json: Vec<_> = trail
        .into_iter()
        .map(|(event, name, email, course_id)| {
            sonic_rs::json!({
                "id": event.id.to_string(),
                "student": {
                    "id": event.student_id.to_string(),
                    "name": name,
                    "email": email,
                },
                "session": {
                    "id": event.session_id.to_string(),
                    "course_id": course_id,
                },
                "reason": event.reason,
                "severity": event.severity.as_str(),
                "details": event.details,
                "created_at": event.created_at.to_rfc3339(),
            })
        })
        .collect();

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "anomalies": events_json,
        "count": events_json.len(),
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}

/// The calling student's own attendance history.
#[axum::debug_handler]
pub async fn my_history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response> {
    let history = attendance_service::student_history(&state, user.id).await?;

    let records_json: Vec<_> = history
        .into_iter()
        .map(|(record, course_id, start_time)| {
            sonic_rs::json!({
                "id": record.id.to_string(),
                "session": {
                    "id": record.session_id.to_string(),
                    "course_id": course_id,
                    "start_time": start_time.to_rfc3339(),
                },
                "status": record.status.as_str(),
                "attempts": record.attempts,
                "updated_at": record.updated_at.to_rfc3339(),
            })
        })
        .collect();

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "attendance": records_json,
        "count": records_json.len(),
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}
