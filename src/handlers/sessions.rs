use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    engine::policy::VerificationPolicy,
    error::{AppError, Result},
    middleware_layer::auth::CurrentUser,
    models::class_session::{ClassSession, FactorRules},
    services::{live, sessions as session_service},
    state::AppState,
};

/// The request payload for starting a session.
#[derive(Deserialize)]
pub struct StartSessionRequest {
    pub course_id: String,
    #[serde(default)]
    pub verification_rules: FactorRules,
    #[serde(default)]
    pub policy: VerificationPolicy,
}

fn session_json(session: &ClassSession, faculty_name: Option<&str>) -> sonic_rs::Value {
    sonic_rs::json!({
        "id": session.id.to_string(),
        "course_id": session.course_id,
        "faculty_id": session.faculty_id.to_string(),
        "faculty_name": faculty_name,
        "verification_rules": {
            "face": session.verification_rules.face,
            "fingerprint": session.verification_rules.fingerprint,
            "id_card": session.verification_rules.id_card,
            "liveness": session.verification_rules.liveness,
        },
        "qr_token": session.qr_token,
        "active": session.active,
        "start_time": session.start_time.to_rfc3339(),
        "end_time": session.end_time.map(|t| t.to_rfc3339()),
    })
}

/// Starts a new class session.
#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<StartSessionRequest>,
) -> Result<Response> {
    if req.course_id.trim().is_empty() || req.course_id.len() > 100 {
        return Err(AppError::Validation(
            "Course ID must be between 1 and 100 characters".to_string(),
        ));
    }

    let session = session_service::start_session(
        &state,
        user.id,
        req.course_id,
        req.verification_rules,
        req.policy,
    )
    .await?;

    let redis = state.redis.clone();
    let session_id = session.id;
    tokio::spawn(async move {
        live::publish_session_event(redis, "sessionStarted", session_id).await;
    });

    let response = sonic_rs::to_string(&session_json(&session, None)).unwrap();
    Ok((StatusCode::CREATED, response).into_response())
}

/// Ends a session owned by the calling faculty member.
#[axum::debug_handler]
pub async fn end_session(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Response> {
    let session = session_service::end_session(&state, user.id, session_id).await?;

    let redis = state.redis.clone();
    tokio::spawn(async move {
        live::publish_session_event(redis, "sessionEnded", session_id).await;
    });

    let response = sonic_rs::to_string(&session_json(&session, None)).unwrap();
    Ok((StatusCode::OK, response).into_response())
}

/// Lists active sessions.
#[axum::debug_handler]
pub async fn active_sessions(State(state): State<AppState>) -> Result<Response> {
    let sessions = session_service::active_sessions(&state).await?;

    let sessions_json: Vec<_> = sessions
        .into_iter()
        .map(|(session, faculty_name)| session_json(&session, Some(&faculty_name)))
        .collect();

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "sessions": sessions_json,
        "count": sessions_json.len(),
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}
