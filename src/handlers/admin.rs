use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    error::Result,
    repositories::{anomaly as anomaly_repo, attendance as attendance_repo,
        class_session as session_repo, user as user_repo},
    state::AppState,
};

/// How many recent anomalies the overview includes.
const RECENT_ANOMALY_LIMIT: i64 = 20;

/// Aggregate stats for the admin dashboard.
#[axum::debug_handler]
pub async fn overview(State(state): State<AppState>) -> Result<Response> {
    let users = user_repo::count_by_role(&state.db).await?;
    let (total_sessions, active_sessions) = session_repo::session_counts(&state.db).await?;
    let attendance = attendance_repo::count_by_status(&state.db).await?;
    let anomalies = anomaly_repo::count_by_severity(&state.db).await?;
    let recent = anomaly_repo::list_recent(&state.db, RECENT_ANOMALY_LIMIT).await?;

    let users_json: Vec<_> = users
        .into_iter()
        .map(|(role, total)| sonic_rs::json!({ "role": role, "total": total }))
        .collect();

    let attendance_json: Vec<_> = attendance
        .into_iter()
        .map(|(status, total)| sonic_rs::json!({ "status": status, "total": total }))
        .collect();

    let anomalies_json: Vec<_> = anomalies
        .into_iter()
        .map(|(severity, total)| sonic_rs::json!({ "severity": severity, "total": total }))
        .collect();

    let recent_json: Vec<_> = recent
        .into_iter()
        .map(|a| {
            sonic_rs::json!({
                "id": a.id.to_string(),
                "student_id": a.student_id.to_string(),
                "session_id": a.session_id.to_string(),
                "reason": a.reason,
                "severity": a.severity.as_str(),
                "created_at": a.created_at.to_rfc3339(),
            })
        })
        .collect();

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "users": users_json,
        "sessions": {
            "total": total_sessions,
            "active": active_sessions,
        },
        "attendance": attendance_json,
        "anomalies": anomalies_json,
        "recent_anomalies": recent_json,
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}
