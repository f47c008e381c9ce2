use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::{
    error::Result,
    models::user::Role,
    services::auth as auth_service,
    state::AppState,
    validation::auth::*,
};

/// The request payload for user registration.
#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub consent_accepted: bool,
}

/// The request payload for user login.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt for: {}", payload.email);
    validate_name(&payload.name)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    let user = auth_service::register_user(
        &state.db,
        payload.name,
        payload.email,
        payload.password,
        payload.role,
        payload.consent_accepted,
    )
    .await?;

    let token = state.jwt.generate_token(user.id, user.role)?;
    tracing::info!("✅ User registered: {}", user.id);

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "id": user.id.to_string(),
        "name": user.name,
        "email": user.email,
        "role": user.role.as_str(),
        "token": token,
    }))
    .unwrap();

    Ok((StatusCode::CREATED, response).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt for: {}", payload.email);
    validate_email(&payload.email)?;

    let user = auth_service::authenticate_user(&state.db, payload.email, payload.password).await?;

    let token = state.jwt.generate_token(user.id, user.role)?;
    tracing::info!("✅ User logged in: {}", user.id);

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "id": user.id.to_string(),
        "name": user.name,
        "email": user.email,
        "role": user.role.as_str(),
        "token": token,
        "message": "Login successful",
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}

/// Reports whether an admin account exists yet.
#[axum::debug_handler]
pub async fn check_admin(State(state): State<AppState>) -> Result<Response> {
    let exists = crate::repositories::user::role_exists(&state.db, Role::Admin).await?;

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "exists": exists,
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}
