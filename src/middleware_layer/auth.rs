use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{models::user::Role, state::AppState};

/// The authenticated caller, injected into request extensions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CurrentUser {
    /// The user's ID.
    pub id: Uuid,
    /// The user's role.
    pub role: Role,
}

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// A middleware that requires a valid bearer token.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response` or an error `StatusCode`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_bearer_token(&request).ok_or_else(|| {
        tracing::warn!("❌ No bearer token found");
        StatusCode::UNAUTHORIZED
    })?;

    let claims = state.jwt.validate_token(token).map_err(|_| {
        tracing::warn!("❌ Invalid or expired token");
        StatusCode::UNAUTHORIZED
    })?;

    tracing::debug!("✅ User authenticated: {}", claims.sub);

    request.extensions_mut().insert(CurrentUser {
        id: claims.sub,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// A middleware that restricts a route to faculty members.
/// Must run after `require_auth`.
pub async fn require_faculty(
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    require_role(request, next, Role::Faculty).await
}

/// A middleware that restricts a route to students.
/// Must run after `require_auth`.
pub async fn require_student(
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    require_role(request, next, Role::Student).await
}

/// A middleware that restricts a route to the admin.
/// Must run after `require_auth`.
pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    require_role(request, next, Role::Admin).await
}

/// A middleware that restricts a route to faculty members or the admin.
/// Must run after `require_auth`.
pub async fn require_staff(request: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !matches!(user.role, Role::Faculty | Role::Admin) {
        tracing::warn!(
            "❌ Role check failed: staff required, {} present",
            user.role.as_str()
        );
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}

async fn require_role(
    request: Request<Body>,
    next: Next,
    role: Role,
) -> Result<Response, StatusCode> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if user.role != role {
        tracing::warn!(
            "❌ Role check failed: {} required, {} present",
            role.as_str(),
            user.role.as_str()
        );
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}
