use rand::Rng;
use uuid::Uuid;

use crate::{
    engine::policy::VerificationPolicy,
    error::{AppError, Result},
    models::class_session::{ClassSession, FactorRules},
    repositories::class_session as session_repo,
    state::AppState,
};

/// Length of the generated session token.
const QR_TOKEN_LEN: usize = 6;

/// Generates the short uppercase token students present for the id-card
/// factor.
fn generate_qr_token<R: Rng>(rng: &mut R) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    (0..QR_TOKEN_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Starts a new class session owned by the calling faculty member.
///
/// The verification policy is resolved here, once, and stays fixed for the
/// session's lifetime.
pub async fn start_session(
    state: &AppState,
    faculty_id: Uuid,
    course_id: String,
    rules: FactorRules,
    policy: VerificationPolicy,
) -> Result<ClassSession> {
    let qr_token = generate_qr_token(&mut rand::thread_rng());
    let session = session_repo::create_session(
        &state.db,
        Uuid::new_v4(),
        course_id,
        faculty_id,
        rules,
        policy,
        qr_token,
    )
    .await?;

    tracing::info!("✅ Session started: {} ({})", session.id, session.course_id);
    Ok(session)
}

/// Ends a session. Only the owning faculty member may end it.
pub async fn end_session(
    state: &AppState,
    faculty_id: Uuid,
    session_id: Uuid,
) -> Result<ClassSession> {
    let session = session_repo::find_by_id(&state.db, &session_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if session.faculty_id != faculty_id {
        return Err(AppError::Unauthorized);
    }

    let ended = session_repo::end_session(&state.db, &session_id)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!("✅ Session ended: {}", ended.id);
    Ok(ended)
}

/// Lists active sessions with the owning faculty member's name.
pub async fn active_sessions(state: &AppState) -> Result<Vec<(ClassSession, String)>> {
    session_repo::list_active(&state.db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn qr_tokens_are_short_uppercase_alphanumerics() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..32 {
            let token = generate_qr_token(&mut rng);
            assert_eq!(token.len(), QR_TOKEN_LEN);
            assert!(token
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn qr_tokens_vary() {
        let mut rng = StdRng::seed_from_u64(2);
        let a = generate_qr_token(&mut rng);
        let b = generate_qr_token(&mut rng);
        assert_ne!(a, b);
    }
}
