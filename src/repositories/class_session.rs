use deadpool_postgres::Pool;
use uuid::Uuid;
use crate::{
    engine::policy::VerificationPolicy,
    error::{AppError, Result},
    models::class_session::{ClassSession, FactorRules},
};

/// Creates a new active class session.
pub async fn create_session(
    pool: &Pool,
    id: Uuid,
    course_id: String,
    faculty_id: Uuid,
    rules: FactorRules,
    policy: VerificationPolicy,
    qr_token: String,
) -> Result<ClassSession> {
    let client = pool.get().await?;
    let rules_json = serde_json::to_value(rules)
        .map_err(|e| AppError::Internal(format!("Rules serialization failed: {}", e)))?;
    let policy_json = serde_json::to_value(policy)
        .map_err(|e| AppError::Internal(format!("Policy serialization failed: {}", e)))?;

    let row = client
        .query_one(
            r#"
            INSERT INTO class_sessions (id, course_id, faculty_id, verification_rules, policy, qr_token, active)
            VALUES ($1, $2, $3, $4, $5, $6, true)
            RETURNING *
            "#,
            &[&id, &course_id, &faculty_id, &rules_json, &policy_json, &qr_token],
        )
        .await?;
    ClassSession::try_from(&row)
}

/// Finds a session by its ID.
pub async fn find_by_id(pool: &Pool, session_id: &Uuid) -> Result<Option<ClassSession>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM class_sessions
            WHERE id = $1
            "#,
            &[session_id],
        )
        .await?;
    row.as_ref().map(ClassSession::try_from).transpose()
}

/// Deactivates a session and stamps its end time.
pub async fn end_session(pool: &Pool, session_id: &Uuid) -> Result<Option<ClassSession>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE class_sessions
            SET active = false, end_time = NOW()
            WHERE id = $1
            RETURNING *
            "#,
            &[session_id],
        )
        .await?;
    row.as_ref().map(ClassSession::try_from).transpose()
}

/// Lists active sessions with the owning faculty member's name.
pub async fn list_active(pool: &Pool) -> Result<Vec<(ClassSession, String)>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT s.*, u.name AS faculty_name
            FROM class_sessions s
            JOIN users u ON u.id = s.faculty_id
            WHERE s.active = true
            ORDER BY s.start_time DESC
            "#,
            &[],
        )
        .await?;
    rows.iter()
        .map(|r| Ok((ClassSession::try_from(r)?, r.try_get("faculty_name")?)))
        .collect()
}

/// Counts sessions, split into active and total, for the admin overview.
pub async fn session_counts(pool: &Pool) -> Result<(i64, i64)> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE active) AS active
            FROM class_sessions
            "#,
            &[],
        )
        .await?;
    Ok((row.try_get("total")?, row.try_get("active")?))
}
