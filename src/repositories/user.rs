use deadpool_postgres::Pool;
use uuid::Uuid;
use crate::{
    error::Result,
    models::user::{BiometricProfile, Role, User},
};

/// Creates a new user in the database.
pub async fn create_user(
    pool: &Pool,
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: Role,
    profile: BiometricProfile,
    consent_accepted: bool,
) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO users (id, name, email, password, role, face_vector, fingerprint_hash, consent_accepted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
            &[
                &id,
                &name,
                &email,
                &password_hash,
                &role.as_str(),
                &profile.face_vector,
                &profile.fingerprint_hash,
                &consent_accepted,
            ],
        )
        .await?;
    User::try_from(&row)
}

/// Finds a user by their email address.
pub async fn find_by_email(pool: &Pool, email: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM users
            WHERE email = $1
            "#,
            &[&email],
        )
        .await?;
    row.as_ref().map(User::try_from).transpose()
}

/// Finds a user by their ID.
pub async fn find_by_id(pool: &Pool, user_id: &Uuid) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM users
            WHERE id = $1
            "#,
            &[user_id],
        )
        .await?;
    row.as_ref().map(User::try_from).transpose()
}

/// Whether any user holds the given role.
pub async fn role_exists(pool: &Pool, role: Role) -> Result<bool> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE role = $1) AS present
            "#,
            &[&role.as_str()],
        )
        .await?;
    Ok(row.try_get("present")?)
}

/// Stores a student's face vector (first-use enrollment side effect).
pub async fn update_face_vector(pool: &Pool, user_id: &Uuid, vector: &[f64]) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            r#"
            UPDATE users
            SET face_vector = $1, updated_at = NOW()
            WHERE id = $2
            "#,
            &[&vector, user_id],
        )
        .await?;
    Ok(())
}

/// Counts users per role for the admin overview.
pub async fn count_by_role(pool: &Pool) -> Result<Vec<(String, i64)>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT role, COUNT(*) AS total
            FROM users
            GROUP BY role
            "#,
            &[],
        )
        .await?;
    rows.iter()
        .map(|r| Ok((r.try_get("role")?, r.try_get("total")?)))
        .collect()
}
