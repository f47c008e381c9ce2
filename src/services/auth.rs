use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use deadpool_postgres::Pool;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::engine::similarity::generate_face_vector;
use crate::error::{AppError, Result};
use crate::models::user::{BiometricProfile, Role, User};
use crate::repositories::user as user_repo;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the hashed password.
fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    tracing::debug!("Password hashed successfully with Argon2");
    Ok(password_hash)
}

/// Verifies a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Hash parse error: {}", e)))?;
    let argon2 = Argon2::default();
    let result = argon2.verify_password(&password_bytes, &parsed_hash).is_ok();

    password_bytes.zeroize();
    Ok(result)
}

/// Simulated fingerprint reference hash, derived from the email.
fn generate_fingerprint_hash(email: &str) -> String {
    hex::encode(Sha256::digest(email.as_bytes()))
}

/// Registers a new user.
///
/// Students get a simulated biometric profile seeded at registration.
/// At most one admin account may exist.
///
/// # Arguments
///
/// * `db` - The database connection pool.
/// * `name` - The user's full name.
/// * `email` - The user's email address.
/// * `password` - The user's password.
/// * `role` - The requested role.
/// * `consent_accepted` - Whether the biometric consent terms were accepted.
///
/// # Returns
///
/// A `Result` containing the created `User`.
pub async fn register_user(
    db: &Pool,
    name: String,
    email: String,
    password: String,
    role: Role,
    consent_accepted: bool,
) -> Result<User> {
    tracing::debug!("🔐 Registering user: {}", email);

    if let Some(existing) = user_repo::find_by_email(db, &email).await? {
        if existing.role == role {
            return Err(AppError::Validation(
                "You are already registered. Please go to login.".to_string(),
            ));
        }
        return Err(AppError::Validation(format!(
            "This email is already registered as {}",
            existing.role.as_str()
        )));
    }

    if role == Role::Admin && user_repo::role_exists(db, Role::Admin).await? {
        return Err(AppError::Validation(
            "Administrator account already exists. Only one admin is allowed.".to_string(),
        ));
    }

    let hashed_password = hash_password(&password)?;

    let profile = if role == Role::Student {
        BiometricProfile {
            face_vector: Some(generate_face_vector(&mut rand::thread_rng())),
            fingerprint_hash: Some(generate_fingerprint_hash(&email)),
        }
    } else {
        BiometricProfile::default()
    };

    let user = user_repo::create_user(
        db,
        Uuid::new_v4(),
        name,
        email,
        hashed_password,
        role,
        profile,
        consent_accepted,
    )
    .await?;

    tracing::info!("✅ User created with ID: {}", user.id);
    Ok(user)
}

/// Authenticates a user by email and password.
pub async fn authenticate_user(db: &Pool, email: String, password: String) -> Result<User> {
    tracing::debug!("🔐 Authenticating user: {}", email);

    let user = user_repo::find_by_email(db, &email)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

    if !verify_password(&password, &user.password)? {
        return Err(AppError::Authentication("Invalid credentials".to_string()));
    }

    tracing::info!("✅ User authenticated: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("SecurePass123!").unwrap();
        assert!(verify_password("SecurePass123!", &hash).unwrap());
        assert!(!verify_password("WrongPass123!", &hash).unwrap());
    }

    #[test]
    fn fingerprint_hash_is_deterministic() {
        let a = generate_fingerprint_hash("student@example.edu");
        let b = generate_fingerprint_hash("student@example.edu");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, generate_fingerprint_hash("other@example.edu"));
    }
}
