//! One-way password hashing. bcrypt is the pluggable hash here; callers
//! only ever see `hash_password`/`verify_password`.

use crate::error::AppError;

/// Matches the cost the original deployment used; raising it invalidates no
/// stored hash (bcrypt embeds the cost).
const PASSWORD_COST: u32 = 10;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, PASSWORD_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    bcrypt::verify(password, hash)
        .map_err(|e| AppError::Internal(format!("password verification failed: {e}")))
}
