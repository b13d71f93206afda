use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewUser, User};
use crate::store::{Constraint, Store, StoreError};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::validation("password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::validation("password must contain at least one digit"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.len() < 3 || username.len() > 30 {
        return Err(AppError::validation("username must be between 3 and 30 characters"));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::validation(
            "username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(())
}

pub fn create_user(store: &dyn Store, username: &str, email: &str, password: &str) -> AppResult<User> {
    validate_username(username)?;
    validate_password(password)?;

    let new_user = NewUser {
        username: username.to_string(),
        email: email.trim().to_lowercase(),
        password_hash: hash_password(password)?,
    };

    let user = store.create_user(new_user).map_err(|e| match e {
        StoreError::Conflict(Constraint::Username) => {
            AppError::new(ErrorCode::UsernameTaken, "username is already taken")
        }
        StoreError::Conflict(Constraint::Email) => {
            AppError::new(ErrorCode::EmailTaken, "email is already registered")
        }
        other => other.into(),
    })?;

    tracing::info!(user_id = user.id, username = %user.username, "user created");
    Ok(user)
}

pub fn get_user(store: &dyn Store, id: i32) -> AppResult<User> {
    store
        .get_user(id)?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, format!("user {id} not found")))
}

/// Fails with `UserNotFound` unless `id` names an existing user.
pub fn require_user(store: &dyn Store, id: i32) -> AppResult<()> {
    get_user(store, id).map(|_| ())
}
