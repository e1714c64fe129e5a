//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! mp-cli admin create -e admin@example.com -n "Admin Name" -p 'a long passphrase'
//! ```

use marketplace_api::db::RepositoryError;
use marketplace_api::db::users::UserRepository;
use marketplace_api::models::user::NewUser;
use marketplace_api::services::auth::{self, AuthError};
use marketplace_core::{Email, Role, UserId};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password rejected or could not be hashed.
    #[error("{0}")]
    Password(#[from] AuthError),

    /// User already exists.
    #[error("A user already exists with email: {0}")]
    UserExists(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Create a new active admin user.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `AdminError` for an invalid email or weak password, a duplicate
/// email, or a database failure.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    auth::validate_password(password)?;
    let password_hash = auth::hash_password(password)?;

    let pool = connect().await?;

    tracing::info!("Creating admin user: {}", email);

    let user = UserRepository::new(&pool)
        .create(&NewUser {
            name: name.trim().to_owned(),
            email: email.clone(),
            password_hash,
            role: Role::Admin,
            business_name: None,
            gender: None,
            phone: None,
            seller_status: None,
            is_active: true,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}
