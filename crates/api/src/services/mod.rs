//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password registration/login and bearer tokens
//! - `cart` - Cart resolution for users and anonymous visitors
//! - `orders` - Checkout, direct creation, role-scoped listing
//! - `payments` - Out-of-band payment confirmation workflow
//! - `sellers` - Seller onboarding and status changes
//! - `catalog` - Products, categories and reviews
//! - `messaging` - Notifications and chat
//! - `notifier` - Best-effort notification and email fan-out
//! - `email` - SMTP delivery
//!
//! Every operation takes the caller as an explicit `&Identity` or
//! `Option<&Identity>` argument.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod email;
pub mod messaging;
pub mod notifier;
pub mod orders;
pub mod payments;
pub mod sellers;

use thiserror::Error;

use marketplace_core::{GuestInfoError, PaymentStageError};

use crate::db::RepositoryError;

/// Errors returned by service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Role or ownership mismatch.
    #[error("{0}")]
    Forbidden(String),

    /// The request is well-formed but not acceptable.
    #[error("{0}")]
    Validation(String),

    /// Uniqueness conflict.
    #[error("{0}")]
    Conflict(String),

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub(crate) fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub(crate) fn forbidden(msg: &str) -> Self {
        Self::Forbidden(msg.to_string())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<PaymentStageError> for ServiceError {
    fn from(err: PaymentStageError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<GuestInfoError> for ServiceError {
    fn from(err: GuestInfoError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_errors_are_validation() {
        let err = ServiceError::from(PaymentStageError::AlreadyPaid);
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "order has already been paid"));
    }

    #[test]
    fn test_guest_errors_are_validation() {
        let err = ServiceError::from(GuestInfoError::MissingFirstName);
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(ServiceError::not_found("order").to_string(), "order not found");
    }
}
