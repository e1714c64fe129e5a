//! Seller onboarding and lifecycle.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{Email, Role, SellerStatus, UserId};

use super::ServiceError;
use super::auth::{self, AuthError};
use super::email::EmailService;
use super::notifier::Notifier;
use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::Identity;
use crate::models::event::{EventKind, NewEvent};
use crate::models::notification::Recipient;
use crate::models::user::{NewUser, User};

/// Public seller application.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub business_name: String,
    pub gender: Option<String>,
    pub phone: Option<String>,
}

/// Admin status change.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerStatusUpdate {
    pub status: SellerStatus,
    /// Defaults to `true` for `ACTIVE` and `false` otherwise.
    pub is_active: Option<bool>,
}

/// Seller operations.
pub struct SellerService<'a> {
    users: UserRepository<'a>,
    notifier: Notifier<'a>,
}

impl<'a> SellerService<'a> {
    /// Create a new seller service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: Option<&'a EmailService>) -> Self {
        Self {
            users: UserRepository::new(pool),
            notifier: Notifier::new(pool, email),
        }
    }

    /// Create an inactive seller account awaiting approval.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for blank names, a bad email or a
    /// weak password.
    /// Returns `ServiceError::Conflict` if the email is registered.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn submit_request(&self, request: SellerRequest) -> Result<User, ServiceError> {
        let name = required(&request.name, "name")?;
        let business_name = required(&request.business_name, "businessName")?;
        let email = Email::parse(&request.email)
            .map_err(|e| ServiceError::Validation(format!("invalid email: {e}")))?;
        let password_hash = auth::validate_password(&request.password)
            .and_then(|()| auth::hash_password(&request.password))
            .map_err(|e| match e {
                AuthError::WeakPassword(msg) => ServiceError::Validation(msg),
                other => ServiceError::Validation(other.to_string()),
            })?;

        let status = SellerStatus::Inactive;
        let user = self
            .users
            .create(&NewUser {
                name,
                email,
                password_hash,
                role: Role::Seller,
                business_name: Some(business_name),
                gender: optional(request.gender.as_deref()),
                phone: optional(request.phone.as_deref()),
                seller_status: Some(status),
                is_active: status.default_is_active(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ServiceError::Conflict(
                    "an account with this email already exists".to_string(),
                ),
                other => other.into(),
            })?;

        tracing::info!(user_id = %user.id, "Seller request submitted");

        self.notifier
            .notify(
                Recipient::Role(Role::Admin),
                &format!(
                    "New seller request from {}",
                    user.business_name.as_deref().unwrap_or(&user.name)
                ),
                None,
            )
            .await;

        Ok(user)
    }

    /// Sellers, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    pub async fn list(
        &self,
        caller: &Identity,
        status: Option<SellerStatus>,
    ) -> Result<Vec<User>, ServiceError> {
        if !caller.is_admin() {
            return Err(ServiceError::forbidden("only admins can list sellers"));
        }
        Ok(self.users.list_sellers(status).await?)
    }

    /// Change a seller's status. Product visibility follows `is_active` in
    /// the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    /// Returns `ServiceError::NotFound` if no seller has this ID.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn update_status(
        &self,
        caller: &Identity,
        seller_id: UserId,
        update: SellerStatusUpdate,
    ) -> Result<User, ServiceError> {
        if !caller.is_admin() {
            return Err(ServiceError::forbidden("only admins can change seller status"));
        }

        let is_active = update
            .is_active
            .unwrap_or_else(|| update.status.default_is_active());
        let event = NewEvent::new(EventKind::SellerStatusChanged, Some(caller.user_id))
            .with_payload(serde_json::json!({
                "sellerId": seller_id,
                "status": update.status,
                "isActive": is_active,
            }));

        let seller = self
            .users
            .update_seller_status(seller_id, update.status, is_active, &event)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ServiceError::not_found("seller"),
                other => other.into(),
            })?;

        tracing::info!(seller_id = %seller.id, status = %update.status, is_active, "Seller status changed");

        self.notifier
            .notify(
                Recipient::User(seller.id),
                &format!("Your seller account is now {}", update.status),
                None,
            )
            .await;
        self.notifier
            .seller_status(seller.email.as_str(), &seller.name, update.status, is_active)
            .await;

        Ok(seller)
    }
}

fn required(value: &str, field: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    Ok(value.to_owned())
}

fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  Shop  ", "name").unwrap(), "Shop");
        assert!(matches!(
            required("   ", "businessName"),
            Err(ServiceError::Validation(ref m)) if m == "businessName is required"
        ));
    }

    #[test]
    fn test_optional_drops_blank() {
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(Some(" 555 ")), Some("555".to_string()));
        assert_eq!(optional(None), None);
    }

    #[test]
    fn test_status_update_defaults_active_flag() {
        let update: SellerStatusUpdate =
            serde_json::from_str(r#"{"status":"suspended"}"#).unwrap();
        assert_eq!(update.status, SellerStatus::Suspended);
        assert!(update.is_active.is_none());
        assert!(!update.status.default_is_active());
    }
}
