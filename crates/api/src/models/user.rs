//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{Email, Role, SellerStatus, UserId};

use super::Identity;

/// A marketplace user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub business_name: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub seller_status: Option<SellerStatus>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The identity a token issued for this user carries.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            name: self.name.clone(),
            email: self.email.as_str().to_owned(),
            role: self.role,
        }
    }
}

/// Fields for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub business_name: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub seller_status: Option<SellerStatus>,
    pub is_active: bool,
}
