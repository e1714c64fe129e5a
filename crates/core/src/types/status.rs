//! Role and status enums.
//!
//! Roles arrive from tokens, forms and seed files in whatever case the
//! client happened to use. They are parsed once at the boundary into a closed
//! enum so no downstream code ever compares role strings.

use serde::{Deserialize, Serialize};

/// Error returned when a role or status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Marketplace user role. Determines authorization on every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Shops, owns a cart and their own orders.
    #[default]
    #[serde(alias = "buyer", alias = "Buyer")]
    Buyer,
    /// Lists products and manages orders containing them.
    #[serde(alias = "seller", alias = "Seller")]
    Seller,
    /// Full access, confirms payments and approves sellers.
    #[serde(alias = "admin", alias = "Admin")]
    Admin,
}

impl Role {
    /// Canonical upper-case name, as stored and serialised.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "BUYER",
            Self::Seller => "SELLER",
            Self::Admin => "ADMIN",
        }
    }

    /// Admins and sellers may use the order-management endpoints.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Seller)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUYER" => Ok(Self::Buyer),
            "SELLER" => Ok(Self::Seller),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(ParseStatusError::new("role", s)),
        }
    }
}

/// Seller onboarding status, managed by admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.seller_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SellerStatus {
    /// Request submitted, not yet approved.
    #[default]
    #[serde(alias = "inactive", alias = "Inactive")]
    Inactive,
    /// Approved; products are visible.
    #[serde(alias = "active", alias = "Active")]
    Active,
    /// Blocked by an admin; products are hidden.
    #[serde(alias = "suspended", alias = "Suspended")]
    Suspended,
}

impl SellerStatus {
    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
        }
    }

    /// The `is_active` flag implied by this status when the admin does not
    /// set one explicitly.
    #[must_use]
    pub const fn default_is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SellerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SellerStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INACTIVE" => Ok(Self::Inactive),
            "ACTIVE" => Ok(Self::Active),
            "SUSPENDED" => Ok(Self::Suspended),
            _ => Err(ParseStatusError::new("seller status", s)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" Seller ".parse::<Role>().unwrap(), Role::Seller);
        assert_eq!("buyer".parse::<Role>().unwrap(), Role::Buyer);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Seller).unwrap(), "\"SELLER\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_role_is_staff() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Seller.is_staff());
        assert!(!Role::Buyer.is_staff());
    }

    #[test]
    fn test_seller_status_default_is_active() {
        assert!(SellerStatus::Active.default_is_active());
        assert!(!SellerStatus::Inactive.default_is_active());
        assert!(!SellerStatus::Suspended.default_is_active());
    }

    #[test]
    fn test_seller_status_parse() {
        assert_eq!(
            "suspended".parse::<SellerStatus>().unwrap(),
            SellerStatus::Suspended
        );
        let err = "paused".parse::<SellerStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid seller status: paused");
    }
}
