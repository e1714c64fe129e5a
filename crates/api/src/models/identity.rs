//! The authenticated caller.

use serde::{Deserialize, Serialize};

use marketplace_core::{Role, UserId};

/// Identity resolved from a bearer token.
///
/// Resolved once by the auth extractor and passed explicitly to every
/// service operation; services never read ambient request state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.role == Role::Seller
    }

    /// Whether the caller may act on a record owned by `owner`.
    ///
    /// Admins may act on anything. Records without an owner (guest orders)
    /// are open to any caller.
    #[must_use]
    pub fn may_access(&self, owner: Option<UserId>) -> bool {
        self.is_admin() || owner.is_none_or(|owner| owner == self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: i32, role: Role) -> Identity {
        Identity {
            user_id: UserId::new(id),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_may_access() {
        let buyer = identity(1, Role::Buyer);
        assert!(buyer.may_access(Some(UserId::new(1))));
        assert!(!buyer.may_access(Some(UserId::new(2))));
        assert!(buyer.may_access(None));

        let admin = identity(9, Role::Admin);
        assert!(admin.may_access(Some(UserId::new(2))));
    }

    #[test]
    fn test_role_helpers() {
        assert!(identity(1, Role::Admin).is_admin());
        assert!(identity(1, Role::Seller).is_seller());
        assert!(!identity(1, Role::Buyer).is_seller());
    }
}
