//! Contact details for orders placed without an account.

use serde::{Deserialize, Serialize};

use super::email::{Email, EmailError};

/// Validation errors for [`GuestInfo`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuestInfoError {
    /// First name missing or blank.
    #[error("guest first name is required")]
    MissingFirstName,
    /// Last name missing or blank.
    #[error("guest last name is required")]
    MissingLastName,
    /// Email did not parse.
    #[error("guest email is invalid: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Guest contact info as submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestInfo {
    /// Guest first name.
    pub first_name: String,
    /// Guest last name.
    pub last_name: String,
    /// Guest email, used for the confirmation email.
    pub email: String,
}

impl GuestInfo {
    /// Validate the contact details and return a trimmed copy.
    ///
    /// # Errors
    ///
    /// Returns a [`GuestInfoError`] for blank names or a malformed email.
    pub fn validate(&self) -> Result<Self, GuestInfoError> {
        let first_name = self.first_name.trim();
        if first_name.is_empty() {
            return Err(GuestInfoError::MissingFirstName);
        }
        let last_name = self.last_name.trim();
        if last_name.is_empty() {
            return Err(GuestInfoError::MissingLastName);
        }
        let email = Email::parse(&self.email)?;

        Ok(Self {
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            email: email.into_inner(),
        })
    }

    /// "First Last" for greetings.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn guest(first: &str, last: &str, email: &str) -> GuestInfo {
        GuestInfo {
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            email: email.to_owned(),
        }
    }

    #[test]
    fn test_validate_trims_and_normalizes() {
        let valid = guest("  Ada ", "Lovelace", "Ada@Example.com")
            .validate()
            .unwrap();
        assert_eq!(valid.first_name, "Ada");
        assert_eq!(valid.email, "ada@example.com");
        assert_eq!(valid.full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_validate_rejects_blank_names() {
        assert!(matches!(
            guest(" ", "Lovelace", "ada@example.com").validate(),
            Err(GuestInfoError::MissingFirstName)
        ));
        assert!(matches!(
            guest("Ada", "", "ada@example.com").validate(),
            Err(GuestInfoError::MissingLastName)
        ));
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        assert!(matches!(
            guest("Ada", "Lovelace", "nope").validate(),
            Err(GuestInfoError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let info: GuestInfo = serde_json::from_str(
            r#"{"firstName":"Ada","lastName":"Lovelace","email":"ada@example.com"}"#,
        )
        .unwrap();
        assert_eq!(info.last_name, "Lovelace");
    }
}
