//! Out-of-band payment confirmation workflow.
//!
//! Orders are paid by mobile money outside the system. The order moves
//! through four stages:
//!
//! ```text
//! Pending ──generate_code──▶ CodeGenerated ──confirm_by_client──▶ ClientConfirmed
//!    │                             │                                    │
//!    └─────────────────────────────┴──────── confirm_by_admin ──────────┴──▶ AdminConfirmed
//! ```
//!
//! `AdminConfirmed` is terminal and is the only stage in which the order
//! counts as paid. The stage is not stored as a column; it is derived from the
//! order's persisted flags with [`PaymentStage::from_flags`].

use serde::{Deserialize, Serialize};

/// Errors for transitions the workflow does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PaymentStageError {
    /// The order has already been paid and confirmed.
    #[error("order has already been paid")]
    AlreadyPaid,
    /// The client tried to confirm before a payment code was issued.
    #[error("no payment code has been generated for this order")]
    CodeNotGenerated,
}

/// Stage of the payment workflow for one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStage {
    /// Order placed, nothing paid.
    #[default]
    Pending,
    /// A payment code was issued to the customer.
    CodeGenerated,
    /// The customer says they have paid.
    ClientConfirmed,
    /// An admin (or staff member) verified the payment.
    AdminConfirmed,
}

impl PaymentStage {
    /// Derive the stage from an order's persisted flags.
    ///
    /// `is_paid` set through the status endpoint counts as confirmed.
    #[must_use]
    pub const fn from_flags(
        is_paid: bool,
        is_confirmed_by_admin: bool,
        client_confirmed_payment: bool,
        has_payment_code: bool,
    ) -> Self {
        if is_paid || is_confirmed_by_admin {
            Self::AdminConfirmed
        } else if client_confirmed_payment {
            Self::ClientConfirmed
        } else if has_payment_code {
            Self::CodeGenerated
        } else {
            Self::Pending
        }
    }

    /// Whether the workflow has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::AdminConfirmed)
    }

    /// Issue (or re-issue) a payment code.
    ///
    /// Re-issuing keeps the current stage so a client that already
    /// confirmed does not fall back to `CodeGenerated`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentStageError::AlreadyPaid`] once the order is paid.
    pub const fn generate_code(self) -> Result<Self, PaymentStageError> {
        match self {
            Self::Pending => Ok(Self::CodeGenerated),
            Self::CodeGenerated | Self::ClientConfirmed => Ok(self),
            Self::AdminConfirmed => Err(PaymentStageError::AlreadyPaid),
        }
    }

    /// The client asserts they have paid.
    ///
    /// # Errors
    ///
    /// - [`PaymentStageError::CodeNotGenerated`] before a code was issued
    /// - [`PaymentStageError::AlreadyPaid`] once the order is paid
    pub const fn confirm_by_client(self) -> Result<Self, PaymentStageError> {
        match self {
            Self::Pending => Err(PaymentStageError::CodeNotGenerated),
            Self::CodeGenerated | Self::ClientConfirmed => Ok(Self::ClientConfirmed),
            Self::AdminConfirmed => Err(PaymentStageError::AlreadyPaid),
        }
    }

    /// Staff verified the payment. Allowed from every stage, including the
    /// terminal one, so repeated confirmations are harmless.
    #[must_use]
    pub const fn confirm_by_admin(self) -> Self {
        Self::AdminConfirmed
    }
}
