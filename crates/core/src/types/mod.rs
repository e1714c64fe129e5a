//! Core types for the marketplace.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod guest;
pub mod id;
pub mod money;
pub mod payment;
pub mod status;

pub use email::{Email, EmailError};
pub use guest::{GuestInfo, GuestInfoError};
pub use id::*;
pub use money::{
    MAX_LINE_QUANTITY, fits_amount, line_total, max_amount, order_total, valid_line_quantity,
};
pub use payment::{PaymentStage, PaymentStageError};
pub use status::*;
