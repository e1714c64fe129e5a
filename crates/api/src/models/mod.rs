//! Domain models for the marketplace API.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. Everything here serialises as camelCase JSON.

pub mod cart;
pub mod catalog;
pub mod chat;
pub mod event;
pub mod identity;
pub mod notification;
pub mod order;
pub mod user;

pub use identity::Identity;
