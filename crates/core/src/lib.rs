//! Marketplace Core - Shared domain types.
//!
//! This crate provides the types shared by every marketplace component:
//! - `api` - REST backend for the storefront and the role dashboards
//! - `cli` - Command-line tools for migrations, seeding and admin bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. Enabling the `postgres` feature adds `sqlx`
//! encode/decode support for the newtypes and enums.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, roles, seller status, payment stages, money helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
