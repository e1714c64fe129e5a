//! Marketplace API library.
//!
//! The REST backend as a library so the binary, CLI and tests share the
//! same repositories, services and router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
