//! # Taskify Shared Library
//!
//! Domain types, storage access and the authorization core used by the
//! Taskify API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their queries
//! - `auth`: Password hashing, JWT, auth context and the access policy
//! - `audit`: Append-only activity recording
//! - `db`: Connection pool, migrations and seeding
//! - `stats`: Dashboard aggregation over scoped tasks

pub mod audit;
pub mod auth;
pub mod db;
pub mod models;
pub mod stats;

/// Current version of the Taskify shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
