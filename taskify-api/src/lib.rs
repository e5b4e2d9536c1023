//! # Taskify API Server Library
//!
//! HTTP surface of Taskify: users, projects, tasks, tags, attachments and
//! dashboard statistics, with JWT authentication and an activity log.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `audit`: Response-attached activity entries and the recording middleware
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Extractors that reject with `ApiError` bodies
//! - `routes`: API route handlers

pub mod app;
pub mod audit;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
