//! HTTP request handlers for all API endpoints.
//!
//! Each handler deserializes and validates its input, runs the work through a database
//! repository and serializes the result. Handlers return [`crate::errors::Error`], which
//! converts to the appropriate HTTP status code.
//!
//! - [`experiments`]: Experiment CRUD and the filtered listing
//! - [`users`]: Read-only user listing
//! - [`static_assets`]: Front-end asset serving and SPA routing

pub mod experiments;
pub mod static_assets;
pub mod users;
