//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection, provides strongly-typed CRUD operations and
//! returns models from [`crate::db::models`].
//!
//! # Available Repositories
//!
//! - [`Users`]: Users that can own experiments
//! - [`Experiments`]: Experiments, their owner associations and the list filter engine

pub mod experiments;
pub mod repository;
pub mod users;

pub use experiments::Experiments;
pub use repository::Repository;
pub use users::Users;
