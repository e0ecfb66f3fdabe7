//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with SQLite.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries and owner resolution)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   SQLite    │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD operations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! ## Example Usage
//!
//! ```ignore
//! use exptrack::db::handlers::{Experiments, Repository};
//! use exptrack::db::handlers::experiments::ExperimentFilter;
//!
//! async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = pool.acquire().await?;
//!     let mut repo = Experiments::new(&mut conn);
//!
//!     let running = repo.list(&ExperimentFilter::new().with_state("Running")).await?;
//!     println!("{} running experiments", running.len());
//!     Ok(())
//! }
//! ```
//!
//! # Transactions
//!
//! Multi-statement writes (an experiment plus its owner rows) open their own transaction on
//! the connection they were given, so a repository can be built straight from a pooled
//! connection.
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/` directory.
//! The [`crate::migrator`] function provides access to the migrator:
//!
//! ```ignore
//! exptrack::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
