//! Common type definitions.
//!
//! Entity IDs are SQLite integer primary keys wrapped in type aliases so that
//! signatures say which table an ID belongs to:
//!
//! - [`UserId`]: User identifier
//! - [`ExperimentId`]: Experiment identifier

// Type aliases for IDs
pub type UserId = i64;
pub type ExperimentId = i64;

/// Filter value that disables a filter, as sent by the front end's drop-downs.
pub const ANY_SENTINEL: &str = "Any";
