//! Database record models.
//!
//! These are distinct from the API models in [`crate::api::models`] so that storage and wire
//! representations can evolve independently. Conversions go DB -> API via `From`.
//!
//! - [`users`]: Users referenced as experiment owners
//! - [`experiments`]: Experiments with flattened impact/participants/duration columns

pub mod experiments;
pub mod users;
