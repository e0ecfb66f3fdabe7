//! API request and response data models.
//!
//! API models are distinct from database models, allowing independent evolution of the wire
//! and storage representations. All models are annotated with `utoipa` for the generated API
//! docs.
//!
//! - [`experiments`]: Experiment bodies, responses, and the list query parameters
//! - [`users`]: User responses (users appear standalone and as experiment owners)

pub mod experiments;
pub mod users;
