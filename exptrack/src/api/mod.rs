//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Experiments** (`/api/experiments/*`): CRUD plus filtered listing
//! - **Users** (`/api/users`): Read-only listing of potential owners
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa`. The document is served at
//! `/api-docs/openapi.json` and browsable at `/docs` when the server is running.

pub mod handlers;
pub mod models;
