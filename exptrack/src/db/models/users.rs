//! Database models for users.

use crate::types::UserId;
use bon::Builder;
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone, Builder)]
pub struct UserCreateDBRequest {
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub email: String,
    #[builder(into, default)]
    pub department: String,
    #[builder(into, default)]
    pub profile_picture: String,
}

/// Database request for updating a user
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub name: Option<String>,
    pub department: Option<String>,
    pub profile_picture: Option<String>,
}

/// Database response for a user
#[derive(Debug, Clone, PartialEq)]
pub struct UserDBResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub department: String,
    pub profile_picture: String,
    pub created_at: DateTime<Utc>,
}
