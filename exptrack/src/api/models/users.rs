//! API response model for users.

use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Users keep snake_case keys on the wire, unlike experiments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 1)]
    pub id: UserId,
    #[schema(example = "Maya Patel")]
    pub name: String,
    #[schema(example = "maya.patel@company.com")]
    pub email: String,
    #[schema(example = "Sales")]
    pub department: String,
    /// Path or URL of the user's avatar image
    #[schema(example = "/static/avatar2.png")]
    pub profile_picture: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            department: db.department,
            profile_picture: db.profile_picture,
            created_at: Some(db.created_at),
        }
    }
}
