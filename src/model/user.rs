use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::role::Role;

/// Row of the `users` table. Never serialized, it carries the password hash.
#[derive(Debug, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: u8,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user, as returned by login and verify
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@company.com")]
    pub email: String,
    pub role: Role,
    #[schema(example = 1001, nullable = true)]
    pub employee_id: Option<u64>,
}
