use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::user::UserSummary;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "admin@company.com")]
    pub email: String,
    #[schema(example = "change-me")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// User email
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
