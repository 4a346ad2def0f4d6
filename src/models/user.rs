use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub university: String,
    pub current_year: String,
    pub graduation_year: Option<i32>,
    pub major: Option<String>,
    pub is_admin: bool,
    pub credit_balance: i64, // cents
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    #[schema(example = "taro.yamada@mail.utoronto.ca")]
    pub email: String,
    #[schema(example = "passw0rd")]
    pub password: String,
    #[schema(example = "Taro")]
    pub first_name: String,
    #[schema(example = "Yamada")]
    pub last_name: String,
    #[schema(example = "University of Toronto")]
    pub university: Option<String>,
    #[schema(example = "3rd year")]
    pub current_year: Option<String>,
    #[schema(example = 2027)]
    pub graduation_year: Option<i32>,
    #[schema(example = "Computer Science")]
    pub major: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "taro.yamada@mail.utoronto.ca")]
    pub email: String,
    #[schema(example = "passw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub current_year: Option<String>,
    pub graduation_year: Option<i32>,
    pub major: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub university: String,
    pub current_year: String,
    pub graduation_year: Option<i32>,
    pub major: Option<String>,
    pub is_admin: bool,
    pub credit_balance: i64,
    pub joined_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            university: user.university,
            current_year: user.current_year,
            graduation_year: user.graduation_year,
            major: user.major,
            is_admin: user.is_admin,
            credit_balance: user.credit_balance,
            joined_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminStatusResponse {
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetAdminRequest {
    pub is_admin: bool,
}
