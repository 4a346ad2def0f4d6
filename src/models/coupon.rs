use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: String, // percentage | fixed
    pub discount_value: i64,   // percent, or cents for fixed
    pub min_amount: Option<i64>,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    /// Generated when omitted.
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: i64,
    pub min_amount: Option<i64>,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    pub code: String,
    /// Charge amount in cents the coupon would apply to.
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedeemCouponRequest {
    pub code: String,
    pub event_id: i64,
    /// Charge amount in cents the coupon applies to.
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    pub discount: i64,
    pub final_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
