use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RefundRequest {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub email: String,
    pub amount: i64, // cents
    pub currency: String,
    pub reason: Option<String>,
    pub status: String, // pending | approved | rejected
    pub request_date: DateTime<Utc>,
    pub processed_date: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub processed_by: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRefundRequest {
    pub reason: Option<String>,
}

/// Refund request joined with event and user names for the admin list.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RefundRequestDetail {
    pub id: i64,
    pub event_id: i64,
    pub event_name: String,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub amount: i64,
    pub currency: String,
    pub reason: Option<String>,
    pub status: String,
    pub request_date: DateTime<Utc>,
    pub processed_date: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub processed_by: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessRefundRequest {
    /// "approved" or "rejected".
    pub status: String,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessRefundResponse {
    pub id: i64,
    pub status: String,
    pub refund_id: Option<String>,
    /// Set when the request was approved without a stored payment id.
    pub manual_refund_required: bool,
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RefundStats {
    pub total_requests: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total_refunded: i64, // cents, approved requests only
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UnregisteredRefund {
    pub id: i64,
    pub payment_id: String,
    pub refund_id: String,
    pub amount: i64,
    pub currency: String,
    pub email: Option<String>,
    pub reason: Option<String>,
    pub refunded_at: DateTime<Utc>,
}

/// A completed Square payment with no matching registration.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnregisteredPayment {
    pub payment_id: String,
    pub amount: i64,
    pub currency: String,
    pub buyer_email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub refunded: bool,
    pub refund_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefundListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnregisteredRefundsQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefundUnregisteredRequest {
    pub payment_id: String,
    pub amount: i64,
    pub currency: Option<String>,
    pub email: Option<String>,
    pub reason: Option<String>,
}
