use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SquarePaymentRequest {
    /// Token produced by the Square Web Payments SDK on the client.
    pub source_id: String,
    pub event_id: i64,
    /// Charge amount in cents.
    pub amount: i64,
    pub currency: Option<String>,
    pub buyer_email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SquarePaymentResponse {
    pub payment_id: String,
    pub status: String,
    pub amount: i64,
    pub receipt_url: Option<String>,
}
