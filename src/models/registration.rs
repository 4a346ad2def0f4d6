use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A short-lived seat hold created before the card is charged.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: Uuid,
    pub event_id: i64,
    pub user_id: i64,
    pub tier_id: Option<i64>,
    pub sub_event_ids: Vec<i64>,
    pub credits_used: i64,
    pub final_price: Option<i64>,
    pub payment_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EventRegistration {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub registered_at: DateTime<Utc>,
    pub payment_status: String,
    pub payment_id: Option<String>,
    pub payment_email: Option<String>,
    pub tier_id: Option<i64>,
    pub sub_event_ids: Vec<i64>,
    pub credits_used: i64,
    pub final_price: i64,
    pub registration_type: String, // "free" or "paid"
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReserveRequest {
    pub tier_id: Option<i64>,
    pub sub_event_ids: Option<Vec<i64>>,
    pub credits_used: Option<i64>,
    pub final_price: Option<i64>,
    pub payment_email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReserveResponse {
    pub reservation_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaidRegistrationRequest {
    pub reservation_id: Uuid,
    pub payment_id: String,
    pub payment_email: Option<String>,
}

/// A registration joined with its event, for "my events" listings.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MyEventRow {
    pub event_id: i64,
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub event_type: String,
    pub registered_at: DateTime<Utc>,
    pub payment_status: String,
    pub final_price: i64,
    pub registration_type: String,
}
