use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AnalyticsTotals {
    pub total_events: i64,
    pub total_users: i64,
    pub total_registrations: i64,
    /// Sum of final_price over completed paid registrations, in cents.
    pub total_revenue: i64,
}

/// One participant line in the per-event registrant export.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RegistrantRow {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub university: String,
    pub current_year: String,
    pub registered_at: DateTime<Utc>,
    pub payment_status: String,
    pub registration_type: String,
    pub final_price: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EventAnalyticsRow {
    pub event_id: i64,
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub registrations: i64,
    pub revenue: i64,
}
