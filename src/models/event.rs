use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::pricing::PricingSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub target_year: String,
    pub fee: i64, // cents
    pub capacity: i32,
    pub is_archived: bool,
    pub is_uoft_only: bool,
    pub enable_advanced_ticketing: bool,
    pub enable_sub_events: bool,
    pub date: DateTime<Utc>,
    pub refund_deadline: Option<DateTime<Utc>>,
    pub event_type: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TicketTier {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub price: i64, // cents
    pub capacity: i32,
    pub target_year: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    /// Per-sub-event prices, aligned by index with the event's sub-events.
    pub sub_event_prices: Option<Vec<i64>>,
    /// Per-sub-event seat allocations, aligned by index with the event's sub-events.
    pub sub_event_capacities: Option<Vec<i32>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SubEvent {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: i64, // cents
    pub capacity: i32,
    pub is_standalone: bool,
    pub is_combo_option: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub name: String,
    pub description: String,
    pub target_year: Option<String>,
    pub fee: Option<i64>,
    pub capacity: i32,
    pub is_uoft_only: Option<bool>,
    pub enable_advanced_ticketing: Option<bool>,
    pub enable_sub_events: Option<bool>,
    pub date: DateTime<Utc>,
    pub refund_deadline: Option<DateTime<Utc>>,
    pub event_type: String,
    pub image: Option<String>,
    pub ticket_tiers: Option<Vec<TicketTierInput>>,
    pub sub_events: Option<Vec<SubEventInput>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_year: Option<String>,
    pub fee: Option<i64>,
    pub capacity: Option<i32>,
    pub is_archived: Option<bool>,
    pub is_uoft_only: Option<bool>,
    pub enable_advanced_ticketing: Option<bool>,
    pub enable_sub_events: Option<bool>,
    pub date: Option<DateTime<Utc>>,
    pub refund_deadline: Option<DateTime<Utc>>,
    pub event_type: Option<String>,
    pub image: Option<String>,
    /// When present the tier list is replaced wholesale.
    pub ticket_tiers: Option<Vec<TicketTierInput>>,
    /// When present the sub-event list is replaced wholesale.
    pub sub_events: Option<Vec<SubEventInput>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketTierInput {
    pub name: String,
    pub price: i64,
    pub capacity: i32,
    pub target_year: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: Option<bool>,
    pub sub_event_prices: Option<Vec<i64>>,
    pub sub_event_capacities: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubEventInput {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub capacity: i32,
    pub is_standalone: Option<bool>,
    pub is_combo_option: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub target_year: String,
    pub fee: i64,
    pub capacity: i32,
    pub is_archived: bool,
    pub is_uoft_only: bool,
    pub enable_advanced_ticketing: bool,
    pub enable_sub_events: bool,
    pub date: DateTime<Utc>,
    pub refund_deadline: Option<DateTime<Utc>>,
    pub event_type: String,
    pub image: Option<String>,
    pub registered_count: i64,
    pub pricing: PricingSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TierOption {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub capacity: i32,
    pub target_year: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub sub_event_prices: Option<Vec<i64>>,
    pub sub_event_capacities: Option<Vec<i32>>,
    pub remaining: i64,
    pub is_available: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TicketOptionsResponse {
    pub tiers: Vec<TierOption>,
    pub sub_events: Vec<SubEvent>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CapacityResponse {
    pub capacity: i64,
    pub available: i64,
}
