use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Ledger entry; positive amounts earn, negative amounts spend.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CreditTransaction {
    pub id: i64,
    pub user_id: i64,
    pub amount: i64, // cents
    pub description: String,
    pub event_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreditsResponse {
    pub balance: i64,
    pub history: Vec<CreditTransaction>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SpendCreditsRequest {
    /// Amount to spend in cents; must be positive.
    pub amount: i64,
    pub description: Option<String>,
    pub event_id: Option<i64>,
}
