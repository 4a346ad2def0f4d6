use chrono::Utc;

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::external::square::MINIMUM_CHARGE_CENTS;
use crate::external::SquareClient;
use crate::models::*;
use crate::services::registration_service::validate_hold;

#[derive(Clone)]
pub struct PaymentService {
    pool: DbPool,
    square: SquareClient,
}

impl PaymentService {
    pub fn new(pool: DbPool, square: SquareClient) -> Self {
        Self { pool, square }
    }

    /// Charge a Web Payments SDK token for an event registration. Requires
    /// an active reservation, so a failed reserve step can never reach the
    /// gateway.
    pub async fn charge(
        &self,
        user_id: i64,
        request: SquarePaymentRequest,
    ) -> AppResult<SquarePaymentResponse> {
        if request.amount <= 0 {
            return Err(AppError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(request.event_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        if event.is_archived {
            return Err(AppError::ValidationError("Event is archived".to_string()));
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id)
        .bind(request.event_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("No active reservation for this event".to_string())
        })?;
        validate_hold(&reservation, user_id, request.event_id, Utc::now())?;

        // Square rejects charges below its minimum.
        let amount = request.amount.max(MINIMUM_CHARGE_CENTS);
        let currency = request
            .currency
            .unwrap_or_else(|| self.square.currency().to_string());
        let buyer_email = request.buyer_email.unwrap_or(user.email);
        let idempotency_key = format!(
            "{}-{}-{}",
            user_id,
            request.event_id,
            Utc::now().timestamp()
        );
        let note = format!(
            "event:{} user:{} original_amount:{}",
            request.event_id, user_id, request.amount
        );

        let payment = self
            .square
            .create_payment(
                &request.source_id,
                amount,
                &currency,
                &idempotency_key,
                Some(&buyer_email),
                Some(&note),
            )
            .await?;

        log::info!(
            "Square payment {} ({}) for user {} on event {}",
            payment.id,
            payment.status,
            user_id,
            request.event_id
        );

        Ok(SquarePaymentResponse {
            payment_id: payment.id,
            status: payment.status,
            amount: payment.amount_money.amount,
            receipt_url: payment.receipt_url,
        })
    }
}
