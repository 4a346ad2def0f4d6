use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::external::SquareClient;
use crate::models::*;

#[derive(Clone)]
pub struct RefundService {
    pool: DbPool,
    square: SquareClient,
}

impl RefundService {
    pub fn new(pool: DbPool, square: SquareClient) -> Self {
        Self { pool, square }
    }

    /// Cancel a registration and file a pending refund request. The payment
    /// id is captured before the registration row is deleted so an approved
    /// request can still be refunded at the gateway.
    pub async fn request_refund(
        &self,
        user_id: i64,
        event_id: i64,
        request: CreateRefundRequest,
    ) -> AppResult<RefundRequest> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        let deadline = event.refund_deadline.unwrap_or(event.date);
        if Utc::now() > deadline {
            return Err(AppError::ValidationError(
                "Refund deadline has passed".to_string(),
            ));
        }

        let registration = sqlx::query_as::<_, EventRegistration>(
            "SELECT * FROM event_registrations WHERE user_id = $1 AND event_id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))?;

        let user_email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        let email = registration.payment_email.clone().unwrap_or(user_email);

        sqlx::query("DELETE FROM event_registrations WHERE id = $1")
            .bind(registration.id)
            .execute(&mut *tx)
            .await?;

        let refund_request = sqlx::query_as::<_, RefundRequest>(
            r#"
            INSERT INTO refund_requests (event_id, user_id, email, amount, reason, payment_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(&email)
        .bind(registration.final_price)
        .bind(&request.reason)
        .bind(&registration.payment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Refund request {} filed by user {} for event {}",
            refund_request.id,
            user_id,
            event_id
        );
        Ok(refund_request)
    }

    pub async fn list_refunds(
        &self,
        status: Option<&str>,
    ) -> AppResult<Vec<RefundRequestDetail>> {
        let rows = sqlx::query_as::<_, RefundRequestDetail>(
            r#"
            SELECT r.id, r.event_id, e.name AS event_name, r.user_id,
                   u.first_name, u.last_name, r.email, r.amount, r.currency,
                   r.reason, r.status, r.request_date, r.processed_date,
                   r.admin_notes, r.processed_by, r.payment_id
            FROM refund_requests r
            JOIN events e ON e.id = r.event_id
            JOIN users u ON u.id = r.user_id
            WHERE $1::TEXT IS NULL OR r.status = $1
            ORDER BY r.request_date DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn stats(&self) -> AppResult<RefundStats> {
        let stats = sqlx::query_as::<_, RefundStats>(
            r#"
            SELECT COUNT(*) AS total_requests,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'approved') AS approved,
                   COUNT(*) FILTER (WHERE status = 'rejected') AS rejected,
                   COALESCE(SUM(amount) FILTER (WHERE status = 'approved'), 0)::BIGINT AS total_refunded
            FROM refund_requests
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Approve or reject a pending request. Approval with a stored payment
    /// id issues the Square refund; without one the response flags that a
    /// manual refund is required.
    pub async fn process(
        &self,
        refund_id: i64,
        processed_by: &str,
        request: ProcessRefundRequest,
    ) -> AppResult<ProcessRefundResponse> {
        if request.status != "approved" && request.status != "rejected" {
            return Err(AppError::ValidationError(
                "Status must be 'approved' or 'rejected'".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let refund_request = sqlx::query_as::<_, RefundRequest>(
            "SELECT * FROM refund_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(refund_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Refund request not found".to_string()))?;

        if refund_request.status != "pending" {
            return Err(AppError::Conflict(
                "Refund request has already been processed".to_string(),
            ));
        }

        let mut gateway_refund_id = None;
        let mut manual_refund_required = false;

        if request.status == "approved" {
            match &refund_request.payment_id {
                Some(payment_id) => {
                    let refund = self
                        .square
                        .refund_payment(
                            payment_id,
                            refund_request.amount,
                            &refund_request.currency,
                            &Uuid::new_v4().to_string(),
                            refund_request.reason.as_deref(),
                        )
                        .await?;
                    gateway_refund_id = Some(refund.id);
                }
                None => {
                    log::warn!(
                        "Refund request {} approved without a payment id; manual refund required",
                        refund_id
                    );
                    manual_refund_required = true;
                }
            }
        }

        sqlx::query(
            r#"
            UPDATE refund_requests
            SET status = $2, processed_date = NOW(), admin_notes = $3, processed_by = $4
            WHERE id = $1
            "#,
        )
        .bind(refund_id)
        .bind(&request.status)
        .bind(&request.admin_notes)
        .bind(processed_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Refund request {} {} by {}",
            refund_id,
            request.status,
            processed_by
        );
        Ok(ProcessRefundResponse {
            id: refund_id,
            status: request.status,
            refund_id: gateway_refund_id,
            manual_refund_required,
        })
    }

    /// Completed Square payments in the window with no matching registration,
    /// annotated with their status in the refund ledger.
    pub async fn list_unregistered(
        &self,
        query: UnregisteredRefundsQuery,
    ) -> AppResult<Vec<UnregisteredPayment>> {
        let end = query.end_date.unwrap_or_else(Utc::now);
        let start = query.start_date.unwrap_or(end - Duration::days(30));

        let payments = self.square.list_completed_payments(start, end).await?;

        let registered: HashSet<String> = sqlx::query_scalar::<_, String>(
            "SELECT payment_id FROM event_registrations WHERE payment_id IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect();

        let ledger: HashMap<String, String> = sqlx::query_as::<_, (String, String)>(
            "SELECT payment_id, refund_id FROM unregistered_refunds",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect();

        let orphans = payments
            .into_iter()
            .filter(|p| !registered.contains(&p.id))
            .map(|p| {
                let refund_id = ledger.get(&p.id).cloned();
                UnregisteredPayment {
                    refunded: refund_id.is_some(),
                    refund_id,
                    payment_id: p.id,
                    amount: p.amount_money.amount,
                    currency: p.amount_money.currency,
                    buyer_email: p.buyer_email_address,
                    created_at: p.created_at,
                }
            })
            .collect();

        Ok(orphans)
    }

    pub async fn refund_unregistered(
        &self,
        request: RefundUnregisteredRequest,
    ) -> AppResult<UnregisteredRefund> {
        let already = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM unregistered_refunds WHERE payment_id = $1",
        )
        .bind(&request.payment_id)
        .fetch_one(&self.pool)
        .await?;
        if already > 0 {
            return Err(AppError::Conflict(
                "Payment has already been refunded".to_string(),
            ));
        }

        let currency = request
            .currency
            .unwrap_or_else(|| self.square.currency().to_string());

        let refund = self
            .square
            .refund_payment(
                &request.payment_id,
                request.amount,
                &currency,
                &Uuid::new_v4().to_string(),
                request.reason.as_deref(),
            )
            .await?;

        let ledger_row = sqlx::query_as::<_, UnregisteredRefund>(
            r#"
            INSERT INTO unregistered_refunds (payment_id, refund_id, amount, currency, email, reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&request.payment_id)
        .bind(&refund.id)
        .bind(request.amount)
        .bind(&currency)
        .bind(&request.email)
        .bind(&request.reason)
        .fetch_one(&self.pool)
        .await?;

        log::info!(
            "Unregistered payment {} refunded ({})",
            request.payment_id,
            refund.id
        );
        Ok(ledger_row)
    }
}
