use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::credit_service::check_credit_spend;

/// A hold may only be consumed by its owner, for the event it was taken on,
/// and before it expires.
pub(crate) fn validate_hold(
    reservation: &Reservation,
    user_id: i64,
    event_id: i64,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if reservation.user_id != user_id || reservation.event_id != event_id {
        return Err(AppError::PermissionDenied);
    }
    if reservation.expires_at <= now {
        return Err(AppError::Conflict("Reservation has expired".to_string()));
    }
    Ok(())
}

/// Paid registrations holding a captured payment cannot be cancelled
/// outright; the money has to come back through a refund request.
pub(crate) fn cancellation_blocked(registration: &EventRegistration) -> Option<&'static str> {
    if registration.registration_type == "paid" && registration.payment_id.is_some() {
        return Some("Paid registrations are cancelled through a refund request");
    }
    None
}

/// Reservation-then-pay registration flow. A registration attempt moves
/// `NONE -> RESERVED -> PAID`, or `RESERVED -> RELEASED` when the client
/// gives up. Unexpired holds count toward capacity, so a full event rejects
/// the reserve step before any charge can be attempted.
#[derive(Clone)]
pub struct RegistrationService {
    pool: DbPool,
    reservation_ttl_seconds: i64,
}

impl RegistrationService {
    pub fn new(pool: DbPool, reservation_ttl_seconds: i64) -> Self {
        Self {
            pool,
            reservation_ttl_seconds,
        }
    }

    pub async fn reserve(
        &self,
        user_id: i64,
        event_id: i64,
        request: ReserveRequest,
    ) -> AppResult<ReserveResponse> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        if event.is_archived {
            return Err(AppError::ValidationError("Event is archived".to_string()));
        }

        let already_registered = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM event_registrations WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_registered > 0 {
            return Err(AppError::Conflict(
                "Already registered for this event".to_string(),
            ));
        }

        // Credits are checked up front so an over-spend fails before the
        // card is ever charged, not after.
        if let Some(credits_used) = request.credits_used {
            if credits_used != 0 {
                let balance = sqlx::query_scalar::<_, i64>(
                    "SELECT credit_balance FROM users WHERE id = $1 FOR UPDATE",
                )
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
                check_credit_spend(credits_used, balance)?;
            }
        }

        // Clear the caller's previous hold and any expired ones before counting.
        sqlx::query(
            "DELETE FROM reservations WHERE (user_id = $1 AND event_id = $2) OR (event_id = $2 AND expires_at <= NOW())",
        )
        .bind(user_id)
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

        if event.enable_advanced_ticketing {
            let tier_id = request.tier_id.ok_or_else(|| {
                AppError::ValidationError("tier_id is required for this event".to_string())
            })?;

            let tier = sqlx::query_as::<_, TicketTier>(
                "SELECT * FROM ticket_tiers WHERE id = $1 AND event_id = $2 FOR UPDATE",
            )
            .bind(tier_id)
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket tier not found".to_string()))?;

            let taken = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT (SELECT COUNT(*) FROM event_registrations WHERE tier_id = $1)
                     + (SELECT COUNT(*) FROM reservations WHERE tier_id = $1 AND expires_at > NOW())
                "#,
            )
            .bind(tier_id)
            .fetch_one(&mut *tx)
            .await?;

            if taken >= tier.capacity as i64 {
                return Err(AppError::Conflict("Ticket tier is sold out".to_string()));
            }
        } else {
            let taken = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT (SELECT COUNT(*) FROM event_registrations WHERE event_id = $1)
                     + (SELECT COUNT(*) FROM reservations WHERE event_id = $1 AND expires_at > NOW())
                "#,
            )
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;

            if taken >= event.capacity as i64 {
                return Err(AppError::Conflict("Event is full".to_string()));
            }
        }

        let reservation_id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::seconds(self.reservation_ttl_seconds);

        sqlx::query(
            r#"
            INSERT INTO reservations (id, event_id, user_id, tier_id, sub_event_ids,
                                      credits_used, final_price, payment_email, expires_at)
            VALUES ($1, $2, $3, $4, COALESCE($5, '{}'), COALESCE($6, 0), $7, $8, $9)
            "#,
        )
        .bind(reservation_id)
        .bind(event_id)
        .bind(user_id)
        .bind(request.tier_id)
        .bind(&request.sub_event_ids)
        .bind(request.credits_used)
        .bind(request.final_price)
        .bind(&request.payment_email)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Reservation {} created for user {} on event {}",
            reservation_id,
            user_id,
            event_id
        );
        Ok(ReserveResponse {
            reservation_id,
            expires_at,
        })
    }

    /// Best-effort release after a tokenization or payment failure.
    pub async fn release(
        &self,
        user_id: i64,
        event_id: i64,
        reservation_id: Uuid,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM reservations WHERE id = $1 AND user_id = $2 AND event_id = $3",
        )
        .bind(reservation_id)
        .bind(user_id)
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Reservation not found".to_string()));
        }
        log::info!("Reservation {} released by user {}", reservation_id, user_id);
        Ok(())
    }

    /// The caller's active (unexpired) hold on an event, if any.
    pub async fn active_reservation(
        &self,
        user_id: i64,
        event_id: i64,
    ) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = $1 AND event_id = $2 AND expires_at > NOW()",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    pub async fn register_free(
        &self,
        user_id: i64,
        event_id: i64,
    ) -> AppResult<EventRegistration> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        if event.is_archived {
            return Err(AppError::ValidationError("Event is archived".to_string()));
        }
        if event.fee > 0 || event.enable_advanced_ticketing {
            return Err(AppError::ValidationError(
                "Event requires payment".to_string(),
            ));
        }

        let taken = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT (SELECT COUNT(*) FROM event_registrations WHERE event_id = $1)
                 + (SELECT COUNT(*) FROM reservations WHERE event_id = $1 AND expires_at > NOW())
            "#,
        )
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;
        if taken >= event.capacity as i64 {
            return Err(AppError::Conflict("Event is full".to_string()));
        }

        let registration = sqlx::query_as::<_, EventRegistration>(
            r#"
            INSERT INTO event_registrations (user_id, event_id, payment_status, final_price, registration_type)
            VALUES ($1, $2, 'completed', 0, 'free')
            ON CONFLICT (user_id, event_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict("Already registered for this event".to_string()))?;

        tx.commit().await?;

        log::info!("User {} registered for free event {}", user_id, event_id);
        Ok(registration)
    }

    /// Consume a reservation after a successful charge: insert the paid
    /// registration, spend the reserved credits, delete the hold.
    pub async fn register_paid(
        &self,
        user_id: i64,
        event_id: i64,
        request: PaidRegistrationRequest,
    ) -> AppResult<EventRegistration> {
        let mut tx = self.pool.begin().await?;

        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(request.reservation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;

        validate_hold(&reservation, user_id, event_id, Utc::now())?;

        let payment_email = request
            .payment_email
            .or_else(|| reservation.payment_email.clone());
        let final_price = reservation.final_price.unwrap_or(0);

        let registration = sqlx::query_as::<_, EventRegistration>(
            r#"
            INSERT INTO event_registrations (user_id, event_id, payment_status, payment_id,
                                             payment_email, tier_id, sub_event_ids,
                                             credits_used, final_price, registration_type)
            VALUES ($1, $2, 'completed', $3, $4, $5, $6, $7, $8, 'paid')
            ON CONFLICT (user_id, event_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .bind(&request.payment_id)
        .bind(&payment_email)
        .bind(reservation.tier_id)
        .bind(&reservation.sub_event_ids)
        .bind(reservation.credits_used)
        .bind(final_price)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict("Already registered for this event".to_string()))?;

        if reservation.credits_used > 0 {
            let balance = sqlx::query_scalar::<_, i64>(
                "SELECT credit_balance FROM users WHERE id = $1 FOR UPDATE",
            )
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
            check_credit_spend(reservation.credits_used, balance)?;

            sqlx::query(
                r#"
                INSERT INTO credit_transactions (user_id, amount, description, event_id)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(user_id)
            .bind(-reservation.credits_used)
            .bind("Credits applied to event registration")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE users SET credit_balance = credit_balance - $2, updated_at = NOW() WHERE id = $1")
                .bind(user_id)
                .bind(reservation.credits_used)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(reservation.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        log::info!(
            "User {} completed paid registration for event {} (payment {})",
            user_id,
            event_id,
            request.payment_id
        );
        Ok(registration)
    }

    /// Unregister from an event. Free (and uncharged) registrations delete
    /// outright; paid ones with a captured payment must go through the
    /// refund flow instead.
    pub async fn cancel_registration(&self, user_id: i64, event_id: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let registration = sqlx::query_as::<_, EventRegistration>(
            "SELECT * FROM event_registrations WHERE user_id = $1 AND event_id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))?;

        if let Some(reason) = cancellation_blocked(&registration) {
            return Err(AppError::ValidationError(reason.to_string()));
        }

        sqlx::query("DELETE FROM event_registrations WHERE id = $1")
            .bind(registration.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        log::info!(
            "User {} cancelled registration for event {}",
            user_id,
            event_id
        );
        Ok(())
    }

    pub async fn my_events(&self, user_id: i64) -> AppResult<Vec<MyEventRow>> {
        let rows = sqlx::query_as::<_, MyEventRow>(
            r#"
            SELECT e.id AS event_id, e.name AS event_name, e.date AS event_date,
                   e.event_type, r.registered_at, r.payment_status, r.final_price,
                   r.registration_type
            FROM event_registrations r
            JOIN events e ON e.id = r.event_id
            WHERE r.user_id = $1
            ORDER BY e.date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete expired holds. Run periodically so a closed tab cannot strand
    /// a seat.
    pub async fn sweep_expired(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM reservations WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(user_id: i64, event_id: i64, ttl_seconds: i64) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            tier_id: None,
            sub_event_ids: vec![],
            credits_used: 0,
            final_price: Some(1500),
            payment_email: None,
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        }
    }

    fn registration(registration_type: &str, payment_id: Option<&str>) -> EventRegistration {
        EventRegistration {
            id: 1,
            user_id: 7,
            event_id: 3,
            registered_at: Utc::now(),
            payment_status: "completed".to_string(),
            payment_id: payment_id.map(|p| p.to_string()),
            payment_email: None,
            tier_id: None,
            sub_event_ids: vec![],
            credits_used: 0,
            final_price: if payment_id.is_some() { 1500 } else { 0 },
            registration_type: registration_type.to_string(),
        }
    }

    #[test]
    fn test_hold_accepted_only_for_owner_and_event() {
        let now = Utc::now();
        let reservation = hold(7, 3, 600);

        assert!(validate_hold(&reservation, 7, 3, now).is_ok());
        assert!(matches!(
            validate_hold(&reservation, 8, 3, now),
            Err(AppError::PermissionDenied)
        ));
        assert!(matches!(
            validate_hold(&reservation, 7, 4, now),
            Err(AppError::PermissionDenied)
        ));
    }

    #[test]
    fn test_expired_hold_is_rejected() {
        let reservation = hold(7, 3, -1);
        assert!(matches!(
            validate_hold(&reservation, 7, 3, Utc::now()),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_hold_expiring_exactly_now_is_rejected() {
        let reservation = hold(7, 3, 0);
        assert!(validate_hold(&reservation, 7, 3, reservation.expires_at).is_err());
    }

    #[test]
    fn test_free_registration_can_be_cancelled() {
        assert!(cancellation_blocked(&registration("free", None)).is_none());
    }

    #[test]
    fn test_paid_registration_with_payment_goes_through_refunds() {
        let blocked = cancellation_blocked(&registration("paid", Some("pay_123")));
        assert!(blocked.is_some());
    }

    #[test]
    fn test_paid_registration_without_payment_can_be_cancelled() {
        // Covers fully-credit-covered registrations, which carry no gateway
        // payment id.
        assert!(cancellation_blocked(&registration("paid", None)).is_none());
    }
}
