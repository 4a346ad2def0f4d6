use chrono::Utc;

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::pricing;

#[derive(Clone)]
pub struct EventService {
    pool: DbPool,
}

impl EventService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Browse events visible to the caller. Archived events are hidden;
    /// UofT-only events are hidden from other universities; target-year
    /// restrictions are honored ("All years" is always visible).
    pub async fn list_events(&self, user_id: i64) -> AppResult<Vec<EventResponse>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE is_archived = FALSE ORDER BY date ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut responses = Vec::new();
        for event in events {
            if !event_visible_to(&event, &user) {
                continue;
            }
            responses.push(self.build_response(event).await?);
        }
        Ok(responses)
    }

    pub async fn list_all_events(&self) -> AppResult<Vec<EventResponse>> {
        let events = sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY date DESC")
            .fetch_all(&self.pool)
            .await?;

        let mut responses = Vec::new();
        for event in events {
            responses.push(self.build_response(event).await?);
        }
        Ok(responses)
    }

    pub async fn get_event(&self, event_id: i64) -> AppResult<EventResponse> {
        let event = self.fetch_event(event_id).await?;
        self.build_response(event).await
    }

    pub async fn create_event(&self, request: CreateEventRequest) -> AppResult<EventResponse> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError("Event name is required".to_string()));
        }
        if request.capacity < 0 {
            return Err(AppError::ValidationError(
                "Capacity cannot be negative".to_string(),
            ));
        }

        let advanced = request.enable_advanced_ticketing.unwrap_or(false);
        let sub_events_enabled = request.enable_sub_events.unwrap_or(false);

        if advanced && sub_events_enabled {
            let tiers = request.ticket_tiers.clone().unwrap_or_default();
            let subs = request.sub_events.clone().unwrap_or_default();
            check_matrix(&tiers, &subs)?;
        }

        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (name, description, target_year, fee, capacity, is_uoft_only,
                                enable_advanced_ticketing, enable_sub_events, date,
                                refund_deadline, event_type, image)
            VALUES ($1, $2, COALESCE($3, 'All years'), COALESCE($4, 0), $5, COALESCE($6, FALSE),
                    $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(&request.target_year)
        .bind(request.fee)
        .bind(request.capacity)
        .bind(request.is_uoft_only)
        .bind(advanced)
        .bind(sub_events_enabled)
        .bind(request.date)
        .bind(request.refund_deadline)
        .bind(&request.event_type)
        .bind(&request.image)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(subs) = &request.sub_events {
            insert_sub_events(&mut tx, event.id, subs).await?;
        }
        if let Some(tiers) = &request.ticket_tiers {
            insert_tiers(&mut tx, event.id, tiers).await?;
        }

        tx.commit().await?;

        log::info!("Event created: {} ({})", event.name, event.id);
        self.build_response(event).await
    }

    pub async fn update_event(
        &self,
        event_id: i64,
        request: UpdateEventRequest,
    ) -> AppResult<EventResponse> {
        let existing = self.fetch_event(event_id).await?;

        let advanced = request
            .enable_advanced_ticketing
            .unwrap_or(existing.enable_advanced_ticketing);
        let sub_events_enabled = request
            .enable_sub_events
            .unwrap_or(existing.enable_sub_events);

        // Validate the matrix against whichever side of it is being replaced,
        // falling back to the stored rows for the other side. A sub-event
        // capacity edit that arrives without new tiers gets its matrix
        // columns rebalanced across the stored tiers where the heuristic
        // applies.
        let mut rebalanced_tiers: Option<Vec<TicketTierInput>> = None;
        if advanced && sub_events_enabled {
            let mut tiers: Vec<TicketTierInput> = match &request.ticket_tiers {
                Some(t) => t.clone(),
                None => self
                    .fetch_tiers(event_id)
                    .await?
                    .into_iter()
                    .map(tier_to_input)
                    .collect(),
            };
            let subs: Vec<SubEventInput> = match &request.sub_events {
                Some(s) => s.clone(),
                None => self
                    .fetch_sub_events(event_id)
                    .await?
                    .into_iter()
                    .map(sub_event_to_input)
                    .collect(),
            };

            if request.sub_events.is_some() && request.ticket_tiers.is_none() {
                let stored_subs = self.fetch_sub_events(event_id).await?;
                let mut applied = false;
                for (column, sub) in subs.iter().enumerate() {
                    let old_capacity = stored_subs.get(column).map(|s| s.capacity);
                    if old_capacity != Some(sub.capacity)
                        && pricing::rebalance_matrix_column(&mut tiers, column, sub.capacity)
                            == pricing::RebalanceOutcome::Applied
                    {
                        applied = true;
                    }
                }
                if applied {
                    rebalanced_tiers = Some(tiers.clone());
                }
            }

            check_matrix(&tiers, &subs)?;
        }

        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                target_year = COALESCE($4, target_year),
                fee = COALESCE($5, fee),
                capacity = COALESCE($6, capacity),
                is_archived = COALESCE($7, is_archived),
                is_uoft_only = COALESCE($8, is_uoft_only),
                enable_advanced_ticketing = COALESCE($9, enable_advanced_ticketing),
                enable_sub_events = COALESCE($10, enable_sub_events),
                date = COALESCE($11, date),
                refund_deadline = COALESCE($12, refund_deadline),
                event_type = COALESCE($13, event_type),
                image = COALESCE($14, image),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.target_year)
        .bind(request.fee)
        .bind(request.capacity)
        .bind(request.is_archived)
        .bind(request.is_uoft_only)
        .bind(request.enable_advanced_ticketing)
        .bind(request.enable_sub_events)
        .bind(request.date)
        .bind(request.refund_deadline)
        .bind(&request.event_type)
        .bind(&request.image)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(subs) = &request.sub_events {
            sqlx::query("DELETE FROM sub_events WHERE event_id = $1")
                .bind(event_id)
                .execute(&mut *tx)
                .await?;
            insert_sub_events(&mut tx, event_id, subs).await?;
        }
        if let Some(tiers) = request.ticket_tiers.as_ref().or(rebalanced_tiers.as_ref()) {
            sqlx::query("DELETE FROM ticket_tiers WHERE event_id = $1")
                .bind(event_id)
                .execute(&mut *tx)
                .await?;
            insert_tiers(&mut tx, event_id, tiers).await?;
        }

        tx.commit().await?;
        self.build_response(event).await
    }

    pub async fn delete_event(&self, event_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
        log::info!("Event deleted: {}", event_id);
        Ok(())
    }

    /// Tiers (annotated with availability) and sub-events for the selection UI.
    pub async fn ticket_options(&self, event_id: i64) -> AppResult<TicketOptionsResponse> {
        self.fetch_event(event_id).await?;

        let tiers = self.fetch_tiers(event_id).await?;
        let now = Utc::now();
        let mut options = Vec::new();
        for tier in tiers {
            let remaining = self.tier_remaining(&tier).await?;
            options.push(TierOption {
                id: tier.id,
                name: tier.name.clone(),
                price: tier.price,
                capacity: tier.capacity,
                target_year: tier.target_year.clone(),
                start_date: tier.start_date,
                end_date: tier.end_date,
                is_active: tier.is_active,
                sub_event_prices: tier.sub_event_prices.clone(),
                sub_event_capacities: tier.sub_event_capacities.clone(),
                remaining,
                is_available: pricing::tier_is_available(&tier, remaining, now),
            });
        }

        let sub_events = self.fetch_sub_events(event_id).await?;

        Ok(TicketOptionsResponse {
            tiers: options,
            sub_events,
        })
    }

    pub async fn capacity(&self, event_id: i64) -> AppResult<CapacityResponse> {
        let event = self.fetch_event(event_id).await?;
        let summary = self.pricing_summary(&event).await?;
        Ok(CapacityResponse {
            capacity: summary.effective_capacity,
            available: summary.effective_remaining,
        })
    }

    pub(crate) async fn fetch_event(&self, event_id: i64) -> AppResult<Event> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    async fn fetch_tiers(&self, event_id: i64) -> AppResult<Vec<TicketTier>> {
        let tiers = sqlx::query_as::<_, TicketTier>(
            "SELECT * FROM ticket_tiers WHERE event_id = $1 ORDER BY price ASC, start_date ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tiers)
    }

    async fn fetch_sub_events(&self, event_id: i64) -> AppResult<Vec<SubEvent>> {
        let subs = sqlx::query_as::<_, SubEvent>(
            "SELECT * FROM sub_events WHERE event_id = $1 ORDER BY id ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(subs)
    }

    /// Seats left in a tier, counting both registrations and unexpired holds.
    async fn tier_remaining(&self, tier: &TicketTier) -> AppResult<i64> {
        let registered = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM event_registrations WHERE tier_id = $1",
        )
        .bind(tier.id)
        .fetch_one(&self.pool)
        .await?;

        let held = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations WHERE tier_id = $1 AND expires_at > NOW()",
        )
        .bind(tier.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(tier.capacity as i64 - registered - held)
    }

    async fn sub_event_remaining(&self, sub_event: &SubEvent) -> AppResult<i64> {
        let registered = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM event_registrations WHERE event_id = $1 AND $2 = ANY(sub_event_ids)",
        )
        .bind(sub_event.event_id)
        .bind(sub_event.id)
        .fetch_one(&self.pool)
        .await?;

        let held = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations WHERE event_id = $1 AND $2 = ANY(sub_event_ids) AND expires_at > NOW()",
        )
        .bind(sub_event.event_id)
        .bind(sub_event.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sub_event.capacity as i64 - registered - held)
    }

    async fn registered_count(&self, event_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM event_registrations WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn event_level_remaining(&self, event: &Event) -> AppResult<i64> {
        let registered = self.registered_count(event.id).await?;
        let held = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations WHERE event_id = $1 AND expires_at > NOW()",
        )
        .bind(event.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(event.capacity as i64 - registered - held)
    }

    async fn pricing_summary(&self, event: &Event) -> AppResult<pricing::PricingSummary> {
        let mut tiers_with_remaining = Vec::new();
        if event.enable_advanced_ticketing {
            for tier in self.fetch_tiers(event.id).await? {
                let remaining = self.tier_remaining(&tier).await?;
                tiers_with_remaining.push((tier, remaining));
            }
            pricing::sort_tiers_for_resolution(&mut tiers_with_remaining);
        }

        let mut subs_with_remaining = Vec::new();
        if event.enable_sub_events {
            for sub_event in self.fetch_sub_events(event.id).await? {
                let remaining = self.sub_event_remaining(&sub_event).await?;
                subs_with_remaining.push((sub_event, remaining));
            }
        }

        let event_remaining = self.event_level_remaining(event).await?;

        Ok(pricing::resolve_pricing(
            event,
            &tiers_with_remaining,
            &subs_with_remaining,
            event_remaining,
            Utc::now(),
        ))
    }

    async fn build_response(&self, event: Event) -> AppResult<EventResponse> {
        let registered_count = self.registered_count(event.id).await?;
        let pricing = self.pricing_summary(&event).await?;

        Ok(EventResponse {
            id: event.id,
            name: event.name,
            description: event.description,
            target_year: event.target_year,
            fee: event.fee,
            capacity: event.capacity,
            is_archived: event.is_archived,
            is_uoft_only: event.is_uoft_only,
            enable_advanced_ticketing: event.enable_advanced_ticketing,
            enable_sub_events: event.enable_sub_events,
            date: event.date,
            refund_deadline: event.refund_deadline,
            event_type: event.event_type,
            image: event.image,
            registered_count,
            pricing,
        })
    }
}

/// Audience filter for event browsing.
fn event_visible_to(event: &Event, user: &User) -> bool {
    if event.is_uoft_only && user.university != "University of Toronto" {
        return false;
    }
    if event.target_year != "All years" {
        let matches_year = event
            .target_year
            .split(',')
            .any(|year| year.trim() == user.current_year);
        if !matches_year {
            return false;
        }
    }
    true
}

fn check_matrix(tiers: &[TicketTierInput], subs: &[SubEventInput]) -> AppResult<()> {
    let check = pricing::validate_capacity_matrix(tiers, subs);
    if check.is_valid {
        Ok(())
    } else {
        Err(AppError::ValidationError(check.messages.join("; ")))
    }
}

fn tier_to_input(tier: TicketTier) -> TicketTierInput {
    TicketTierInput {
        name: tier.name,
        price: tier.price,
        capacity: tier.capacity,
        target_year: Some(tier.target_year),
        start_date: tier.start_date,
        end_date: tier.end_date,
        is_active: Some(tier.is_active),
        sub_event_prices: tier.sub_event_prices,
        sub_event_capacities: tier.sub_event_capacities,
    }
}

fn sub_event_to_input(sub_event: SubEvent) -> SubEventInput {
    SubEventInput {
        name: sub_event.name,
        description: sub_event.description,
        price: sub_event.price,
        capacity: sub_event.capacity,
        is_standalone: Some(sub_event.is_standalone),
        is_combo_option: Some(sub_event.is_combo_option),
    }
}

async fn insert_sub_events(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event_id: i64,
    sub_events: &[SubEventInput],
) -> AppResult<()> {
    for sub_event in sub_events {
        sqlx::query(
            r#"
            INSERT INTO sub_events (event_id, name, description, price, capacity, is_standalone, is_combo_option)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, TRUE), COALESCE($7, FALSE))
            "#,
        )
        .bind(event_id)
        .bind(&sub_event.name)
        .bind(&sub_event.description)
        .bind(sub_event.price)
        .bind(sub_event.capacity)
        .bind(sub_event.is_standalone)
        .bind(sub_event.is_combo_option)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_tiers(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event_id: i64,
    tiers: &[TicketTierInput],
) -> AppResult<()> {
    for tier in tiers {
        sqlx::query(
            r#"
            INSERT INTO ticket_tiers (event_id, name, price, capacity, target_year, start_date,
                                      end_date, is_active, sub_event_prices, sub_event_capacities)
            VALUES ($1, $2, $3, $4, COALESCE($5, 'All years'), $6, $7, COALESCE($8, TRUE), $9, $10)
            "#,
        )
        .bind(event_id)
        .bind(&tier.name)
        .bind(tier.price)
        .bind(tier.capacity)
        .bind(&tier.target_year)
        .bind(tier.start_date)
        .bind(tier.end_date)
        .bind(tier.is_active)
        .bind(&tier.sub_event_prices)
        .bind(&tier.sub_event_capacities)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(university: &str, year: &str) -> User {
        let now = Utc::now();
        User {
            id: 1,
            email: "a@b.c".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            password_hash: String::new(),
            university: university.to_string(),
            current_year: year.to_string(),
            graduation_year: None,
            major: None,
            is_admin: false,
            credit_balance: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn event(uoft_only: bool, target_year: &str) -> Event {
        let now = Utc::now();
        Event {
            id: 1,
            name: "Mixer".to_string(),
            description: String::new(),
            target_year: target_year.to_string(),
            fee: 0,
            capacity: 100,
            is_archived: false,
            is_uoft_only: uoft_only,
            enable_advanced_ticketing: false,
            enable_sub_events: false,
            date: now + Duration::days(7),
            refund_deadline: None,
            event_type: "social".to_string(),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn uoft_only_hidden_from_other_universities() {
        let e = event(true, "All years");
        assert!(event_visible_to(&e, &user("University of Toronto", "1st year")));
        assert!(!event_visible_to(&e, &user("York University", "1st year")));
    }

    #[test]
    fn target_year_restrictions_honored() {
        let e = event(false, "3rd year,4th year");
        assert!(event_visible_to(&e, &user("University of Toronto", "3rd year")));
        assert!(!event_visible_to(&e, &user("University of Toronto", "1st year")));

        let all = event(false, "All years");
        assert!(event_visible_to(&all, &user("York University", "1st year")));
    }
}
