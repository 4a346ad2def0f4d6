//! Pure pricing/capacity logic for events with tiered ticketing.
//!
//! Advanced-ticketing events carry a (tier × sub-event) matrix: each tier
//! stores per-sub-event seat allocations aligned by index with the event's
//! sub-event list. Column sums must equal the sub-events' declared
//! capacities; `validate_capacity_matrix` checks that on every write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::event::{Event, SubEvent, SubEventInput, TicketTier, TicketTierInput};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PriceDisplay {
    Flat,
    Tier,
    Range,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PricingSummary {
    pub effective_capacity: i64,
    pub effective_remaining: i64,
    pub display: PriceDisplay,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MatrixCheck {
    pub is_valid: bool,
    pub messages: Vec<String>,
}

/// Verify that for every sub-event index the summed tier allocations equal
/// the sub-event's declared capacity. A tier row that is missing or shorter
/// than the sub-event list contributes 0 for the missing cells. The check
/// never repairs the matrix.
pub fn validate_capacity_matrix(
    tiers: &[TicketTierInput],
    sub_events: &[SubEventInput],
) -> MatrixCheck {
    let mut messages = Vec::new();

    for (j, sub_event) in sub_events.iter().enumerate() {
        let tier_total: i64 = tiers
            .iter()
            .map(|t| {
                t.sub_event_capacities
                    .as_ref()
                    .and_then(|caps| caps.get(j))
                    .copied()
                    .unwrap_or(0) as i64
            })
            .sum();

        if tier_total != sub_event.capacity as i64 {
            messages.push(format!(
                "{}: Tier total ({}) ≠ Sub-event capacity ({})",
                sub_event.name, tier_total, sub_event.capacity
            ));
        }
    }

    MatrixCheck {
        is_valid: messages.is_empty(),
        messages,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceOutcome {
    Applied,
    NotApplied,
}

/// Redistribute one matrix column after a sub-event capacity edit.
///
/// A single tier absorbs the full capacity. A two-tier "Early Bird" /
/// "Regular" pair splits 60% (rounded down) / remainder. Any other tier
/// shape is left untouched and reported as such.
pub fn rebalance_matrix_column(
    tiers: &mut [TicketTierInput],
    column: usize,
    new_capacity: i32,
) -> RebalanceOutcome {
    fn set_cell(tier: &mut TicketTierInput, column: usize, value: i32) {
        let caps = tier.sub_event_capacities.get_or_insert_with(Vec::new);
        if caps.len() <= column {
            caps.resize(column + 1, 0);
        }
        caps[column] = value;
    }

    match tiers.len() {
        1 => {
            set_cell(&mut tiers[0], column, new_capacity);
            RebalanceOutcome::Applied
        }
        2 => {
            let early = tiers.iter().position(|t| t.name == "Early Bird");
            let regular = tiers.iter().position(|t| t.name == "Regular");
            match (early, regular) {
                (Some(e), Some(r)) => {
                    let early_share = (new_capacity as i64 * 60 / 100) as i32;
                    set_cell(&mut tiers[e], column, early_share);
                    set_cell(&mut tiers[r], column, new_capacity - early_share);
                    RebalanceOutcome::Applied
                }
                _ => RebalanceOutcome::NotApplied,
            }
        }
        _ => RebalanceOutcome::NotApplied,
    }
}

/// A tier is purchasable when active, within its sale window, and not sold out.
pub fn tier_is_available(tier: &TicketTier, remaining: i64, now: DateTime<Utc>) -> bool {
    tier.is_active && tier.start_date <= now && now <= tier.end_date && remaining > 0
}

/// Sort tiers for "first available wins" resolution: cheapest first, earliest
/// sale window breaking ties.
pub fn sort_tiers_for_resolution(tiers: &mut [(TicketTier, i64)]) {
    tiers.sort_by(|(a, _), (b, _)| {
        a.price
            .cmp(&b.price)
            .then_with(|| a.start_date.cmp(&b.start_date))
    });
}

/// Resolve the effective capacity, remaining seats, and displayed price for
/// an event. Tiers win over sub-events, which win over the flat event values.
/// Each tier/sub-event is paired with its remaining seat count.
pub fn resolve_pricing(
    event: &Event,
    tiers: &[(TicketTier, i64)],
    sub_events: &[(SubEvent, i64)],
    event_remaining: i64,
    now: DateTime<Utc>,
) -> PricingSummary {
    let use_tiers = event.enable_advanced_ticketing && !tiers.is_empty();
    let use_sub_events = event.enable_sub_events && !sub_events.is_empty();

    let (effective_capacity, effective_remaining) = if use_tiers {
        (
            tiers.iter().map(|(t, _)| t.capacity as i64).sum(),
            tiers.iter().map(|(_, r)| r.max(&0)).sum(),
        )
    } else if use_sub_events {
        (
            sub_events.iter().map(|(s, _)| s.capacity as i64).sum(),
            sub_events.iter().map(|(_, r)| r.max(&0)).sum(),
        )
    } else {
        (event.capacity as i64, event_remaining.max(0))
    };

    if use_tiers {
        if let Some((tier, _)) = tiers
            .iter()
            .find(|(t, remaining)| tier_is_available(t, *remaining, now))
        {
            return PricingSummary {
                effective_capacity,
                effective_remaining,
                display: PriceDisplay::Tier,
                price: Some(tier.price),
                min_price: None,
                max_price: None,
                tier_name: Some(tier.name.clone()),
            };
        }
    }

    if use_sub_events {
        let min = sub_events.iter().map(|(s, _)| s.price).min();
        let max = sub_events.iter().map(|(s, _)| s.price).max();
        return PricingSummary {
            effective_capacity,
            effective_remaining,
            display: PriceDisplay::Range,
            price: None,
            min_price: min,
            max_price: max,
            tier_name: None,
        };
    }

    PricingSummary {
        effective_capacity,
        effective_remaining,
        display: PriceDisplay::Flat,
        price: Some(event.fee),
        min_price: None,
        max_price: None,
        tier_name: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tier_input(name: &str, caps: Option<Vec<i32>>) -> TicketTierInput {
        let now = Utc::now();
        TicketTierInput {
            name: name.to_string(),
            price: 1000,
            capacity: 50,
            target_year: None,
            start_date: now,
            end_date: now + Duration::days(30),
            is_active: Some(true),
            sub_event_prices: None,
            sub_event_capacities: caps,
        }
    }

    fn sub_event_input(name: &str, capacity: i32) -> SubEventInput {
        SubEventInput {
            name: name.to_string(),
            description: None,
            price: 1500,
            capacity,
            is_standalone: Some(true),
            is_combo_option: Some(false),
        }
    }

    fn test_event(fee: i64, capacity: i32, tiers: bool, subs: bool) -> Event {
        let now = Utc::now();
        Event {
            id: 1,
            name: "Gala".to_string(),
            description: "Annual gala".to_string(),
            target_year: "All years".to_string(),
            fee,
            capacity,
            is_archived: false,
            is_uoft_only: false,
            enable_advanced_ticketing: tiers,
            enable_sub_events: subs,
            date: now + Duration::days(10),
            refund_deadline: None,
            event_type: "social".to_string(),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn tier_row(id: i64, name: &str, price: i64, capacity: i32, active: bool) -> TicketTier {
        let now = Utc::now();
        TicketTier {
            id,
            event_id: 1,
            name: name.to_string(),
            price,
            capacity,
            target_year: "All years".to_string(),
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
            is_active: active,
            sub_event_prices: None,
            sub_event_capacities: None,
            created_at: now,
        }
    }

    fn sub_event_row(id: i64, price: i64, capacity: i32) -> SubEvent {
        SubEvent {
            id,
            event_id: 1,
            name: format!("Session {id}"),
            description: None,
            price,
            capacity,
            is_standalone: true,
            is_combo_option: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn matrix_passes_when_columns_sum() {
        let tiers = vec![
            tier_input("Early Bird", Some(vec![30, 12])),
            tier_input("Regular", Some(vec![20, 8])),
        ];
        let subs = vec![sub_event_input("Dinner", 50), sub_event_input("Karaoke", 20)];

        let check = validate_capacity_matrix(&tiers, &subs);
        assert!(check.is_valid);
        assert!(check.messages.is_empty());
    }

    #[test]
    fn matrix_flags_each_mismatched_column() {
        let tiers = vec![
            tier_input("Early Bird", Some(vec![30, 12])),
            tier_input("Regular", Some(vec![25, 8])),
        ];
        let subs = vec![sub_event_input("Dinner", 50), sub_event_input("Karaoke", 25)];

        let check = validate_capacity_matrix(&tiers, &subs);
        assert!(!check.is_valid);
        assert_eq!(check.messages.len(), 2);
        assert_eq!(
            check.messages[0],
            "Dinner: Tier total (55) ≠ Sub-event capacity (50)"
        );
        assert_eq!(
            check.messages[1],
            "Karaoke: Tier total (20) ≠ Sub-event capacity (25)"
        );
    }

    #[test]
    fn matrix_treats_short_rows_as_zero() {
        let tiers = vec![
            tier_input("Early Bird", Some(vec![50])),
            tier_input("Regular", None),
        ];
        let subs = vec![sub_event_input("Dinner", 50), sub_event_input("Karaoke", 20)];

        let check = validate_capacity_matrix(&tiers, &subs);
        assert!(!check.is_valid);
        assert_eq!(
            check.messages,
            vec!["Karaoke: Tier total (0) ≠ Sub-event capacity (20)".to_string()]
        );
    }

    #[test]
    fn rebalance_single_tier_takes_all() {
        let mut tiers = vec![tier_input("General", Some(vec![10]))];
        let outcome = rebalance_matrix_column(&mut tiers, 0, 80);
        assert_eq!(outcome, RebalanceOutcome::Applied);
        assert_eq!(tiers[0].sub_event_capacities, Some(vec![80]));
    }

    #[test]
    fn rebalance_splits_early_bird_sixty_forty() {
        let mut tiers = vec![
            tier_input("Regular", Some(vec![0])),
            tier_input("Early Bird", Some(vec![0])),
        ];
        let outcome = rebalance_matrix_column(&mut tiers, 0, 50);
        assert_eq!(outcome, RebalanceOutcome::Applied);
        assert_eq!(tiers[1].sub_event_capacities, Some(vec![30]));
        assert_eq!(tiers[0].sub_event_capacities, Some(vec![20]));
    }

    #[test]
    fn rebalance_rounds_early_bird_down() {
        let mut tiers = vec![
            tier_input("Early Bird", None),
            tier_input("Regular", None),
        ];
        let outcome = rebalance_matrix_column(&mut tiers, 1, 25);
        assert_eq!(outcome, RebalanceOutcome::Applied);
        // 60% of 25 is 15; cells before the edited column are padded with 0.
        assert_eq!(tiers[0].sub_event_capacities, Some(vec![0, 15]));
        assert_eq!(tiers[1].sub_event_capacities, Some(vec![0, 10]));
    }

    #[test]
    fn rebalance_leaves_other_shapes_untouched() {
        let mut tiers = vec![
            tier_input("VIP", Some(vec![5])),
            tier_input("General", Some(vec![10])),
        ];
        let outcome = rebalance_matrix_column(&mut tiers, 0, 40);
        assert_eq!(outcome, RebalanceOutcome::NotApplied);
        assert_eq!(tiers[0].sub_event_capacities, Some(vec![5]));
        assert_eq!(tiers[1].sub_event_capacities, Some(vec![10]));
    }

    #[test]
    fn resolver_picks_first_available_tier() {
        let event = test_event(2000, 100, true, false);
        let tiers = vec![
            (tier_row(1, "Early Bird", 1000, 40, true), 0), // sold out
            (tier_row(2, "Regular", 1500, 60, true), 25),
        ];

        let summary = resolve_pricing(&event, &tiers, &[], 0, Utc::now());
        assert_eq!(summary.display, PriceDisplay::Tier);
        assert_eq!(summary.price, Some(1500));
        assert_eq!(summary.tier_name.as_deref(), Some("Regular"));
        assert_eq!(summary.effective_capacity, 100);
        assert_eq!(summary.effective_remaining, 25);
    }

    #[test]
    fn resolver_skips_inactive_and_out_of_window_tiers() {
        let event = test_event(2000, 100, true, false);
        let now = Utc::now();
        let mut closed = tier_row(1, "Early Bird", 1000, 40, true);
        closed.end_date = now - Duration::days(1);
        let inactive = tier_row(2, "Regular", 1500, 60, false);

        let summary = resolve_pricing(&event, &[(closed, 40), (inactive, 60)], &[], 0, now);
        // No purchasable tier and no sub-events: flat fallback.
        assert_eq!(summary.display, PriceDisplay::Flat);
        assert_eq!(summary.price, Some(2000));
    }

    #[test]
    fn resolver_ranges_over_sub_events() {
        let event = test_event(0, 100, false, true);
        let subs = vec![
            (sub_event_row(1, 1200, 30), 10),
            (sub_event_row(2, 800, 20), 20),
        ];

        let summary = resolve_pricing(&event, &[], &subs, 0, Utc::now());
        assert_eq!(summary.display, PriceDisplay::Range);
        assert_eq!(summary.min_price, Some(800));
        assert_eq!(summary.max_price, Some(1200));
        assert_eq!(summary.effective_capacity, 50);
        assert_eq!(summary.effective_remaining, 30);
    }

    #[test]
    fn resolver_falls_back_to_flat_event() {
        let event = test_event(500, 80, false, false);
        let summary = resolve_pricing(&event, &[], &[], 35, Utc::now());
        assert_eq!(summary.display, PriceDisplay::Flat);
        assert_eq!(summary.price, Some(500));
        assert_eq!(summary.effective_capacity, 80);
        assert_eq!(summary.effective_remaining, 35);
    }

    #[test]
    fn sort_orders_by_price_then_start_date() {
        let now = Utc::now();
        let mut a = tier_row(1, "Regular", 1500, 60, true);
        let mut b = tier_row(2, "Early Bird", 1000, 40, true);
        let mut c = tier_row(3, "Early Bird 2", 1000, 40, true);
        a.start_date = now;
        b.start_date = now + Duration::days(1);
        c.start_date = now;

        let mut tiers = vec![(a, 1), (b, 1), (c, 1)];
        sort_tiers_for_resolution(&mut tiers);
        let names: Vec<&str> = tiers.iter().map(|(t, _)| t.name.as_str()).collect();
        assert_eq!(names, vec!["Early Bird 2", "Early Bird", "Regular"]);
    }
}
