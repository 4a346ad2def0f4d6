use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;

const EXPORT_HEADER: &str = "user_id,first_name,last_name,email,university,current_year,registered_at,payment_status,registration_type,final_price";

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render the participant list as CSV with a header row.
pub fn registrants_to_csv(rows: &[RegistrantRow]) -> String {
    let mut out = String::from(EXPORT_HEADER);
    out.push('\n');
    for row in rows {
        let fields = [
            row.user_id.to_string(),
            csv_field(&row.first_name),
            csv_field(&row.last_name),
            csv_field(&row.email),
            csv_field(&row.university),
            csv_field(&row.current_year),
            row.registered_at.to_rfc3339(),
            csv_field(&row.payment_status),
            csv_field(&row.registration_type),
            row.final_price.to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

#[derive(Clone)]
pub struct AnalyticsService {
    pool: DbPool,
}

impl AnalyticsService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn totals(&self) -> AppResult<AnalyticsTotals> {
        let totals = sqlx::query_as::<_, AnalyticsTotals>(
            r#"
            SELECT (SELECT COUNT(*) FROM events) AS total_events,
                   (SELECT COUNT(*) FROM users) AS total_users,
                   (SELECT COUNT(*) FROM event_registrations) AS total_registrations,
                   (SELECT COALESCE(SUM(final_price), 0)::BIGINT
                    FROM event_registrations
                    WHERE registration_type = 'paid' AND payment_status = 'completed') AS total_revenue
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    pub async fn per_event(&self) -> AppResult<Vec<EventAnalyticsRow>> {
        let rows = sqlx::query_as::<_, EventAnalyticsRow>(
            r#"
            SELECT e.id AS event_id, e.name AS event_name, e.date AS event_date,
                   COUNT(r.id) AS registrations,
                   COALESCE(SUM(r.final_price) FILTER (WHERE r.registration_type = 'paid' AND r.payment_status = 'completed'), 0)::BIGINT AS revenue
            FROM events e
            LEFT JOIN event_registrations r ON r.event_id = e.id
            GROUP BY e.id, e.name, e.date
            ORDER BY e.date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Registrant rows for one event, in registration order.
    pub async fn event_registrants(&self, event_id: i64) -> AppResult<Vec<RegistrantRow>> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        let rows = sqlx::query_as::<_, RegistrantRow>(
            r#"
            SELECT u.id AS user_id, u.first_name, u.last_name, u.email,
                   u.university, u.current_year, r.registered_at,
                   r.payment_status, r.registration_type, r.final_price
            FROM event_registrations r
            JOIN users u ON u.id = r.user_id
            WHERE r.event_id = $1
            ORDER BY r.registered_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(first_name: &str, email: &str) -> RegistrantRow {
        RegistrantRow {
            user_id: 42,
            first_name: first_name.to_string(),
            last_name: "Tanaka".to_string(),
            email: email.to_string(),
            university: "University of Toronto".to_string(),
            current_year: "3rd year".to_string(),
            registered_at: Utc::now(),
            payment_status: "completed".to_string(),
            registration_type: "paid".to_string(),
            final_price: 2500,
        }
    }

    #[test]
    fn test_export_starts_with_header() {
        let csv = registrants_to_csv(&[]);
        assert_eq!(csv, format!("{EXPORT_HEADER}\n"));
    }

    #[test]
    fn test_export_one_line_per_registrant() {
        let csv = registrants_to_csv(&[row("Yuki", "yuki@utoronto.ca"), row("Ken", "ken@utoronto.ca")]);
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("yuki@utoronto.ca"));
        assert!(csv.contains(",2500"));
    }

    #[test]
    fn test_fields_with_commas_and_quotes_are_escaped() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("Smith, Jr."), "\"Smith, Jr.\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
