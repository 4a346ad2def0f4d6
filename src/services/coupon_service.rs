use chrono::Utc;

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::generate_coupon_code;

#[derive(Clone)]
pub struct CouponService {
    pool: DbPool,
}

impl CouponService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create_coupon(&self, request: CreateCouponRequest) -> AppResult<Coupon> {
        if request.discount_type != "percentage" && request.discount_type != "fixed" {
            return Err(AppError::ValidationError(
                "Discount type must be 'percentage' or 'fixed'".to_string(),
            ));
        }
        if request.discount_value <= 0 {
            return Err(AppError::ValidationError(
                "Discount value must be positive".to_string(),
            ));
        }
        if request.discount_type == "percentage" && request.discount_value > 100 {
            return Err(AppError::ValidationError(
                "Percentage discount cannot exceed 100".to_string(),
            ));
        }

        let code = match request.code {
            Some(code) => code.trim().to_uppercase(),
            None => generate_coupon_code(),
        };

        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM coupons WHERE code = $1")
            .bind(&code)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("Coupon code already exists".to_string()));
        }

        let coupon = sqlx::query_as::<_, Coupon>(
            r#"
            INSERT INTO coupons (code, name, description, discount_type, discount_value,
                                 min_amount, max_uses, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&code)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.discount_type)
        .bind(request.discount_value)
        .bind(request.min_amount)
        .bind(request.max_uses)
        .bind(request.expires_at)
        .fetch_one(&self.pool)
        .await?;

        log::info!("Coupon created: {}", coupon.code);
        Ok(coupon)
    }

    pub async fn list_coupons(&self) -> AppResult<Vec<Coupon>> {
        let coupons =
            sqlx::query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(coupons)
    }

    pub async fn validate(&self, request: ValidateCouponRequest) -> AppResult<ValidateCouponResponse> {
        let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
            .bind(request.code.trim().to_uppercase())
            .fetch_optional(&self.pool)
            .await?;

        let coupon = match coupon {
            Some(c) => c,
            None => return Ok(invalid("Coupon not found", request.amount)),
        };

        if let Some(reason) = rejection_reason(&coupon, request.amount) {
            return Ok(invalid(reason, request.amount));
        }

        let discount = compute_discount(&coupon, request.amount);
        Ok(ValidateCouponResponse {
            valid: true,
            discount,
            final_amount: request.amount - discount,
            message: None,
        })
    }

    /// Validate, record the usage row, and bump the use counter.
    pub async fn redeem(
        &self,
        user_id: i64,
        event_id: i64,
        request: ValidateCouponRequest,
    ) -> AppResult<ValidateCouponResponse> {
        let mut tx = self.pool.begin().await?;

        let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1 FOR UPDATE")
            .bind(request.code.trim().to_uppercase())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))?;

        if let Some(reason) = rejection_reason(&coupon, request.amount) {
            return Err(AppError::ValidationError(reason.to_string()));
        }

        let discount = compute_discount(&coupon, request.amount);

        sqlx::query(
            "INSERT INTO coupon_usages (coupon_id, user_id, event_id, discount_amount) VALUES ($1, $2, $3, $4)",
        )
        .bind(coupon.id)
        .bind(user_id)
        .bind(event_id)
        .bind(discount)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE coupons SET current_uses = current_uses + 1 WHERE id = $1")
            .bind(coupon.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        log::info!(
            "Coupon {} redeemed by user {} for event {} ({} off)",
            coupon.code,
            user_id,
            event_id,
            discount
        );
        Ok(ValidateCouponResponse {
            valid: true,
            discount,
            final_amount: request.amount - discount,
            message: None,
        })
    }
}

fn invalid(message: &str, amount: i64) -> ValidateCouponResponse {
    ValidateCouponResponse {
        valid: false,
        discount: 0,
        final_amount: amount,
        message: Some(message.to_string()),
    }
}

fn rejection_reason(coupon: &Coupon, amount: i64) -> Option<&'static str> {
    if !coupon.is_active {
        return Some("Coupon is not active");
    }
    if let Some(expires_at) = coupon.expires_at {
        if Utc::now() > expires_at {
            return Some("Coupon has expired");
        }
    }
    if let Some(max_uses) = coupon.max_uses {
        if coupon.current_uses >= max_uses {
            return Some("Coupon has reached its usage limit");
        }
    }
    if let Some(min_amount) = coupon.min_amount {
        if amount < min_amount {
            return Some("Amount is below the coupon minimum");
        }
    }
    None
}

/// Percentage discounts round down; fixed discounts are capped at the amount.
fn compute_discount(coupon: &Coupon, amount: i64) -> i64 {
    match coupon.discount_type.as_str() {
        "percentage" => amount * coupon.discount_value / 100,
        _ => coupon.discount_value.min(amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(discount_type: &str, value: i64) -> Coupon {
        Coupon {
            id: 1,
            code: "WELCOME".to_string(),
            name: "Welcome".to_string(),
            description: None,
            discount_type: discount_type.to_string(),
            discount_value: value,
            min_amount: None,
            max_uses: None,
            current_uses: 0,
            is_active: true,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_discount_rounds_down() {
        let c = coupon("percentage", 15);
        assert_eq!(compute_discount(&c, 999), 149); // 149.85 floors
        assert_eq!(compute_discount(&c, 1000), 150);
    }

    #[test]
    fn fixed_discount_capped_at_amount() {
        let c = coupon("fixed", 500);
        assert_eq!(compute_discount(&c, 300), 300);
        assert_eq!(compute_discount(&c, 800), 500);
    }

    #[test]
    fn inactive_expired_exhausted_rejected() {
        let mut c = coupon("fixed", 100);
        c.is_active = false;
        assert_eq!(rejection_reason(&c, 1000), Some("Coupon is not active"));

        let mut c = coupon("fixed", 100);
        c.expires_at = Some(Utc::now() - Duration::days(1));
        assert_eq!(rejection_reason(&c, 1000), Some("Coupon has expired"));

        let mut c = coupon("fixed", 100);
        c.max_uses = Some(5);
        c.current_uses = 5;
        assert_eq!(
            rejection_reason(&c, 1000),
            Some("Coupon has reached its usage limit")
        );
    }

    #[test]
    fn min_amount_enforced() {
        let mut c = coupon("percentage", 10);
        c.min_amount = Some(2000);
        assert_eq!(
            rejection_reason(&c, 1999),
            Some("Amount is below the coupon minimum")
        );
        assert_eq!(rejection_reason(&c, 2000), None);
    }
}
