use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;

/// A spend must be positive and covered by the available balance.
pub(crate) fn check_credit_spend(amount: i64, balance: i64) -> AppResult<()> {
    if amount <= 0 {
        return Err(AppError::ValidationError(
            "Amount must be positive".to_string(),
        ));
    }
    if balance < amount {
        return Err(AppError::ValidationError(
            "Insufficient credit balance".to_string(),
        ));
    }
    Ok(())
}

/// Credit balances are a ledger: `users.credit_balance` always equals the
/// sum of the user's `credit_transactions` rows, and every change writes
/// both inside one transaction.
#[derive(Clone)]
pub struct CreditService {
    pool: DbPool,
}

impl CreditService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_credits(&self, user_id: i64) -> AppResult<CreditsResponse> {
        let balance =
            sqlx::query_scalar::<_, i64>("SELECT credit_balance FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let history = sqlx::query_as::<_, CreditTransaction>(
            "SELECT * FROM credit_transactions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(CreditsResponse { balance, history })
    }

    pub async fn spend(
        &self,
        user_id: i64,
        request: SpendCreditsRequest,
    ) -> AppResult<CreditsResponse> {
        let mut tx = self.pool.begin().await?;

        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT credit_balance FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        check_credit_spend(request.amount, balance)?;

        let description = request
            .description
            .unwrap_or_else(|| "Credits spent".to_string());

        sqlx::query(
            "INSERT INTO credit_transactions (user_id, amount, description, event_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(-request.amount)
        .bind(&description)
        .bind(request.event_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET credit_balance = credit_balance - $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(request.amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!("User {} spent {} credits", user_id, request.amount);
        self.get_credits(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spend_within_balance_accepted() {
        assert!(check_credit_spend(500, 500).is_ok());
        assert!(check_credit_spend(1, 500).is_ok());
    }

    #[test]
    fn test_overspend_rejected() {
        assert!(matches!(
            check_credit_spend(501, 500),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_non_positive_spend_rejected() {
        assert!(check_credit_spend(0, 500).is_err());
        assert!(check_credit_spend(-100, 500).is_err());
    }
}
