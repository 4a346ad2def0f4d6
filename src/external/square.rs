use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::SquareConfig;
use crate::error::{AppError, AppResult};

const SQUARE_VERSION: &str = "2024-08-21";

/// Square refuses card charges below 50 cents.
pub const MINIMUM_CHARGE_CENTS: i64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquarePayment {
    pub id: String,
    pub status: String,
    pub amount_money: Money,
    pub buyer_email_address: Option<String>,
    pub receipt_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquareRefund {
    pub id: String,
    pub status: String,
    pub payment_id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentEnvelope {
    payment: SquarePayment,
}

#[derive(Debug, Deserialize)]
struct RefundEnvelope {
    refund: SquareRefund,
}

#[derive(Debug, Deserialize)]
struct PaymentListEnvelope {
    #[serde(default)]
    payments: Vec<SquarePayment>,
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<SquareErrorItem>,
}

#[derive(Debug, Deserialize)]
struct SquareErrorItem {
    code: Option<String>,
    detail: Option<String>,
}

#[derive(Clone)]
pub struct SquareClient {
    client: Client,
    config: SquareConfig,
    base_url: String,
}

impl SquareClient {
    pub fn new(config: SquareConfig) -> Self {
        // Sandbox tokens route to the sandbox host.
        let base_url = if config.access_token.contains("sandbox") {
            "https://connect.squareupsandbox.com".to_string()
        } else {
            "https://connect.squareup.com".to_string()
        };

        Self {
            client: Client::new(),
            config,
            base_url,
        }
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    /// Charge a Web Payments SDK token. Duplicate submissions
    /// (`PAYMENT_ALREADY_COMPLETED`, reused idempotency key) are treated as
    /// completed payments rather than errors.
    pub async fn create_payment(
        &self,
        source_id: &str,
        amount: i64,
        currency: &str,
        idempotency_key: &str,
        buyer_email: Option<&str>,
        note: Option<&str>,
    ) -> AppResult<SquarePayment> {
        let url = format!("{}/v2/payments", self.base_url);

        let mut body = json!({
            "source_id": source_id,
            "idempotency_key": idempotency_key,
            "amount_money": {
                "amount": amount,
                "currency": currency,
            },
            "location_id": self.config.location_id,
        });
        if let Some(email) = buyer_email {
            body["buyer_email_address"] = json!(email);
        }
        if let Some(note) = note {
            body["note"] = json!(note);
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .header("Square-Version", SQUARE_VERSION)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            let envelope: PaymentEnvelope = response.json().await?;
            return Ok(envelope.payment);
        }

        let text = response.text().await.unwrap_or_default();
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&text) {
            let duplicate = envelope.errors.iter().any(|e| {
                matches!(
                    e.code.as_deref(),
                    Some("PAYMENT_ALREADY_COMPLETED") | Some("IDEMPOTENCY_KEY_REUSED")
                )
            });
            if duplicate {
                log::info!("Duplicate Square payment submission treated as completed: {idempotency_key}");
                return Ok(SquarePayment {
                    id: format!("duplicate-{idempotency_key}"),
                    status: "COMPLETED".to_string(),
                    amount_money: Money {
                        amount,
                        currency: currency.to_string(),
                    },
                    buyer_email_address: buyer_email.map(|s| s.to_string()),
                    receipt_url: None,
                    created_at: None,
                });
            }
            let detail = envelope
                .errors
                .first()
                .and_then(|e| e.detail.clone())
                .unwrap_or_else(|| text.clone());
            return Err(AppError::ExternalApiError(format!(
                "Square payment failed: {detail}"
            )));
        }

        Err(AppError::ExternalApiError(format!(
            "Square payment failed: {text}"
        )))
    }

    pub async fn refund_payment(
        &self,
        payment_id: &str,
        amount: i64,
        currency: &str,
        idempotency_key: &str,
        reason: Option<&str>,
    ) -> AppResult<SquareRefund> {
        let url = format!("{}/v2/refunds", self.base_url);

        let mut body = json!({
            "idempotency_key": idempotency_key,
            "payment_id": payment_id,
            "amount_money": {
                "amount": amount,
                "currency": currency,
            },
        });
        if let Some(reason) = reason {
            body["reason"] = json!(reason);
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .header("Square-Version", SQUARE_VERSION)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            let envelope: RefundEnvelope = response.json().await?;
            Ok(envelope.refund)
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(AppError::ExternalApiError(format!(
                "Square refund failed: {text}"
            )))
        }
    }

    /// Page through all completed payments in the window.
    pub async fn list_completed_payments(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<SquarePayment>> {
        let url = format!("{}/v2/payments", self.base_url);
        let mut payments = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&self.config.access_token)
                .header("Square-Version", SQUARE_VERSION)
                .query(&[
                    ("begin_time", begin.to_rfc3339()),
                    ("end_time", end.to_rfc3339()),
                    ("limit", "100".to_string()),
                ]);
            if let Some(c) = &cursor {
                request = request.query(&[("cursor", c.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(AppError::ExternalApiError(format!(
                    "Square payment listing failed: {text}"
                )));
            }

            let envelope: PaymentListEnvelope = response.json().await?;
            payments.extend(
                envelope
                    .payments
                    .into_iter()
                    .filter(|p| p.status == "COMPLETED"),
            );

            match envelope.cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }

        Ok(payments)
    }
}
