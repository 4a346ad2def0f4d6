use std::collections::HashMap;

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::generate_access_token;

const QR_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/";

#[derive(Clone)]
pub struct FormService {
    pool: DbPool,
    frontend_base_url: String,
}

impl FormService {
    pub fn new(pool: DbPool, frontend_base_url: String) -> Self {
        Self {
            pool,
            frontend_base_url,
        }
    }

    pub async fn create_form(&self, request: CreateFormRequest) -> AppResult<FormDetailResponse> {
        if request.title.trim().is_empty() {
            return Err(AppError::ValidationError("Form title is required".to_string()));
        }

        let event_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM events WHERE id = $1")
            .bind(request.event_id)
            .fetch_optional(&self.pool)
            .await?;
        if event_exists.is_none() {
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM forms WHERE event_id = $1")
            .bind(request.event_id)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "Event already has a form".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let form = sqlx::query_as::<_, Form>(
            r#"
            INSERT INTO forms (event_id, title, description, is_active, is_required, access_token, credit_reward)
            VALUES ($1, $2, $3, COALESCE($4, TRUE), COALESCE($5, FALSE), $6, COALESCE($7, 0))
            RETURNING *
            "#,
        )
        .bind(request.event_id)
        .bind(request.title.trim())
        .bind(&request.description)
        .bind(request.is_active)
        .bind(request.is_required)
        .bind(generate_access_token())
        .bind(request.credit_reward)
        .fetch_one(&mut *tx)
        .await?;

        insert_fields(&mut tx, form.id, &request.fields).await?;

        tx.commit().await?;

        log::info!("Form {} created for event {}", form.id, form.event_id);
        let fields = self.fetch_fields(form.id).await?;
        Ok(FormDetailResponse { form, fields })
    }

    pub async fn list_forms(&self) -> AppResult<Vec<Form>> {
        let forms = sqlx::query_as::<_, Form>("SELECT * FROM forms ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(forms)
    }

    pub async fn get_form(&self, form_id: i64) -> AppResult<FormDetailResponse> {
        let form = self.fetch_form(form_id).await?;
        let fields = self.fetch_fields(form_id).await?;
        Ok(FormDetailResponse { form, fields })
    }

    pub async fn get_form_by_event(&self, event_id: i64) -> AppResult<FormDetailResponse> {
        let form = sqlx::query_as::<_, Form>("SELECT * FROM forms WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Form not found".to_string()))?;
        let fields = self.fetch_fields(form.id).await?;
        Ok(FormDetailResponse { form, fields })
    }

    pub async fn update_form(
        &self,
        form_id: i64,
        request: UpdateFormRequest,
    ) -> AppResult<FormDetailResponse> {
        let mut tx = self.pool.begin().await?;

        let form = sqlx::query_as::<_, Form>(
            r#"
            UPDATE forms SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                is_active = COALESCE($4, is_active),
                is_required = COALESCE($5, is_required),
                credit_reward = COALESCE($6, credit_reward),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(form_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.is_active)
        .bind(request.is_required)
        .bind(request.credit_reward)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Form not found".to_string()))?;

        if let Some(fields) = &request.fields {
            sqlx::query("DELETE FROM form_fields WHERE form_id = $1")
                .bind(form_id)
                .execute(&mut *tx)
                .await?;
            insert_fields(&mut tx, form_id, fields).await?;
        }

        tx.commit().await?;

        let fields = self.fetch_fields(form_id).await?;
        Ok(FormDetailResponse { form, fields })
    }

    pub async fn delete_form(&self, form_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM forms WHERE id = $1")
            .bind(form_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Form not found".to_string()));
        }
        Ok(())
    }

    /// Public form URL and the QR image rendering it.
    pub async fn qr(&self, form_id: i64) -> AppResult<FormQrResponse> {
        let form = self.fetch_form(form_id).await?;
        let form_url = format!(
            "{}/form/{}",
            self.frontend_base_url.trim_end_matches('/'),
            form.access_token
        );
        let qr_url = format!(
            "{}?size=300x300&data={}",
            QR_ENDPOINT,
            percent_encode(&form_url)
        );
        Ok(FormQrResponse { form_url, qr_url })
    }

    pub async fn public_form(&self, token: &str) -> AppResult<PublicFormResponse> {
        let form = sqlx::query_as::<_, Form>(
            "SELECT * FROM forms WHERE access_token = $1 AND is_active = TRUE",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Form not found".to_string()))?;

        let fields = self.fetch_fields(form.id).await?;

        Ok(PublicFormResponse {
            id: form.id,
            event_id: form.event_id,
            title: form.title,
            description: form.description,
            is_required: form.is_required,
            credit_reward: form.credit_reward,
            fields,
        })
    }

    /// Upsert the caller's submission. Responses are replaced wholesale;
    /// the credit reward is granted on the first submission only.
    pub async fn submit(
        &self,
        token: &str,
        user_id: i64,
        request: SubmitFormRequest,
    ) -> AppResult<SubmitFormResponse> {
        let mut tx = self.pool.begin().await?;

        let form = sqlx::query_as::<_, Form>(
            "SELECT * FROM forms WHERE access_token = $1 AND is_active = TRUE FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Form not found".to_string()))?;

        let fields = sqlx::query_as::<_, FormField>(
            "SELECT * FROM form_fields WHERE form_id = $1 ORDER BY field_order ASC, id ASC",
        )
        .bind(form.id)
        .fetch_all(&mut *tx)
        .await?;

        let answers: HashMap<i64, &str> = request
            .responses
            .iter()
            .map(|a| (a.field_id, a.value.as_str()))
            .collect();

        for field in &fields {
            if field.is_required {
                let value = answers.get(&field.id).copied().unwrap_or("");
                if value.trim().is_empty() {
                    return Err(AppError::ValidationError(format!(
                        "Missing required answer: {}",
                        field.question
                    )));
                }
            }
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM form_submissions WHERE form_id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(form.id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (submission_id, first_submission) = match existing {
            Some(id) => {
                sqlx::query("DELETE FROM form_responses WHERE submission_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("UPDATE form_submissions SET submitted_at = NOW() WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                (id, false)
            }
            None => {
                let id = sqlx::query_scalar::<_, i64>(
                    "INSERT INTO form_submissions (form_id, user_id) VALUES ($1, $2) RETURNING id",
                )
                .bind(form.id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
                (id, true)
            }
        };

        for answer in &request.responses {
            sqlx::query(
                "INSERT INTO form_responses (submission_id, field_id, value) VALUES ($1, $2, $3)",
            )
            .bind(submission_id)
            .bind(answer.field_id)
            .bind(&answer.value)
            .execute(&mut *tx)
            .await?;
        }

        let mut credit_awarded = 0;
        if first_submission && form.credit_reward > 0 {
            sqlx::query(
                "INSERT INTO credit_transactions (user_id, amount, description, event_id) VALUES ($1, $2, $3, $4)",
            )
            .bind(user_id)
            .bind(form.credit_reward)
            .bind(format!("Feedback reward: {}", form.title))
            .bind(form.event_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE users SET credit_balance = credit_balance + $2, updated_at = NOW() WHERE id = $1")
                .bind(user_id)
                .bind(form.credit_reward)
                .execute(&mut *tx)
                .await?;

            credit_awarded = form.credit_reward;
        }

        tx.commit().await?;

        log::info!(
            "Form {} submission by user {} (first: {})",
            form.id,
            user_id,
            first_submission
        );
        Ok(SubmitFormResponse {
            submission_id,
            credit_awarded,
        })
    }

    pub async fn check_submission(
        &self,
        user_id: i64,
        form_id: i64,
    ) -> AppResult<CheckSubmissionResponse> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM form_submissions WHERE form_id = $1 AND user_id = $2",
        )
        .bind(form_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(CheckSubmissionResponse {
            submitted: count > 0,
        })
    }

    pub async fn submissions(&self, form_id: i64) -> AppResult<Vec<SubmissionDetail>> {
        self.fetch_form(form_id).await?;

        let rows = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT s.id AS submission_id, s.user_id, u.first_name, u.last_name,
                   u.email, s.submitted_at, f.id AS field_id, f.question, r.value
            FROM form_submissions s
            JOIN users u ON u.id = s.user_id
            JOIN form_responses r ON r.submission_id = s.id
            JOIN form_fields f ON f.id = r.field_id
            WHERE s.form_id = $1
            ORDER BY s.submitted_at DESC, f.field_order ASC, f.id ASC
            "#,
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        let mut details: Vec<SubmissionDetail> = Vec::new();
        for row in rows {
            let item = SubmissionResponseItem {
                field_id: row.field_id,
                question: row.question,
                value: row.value,
            };
            match details
                .iter_mut()
                .find(|d| d.submission_id == row.submission_id)
            {
                Some(detail) => detail.responses.push(item),
                None => details.push(SubmissionDetail {
                    submission_id: row.submission_id,
                    user_id: row.user_id,
                    first_name: row.first_name,
                    last_name: row.last_name,
                    email: row.email,
                    submitted_at: row.submitted_at,
                    responses: vec![item],
                }),
            }
        }

        Ok(details)
    }

    async fn fetch_form(&self, form_id: i64) -> AppResult<Form> {
        sqlx::query_as::<_, Form>("SELECT * FROM forms WHERE id = $1")
            .bind(form_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Form not found".to_string()))
    }

    async fn fetch_fields(&self, form_id: i64) -> AppResult<Vec<FormField>> {
        let fields = sqlx::query_as::<_, FormField>(
            "SELECT * FROM form_fields WHERE form_id = $1 ORDER BY field_order ASC, id ASC",
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fields)
    }
}

async fn insert_fields(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    form_id: i64,
    fields: &[FormFieldInput],
) -> AppResult<()> {
    for (index, field) in fields.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO form_fields (form_id, field_type, question, description, is_required, options, field_order)
            VALUES ($1, $2, $3, $4, COALESCE($5, FALSE), $6, COALESCE($7, $8))
            "#,
        )
        .bind(form_id)
        .bind(&field.field_type)
        .bind(&field.question)
        .bind(&field.description)
        .bind(field.is_required)
        .bind(&field.options)
        .bind(field.field_order)
        .bind(index as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Minimal percent-encoding for a URL embedded as a query value.
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_encode() {
        assert_eq!(
            percent_encode("https://utjn.ca/form/abc123"),
            "https%3A%2F%2Futjn.ca%2Fform%2Fabc123"
        );
        assert_eq!(percent_encode("plain-token_1.2~3"), "plain-token_1.2~3");
    }
}
