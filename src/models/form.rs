use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Form {
    pub id: i64,
    pub event_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_required: bool,
    pub access_token: String,
    pub credit_reward: i64, // cents
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FormField {
    pub id: i64,
    pub form_id: i64,
    pub field_type: String, // text | textarea | select | radio | checkbox | rating
    pub question: String,
    pub description: Option<String>,
    pub is_required: bool,
    /// JSON-encoded option list for choice fields.
    pub options: Option<String>,
    pub field_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FormSubmission {
    pub id: i64,
    pub form_id: i64,
    pub user_id: i64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FormFieldInput {
    pub field_type: String,
    pub question: String,
    pub description: Option<String>,
    pub is_required: Option<bool>,
    pub options: Option<String>,
    pub field_order: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateFormRequest {
    pub event_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub is_required: Option<bool>,
    pub credit_reward: Option<i64>,
    pub fields: Vec<FormFieldInput>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateFormRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub is_required: Option<bool>,
    pub credit_reward: Option<i64>,
    /// When present the field list is replaced wholesale.
    pub fields: Option<Vec<FormFieldInput>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FormDetailResponse {
    pub form: Form,
    pub fields: Vec<FormField>,
}

/// Public view of a form, served to unauthenticated clients by token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicFormResponse {
    pub id: i64,
    pub event_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_required: bool,
    pub credit_reward: i64,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FormAnswer {
    pub field_id: i64,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitFormRequest {
    pub responses: Vec<FormAnswer>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitFormResponse {
    pub submission_id: i64,
    /// Credit awarded by this submission; zero on resubmission.
    pub credit_awarded: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckSubmissionQuery {
    pub form_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckSubmissionResponse {
    pub submitted: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FormQrResponse {
    pub form_url: String,
    pub qr_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResponseItem {
    pub field_id: i64,
    pub question: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionDetail {
    pub submission_id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub submitted_at: DateTime<Utc>,
    pub responses: Vec<SubmissionResponseItem>,
}

/// Flat row used to assemble [`SubmissionDetail`] from a joined query.
#[derive(Debug, FromRow)]
pub struct SubmissionRow {
    pub submission_id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub submitted_at: DateTime<Utc>,
    pub field_id: i64,
    pub question: String,
    pub value: String,
}
