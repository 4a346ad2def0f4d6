use crate::models::*;
use crate::services::{CreditService, RegistrationService, UserService};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

pub(crate) fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    get,
    path = "/users/profile",
    tag = "user",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's profile", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match user_service.get_profile(user_id).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": user
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/users/profile",
    tag = "user",
    request_body = UpdateUserRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn update_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match user_service
        .update_profile(user_id, request.into_inner())
        .await
    {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": user
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/users/admin-status",
    tag = "user",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Admin flag for the caller", body = AdminStatusResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn admin_status(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match user_service.admin_status(user_id).await {
        Ok(status) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": status
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/users/credits",
    tag = "credits",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Balance and transaction history", body = CreditsResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_credits(
    credit_service: web::Data<CreditService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match credit_service.get_credits(user_id).await {
        Ok(credits) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": credits
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/users/credits/spend",
    tag = "credits",
    request_body = SpendCreditsRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Credits spent", body = CreditsResponse),
        (status = 400, description = "Insufficient balance"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn spend_credits(
    credit_service: web::Data<CreditService>,
    req: HttpRequest,
    request: web::Json<SpendCreditsRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match credit_service.spend(user_id, request.into_inner()).await {
        Ok(credits) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": credits
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/users/my-events",
    tag = "user",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's registrations with event details"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn my_events(
    registration_service: web::Data<RegistrationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match registration_service.my_events(user_id).await {
        Ok(rows) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": rows
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/profile", web::get().to(get_profile))
            .route("/profile", web::put().to(update_profile))
            .route("/admin-status", web::get().to(admin_status))
            .route("/credits", web::get().to(get_credits))
            .route("/credits/spend", web::post().to(spend_credits))
            .route("/my-events", web::get().to(my_events)),
    );
}
