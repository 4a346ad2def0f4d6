use crate::handlers::user::get_user_id_from_request;
use crate::models::*;
use crate::services::{CouponService, FormService, UserService};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/forms",
    tag = "form",
    request_body = CreateFormRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Form created", body = FormDetailResponse),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Event already has a form")
    )
)]
pub async fn create_form(
    form_service: web::Data<FormService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<CreateFormRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match form_service.create_form(request.into_inner()).await {
        Ok(form) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": form
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/forms",
    tag = "form",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All forms (admin)"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_forms(
    form_service: web::Data<FormService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match form_service.list_forms().await {
        Ok(forms) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": forms
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/forms/manage/{id}",
    tag = "form",
    params(("id" = i64, Path, description = "Form id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Form with fields", body = FormDetailResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Form not found")
    )
)]
pub async fn get_form(
    form_service: web::Data<FormService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match form_service.get_form(path.into_inner()).await {
        Ok(form) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": form
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/forms/manage/{id}",
    tag = "form",
    params(("id" = i64, Path, description = "Form id")),
    request_body = UpdateFormRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Form updated", body = FormDetailResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Form not found")
    )
)]
pub async fn update_form(
    form_service: web::Data<FormService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateFormRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match form_service
        .update_form(path.into_inner(), request.into_inner())
        .await
    {
        Ok(form) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": form
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/forms/manage/{id}",
    tag = "form",
    params(("id" = i64, Path, description = "Form id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Form deleted"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Form not found")
    )
)]
pub async fn delete_form(
    form_service: web::Data<FormService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match form_service.delete_form(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Form deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/forms/manage/{id}/submissions",
    tag = "form",
    params(("id" = i64, Path, description = "Form id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Submissions with grouped responses"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Form not found")
    )
)]
pub async fn list_submissions(
    form_service: web::Data<FormService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match form_service.submissions(path.into_inner()).await {
        Ok(submissions) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": submissions
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/forms/event/{event_id}",
    tag = "form",
    params(("event_id" = i64, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Form attached to the event", body = FormDetailResponse),
        (status = 404, description = "Form not found")
    )
)]
pub async fn get_form_by_event(
    form_service: web::Data<FormService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match form_service.get_form_by_event(path.into_inner()).await {
        Ok(form) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": form
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/forms/{id}/qr",
    tag = "form",
    params(("id" = i64, Path, description = "Form id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Shareable URL and QR image URL", body = FormQrResponse),
        (status = 404, description = "Form not found")
    )
)]
pub async fn form_qr(
    form_service: web::Data<FormService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match form_service.qr(path.into_inner()).await {
        Ok(qr) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": qr
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/forms/public/{token}",
    tag = "form",
    params(("token" = String, Path, description = "Form access token")),
    responses(
        (status = 200, description = "Public form view", body = PublicFormResponse),
        (status = 404, description = "Form not found or inactive")
    )
)]
pub async fn public_form(
    form_service: web::Data<FormService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match form_service.public_form(&path.into_inner()).await {
        Ok(form) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": form
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/forms/public/{token}/submit",
    tag = "form",
    params(("token" = String, Path, description = "Form access token")),
    request_body = SubmitFormRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Submission recorded", body = SubmitFormResponse),
        (status = 400, description = "Missing required answer"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Form not found or inactive")
    )
)]
pub async fn submit_form(
    form_service: web::Data<FormService>,
    req: HttpRequest,
    path: web::Path<String>,
    request: web::Json<SubmitFormRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match form_service
        .submit(&path.into_inner(), user_id, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/forms/check-submission",
    tag = "form",
    params(("form_id" = i64, Query, description = "Form id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Whether the caller has submitted", body = CheckSubmissionResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn check_submission(
    form_service: web::Data<FormService>,
    req: HttpRequest,
    query: web::Query<CheckSubmissionQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match form_service.check_submission(user_id, query.form_id).await {
        Ok(status) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": status
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/forms/coupons",
    tag = "coupon",
    request_body = CreateCouponRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Coupon created", body = Coupon),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Coupon code already exists")
    )
)]
pub async fn create_coupon(
    coupon_service: web::Data<CouponService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<CreateCouponRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match coupon_service.create_coupon(request.into_inner()).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": coupon
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/forms/coupons",
    tag = "coupon",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All coupons (admin)"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_coupons(
    coupon_service: web::Data<CouponService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match coupon_service.list_coupons().await {
        Ok(coupons) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": coupons
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/forms/coupons/validate",
    tag = "coupon",
    request_body = ValidateCouponRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Validation result with computed discount", body = ValidateCouponResponse)
    )
)]
pub async fn validate_coupon(
    coupon_service: web::Data<CouponService>,
    request: web::Json<ValidateCouponRequest>,
) -> Result<HttpResponse> {
    match coupon_service.validate(request.into_inner()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/forms/coupons/redeem",
    tag = "coupon",
    request_body = RedeemCouponRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Coupon redeemed, usage recorded", body = ValidateCouponResponse),
        (status = 400, description = "Coupon not redeemable"),
        (status = 404, description = "Coupon not found")
    )
)]
pub async fn redeem_coupon(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    request: web::Json<RedeemCouponRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    let request = request.into_inner();
    let validate = ValidateCouponRequest {
        code: request.code,
        amount: request.amount,
    };

    match coupon_service
        .redeem(user_id, request.event_id, validate)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn form_config(cfg: &mut web::ServiceConfig) {
    // Literal routes are registered before the parameterized `/{id}/qr`.
    cfg.service(
        web::scope("/forms")
            .route("", web::post().to(create_form))
            .route("", web::get().to(list_forms))
            .route("/check-submission", web::get().to(check_submission))
            .route("/coupons", web::post().to(create_coupon))
            .route("/coupons", web::get().to(list_coupons))
            .route("/coupons/validate", web::post().to(validate_coupon))
            .route("/coupons/redeem", web::post().to(redeem_coupon))
            .route("/public/{token}", web::get().to(public_form))
            .route("/public/{token}/submit", web::post().to(submit_form))
            .route("/event/{event_id}", web::get().to(get_form_by_event))
            .route("/manage/{id}", web::get().to(get_form))
            .route("/manage/{id}", web::put().to(update_form))
            .route("/manage/{id}", web::delete().to(delete_form))
            .route(
                "/manage/{id}/submissions",
                web::get().to(list_submissions),
            )
            .route("/{id}/qr", web::get().to(form_qr)),
    );
}
