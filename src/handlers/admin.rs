use crate::handlers::user::get_user_id_from_request;
use crate::models::*;
use crate::services::analytics_service::registrants_to_csv;
use crate::services::{AnalyticsService, RefundService, UserService};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/admin/refunds",
    tag = "admin",
    params(("status" = Option<String>, Query, description = "Filter by status")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Refund requests with event and user details"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_refunds(
    refund_service: web::Data<RefundService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    query: web::Query<RefundListQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match refund_service.list_refunds(query.status.as_deref()).await {
        Ok(refunds) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": refunds
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/refunds/stats",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Refund request counts and totals", body = RefundStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn refund_stats(
    refund_service: web::Data<RefundService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match refund_service.stats().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/refunds/{id}/process",
    tag = "admin",
    params(("id" = i64, Path, description = "Refund request id")),
    request_body = ProcessRefundRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Request processed", body = ProcessRefundResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Refund request not found"),
        (status = 409, description = "Request already processed")
    )
)]
pub async fn process_refund(
    refund_service: web::Data<RefundService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<ProcessRefundRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    let admin = match user_service.get_user(user_id).await {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match refund_service
        .process(path.into_inner(), &admin.email, request.into_inner())
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
    path = "/admin/unregistered-refunds",
    tag = "admin",
    params(
        ("start_date" = Option<String>, Query, description = "Window start, RFC 3339"),
        ("end_date" = Option<String>, Query, description = "Window end, RFC 3339")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Completed payments with no registration"),
        (status = 403, description = "Not an admin"),
        (status = 502, description = "Square listing failed")
    )
)]
pub async fn list_unregistered_refunds(
    refund_service: web::Data<RefundService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    query: web::Query<UnregisteredRefundsQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match refund_service.list_unregistered(query.into_inner()).await {
        Ok(payments) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": payments
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/unregistered-refunds/refund",
    tag = "admin",
    request_body = RefundUnregisteredRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Payment refunded and recorded", body = UnregisteredRefund),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Payment already refunded")
    )
)]
pub async fn refund_unregistered(
    refund_service: web::Data<RefundService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<RefundUnregisteredRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match refund_service.refund_unregistered(request.into_inner()).await {
        Ok(refund) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": refund
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Paginated user list"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match user_service.list_users(&query).await {
        Ok(users) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": users
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/admin",
    tag = "admin",
    params(("id" = i64, Path, description = "User id")),
    request_body = SetAdminRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Admin flag updated", body = UserResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn set_admin(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<SetAdminRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match user_service
        .set_admin(path.into_inner(), request.is_admin)
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
    path = "/admin/events/{id}/export",
    tag = "admin",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Participant list as CSV", body = String, content_type = "text/csv"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn export_registrants(
    analytics_service: web::Data<AnalyticsService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    let event_id = path.into_inner();
    match analytics_service.event_registrants(event_id).await {
        Ok(rows) => Ok(HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"event_{event_id}_participants.csv\""),
            ))
            .body(registrants_to_csv(&rows))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/analytics",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Platform-wide totals", body = AnalyticsTotals),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn analytics(
    analytics_service: web::Data<AnalyticsService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match analytics_service.totals().await {
        Ok(totals) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": totals
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/analytics/detailed",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Per-event registration and revenue breakdown"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn analytics_detailed(
    analytics_service: web::Data<AnalyticsService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match analytics_service.per_event().await {
        Ok(rows) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": rows
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/refunds", web::get().to(list_refunds))
            .route("/refunds/stats", web::get().to(refund_stats))
            .route("/refunds/{id}/process", web::put().to(process_refund))
            .route(
                "/unregistered-refunds",
                web::get().to(list_unregistered_refunds),
            )
            .route(
                "/unregistered-refunds/refund",
                web::post().to(refund_unregistered),
            )
            .route("/events/{id}/export", web::get().to(export_registrants))
            .route("/users", web::get().to(list_users))
            .route("/users/{id}/admin", web::put().to(set_admin))
            .route("/analytics", web::get().to(analytics))
            .route("/analytics/detailed", web::get().to(analytics_detailed)),
    );
}
