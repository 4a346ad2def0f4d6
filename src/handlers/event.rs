use crate::handlers::user::get_user_id_from_request;
use crate::models::*;
use crate::services::{EventService, RefundService, RegistrationService, UserService};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/events",
    tag = "event",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Events visible to the caller"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_events(
    event_service: web::Data<EventService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match event_service.list_events(user_id).await {
        Ok(events) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": events
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/all",
    tag = "event",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All events including archived (admin)"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_all_events(
    event_service: web::Data<EventService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match event_service.list_all_events().await {
        Ok(events) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": events
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/{id}",
    tag = "event",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Event detail", body = EventResponse),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get_event(
    event_service: web::Data<EventService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match event_service.get_event(path.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events",
    tag = "event",
    request_body = CreateEventRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Event created", body = EventResponse),
        (status = 400, description = "Invalid input or capacity matrix mismatch"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_event(
    event_service: web::Data<EventService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<CreateEventRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match event_service.create_event(request.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/events/{id}",
    tag = "event",
    params(("id" = i64, Path, description = "Event id")),
    request_body = UpdateEventRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Event updated", body = EventResponse),
        (status = 400, description = "Invalid input or capacity matrix mismatch"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn update_event(
    event_service: web::Data<EventService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateEventRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match event_service
        .update_event(path.into_inner(), request.into_inner())
        .await
    {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/events/{id}",
    tag = "event",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Event deleted"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn delete_event(
    event_service: web::Data<EventService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    if let Err(e) = user_service.ensure_admin(user_id).await {
        return Ok(e.error_response());
    }

    match event_service.delete_event(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Event deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/{id}/ticket-options",
    tag = "ticketing",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tiers with availability and sub-events", body = TicketOptionsResponse),
        (status = 404, description = "Event not found")
    )
)]
pub async fn ticket_options(
    event_service: web::Data<EventService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match event_service.ticket_options(path.into_inner()).await {
        Ok(options) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": options
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/{id}/capacity",
    tag = "ticketing",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Total and available capacity", body = CapacityResponse),
        (status = 404, description = "Event not found")
    )
)]
pub async fn capacity(
    event_service: web::Data<EventService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match event_service.capacity(path.into_inner()).await {
        Ok(capacity) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": capacity
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{id}/reserve",
    tag = "registration",
    params(("id" = i64, Path, description = "Event id")),
    request_body = ReserveRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Seat held", body = ReserveResponse),
        (status = 409, description = "Event full, tier sold out, or already registered")
    )
)]
pub async fn reserve(
    registration_service: web::Data<RegistrationService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<ReserveRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match registration_service
        .reserve(user_id, path.into_inner(), request.into_inner())
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
    delete,
    path = "/events/{id}/reserve/{reservation_id}",
    tag = "registration",
    params(
        ("id" = i64, Path, description = "Event id"),
        ("reservation_id" = Uuid, Path, description = "Reservation id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Hold released"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn release_reservation(
    registration_service: web::Data<RegistrationService>,
    req: HttpRequest,
    path: web::Path<(i64, Uuid)>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    let (event_id, reservation_id) = path.into_inner();

    match registration_service
        .release(user_id, event_id, reservation_id)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Reservation released"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{id}/register",
    tag = "registration",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registered for a free event", body = EventRegistration),
        (status = 400, description = "Event requires payment"),
        (status = 409, description = "Event full or already registered")
    )
)]
pub async fn register_free(
    registration_service: web::Data<RegistrationService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match registration_service
        .register_free(user_id, path.into_inner())
        .await
    {
        Ok(registration) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": registration
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/events/{id}/register",
    tag = "registration",
    params(("id" = i64, Path, description = "Event id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registration cancelled"),
        (status = 400, description = "Paid registration, use the refund flow"),
        (status = 404, description = "Registration not found")
    )
)]
pub async fn cancel_registration(
    registration_service: web::Data<RegistrationService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match registration_service
        .cancel_registration(user_id, path.into_inner())
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Registration cancelled"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{id}/register/paid",
    tag = "registration",
    params(("id" = i64, Path, description = "Event id")),
    request_body = PaidRegistrationRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reservation consumed, registration recorded", body = EventRegistration),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation expired or already registered")
    )
)]
pub async fn register_paid(
    registration_service: web::Data<RegistrationService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<PaidRegistrationRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match registration_service
        .register_paid(user_id, path.into_inner(), request.into_inner())
        .await
    {
        Ok(registration) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": registration
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{id}/refund",
    tag = "refund",
    params(("id" = i64, Path, description = "Event id")),
    request_body = CreateRefundRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registration cancelled, refund request filed", body = RefundRequest),
        (status = 400, description = "Refund deadline has passed"),
        (status = 404, description = "Registration not found")
    )
)]
pub async fn request_refund(
    refund_service: web::Data<RefundService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<CreateRefundRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match refund_service
        .request_refund(user_id, path.into_inner(), request.into_inner())
        .await
    {
        Ok(refund) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": refund
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn event_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .route("", web::get().to(list_events))
            .route("", web::post().to(create_event))
            .route("/all", web::get().to(list_all_events))
            .route("/{id}", web::get().to(get_event))
            .route("/{id}", web::put().to(update_event))
            .route("/{id}", web::delete().to(delete_event))
            .route("/{id}/ticket-options", web::get().to(ticket_options))
            .route("/{id}/capacity", web::get().to(capacity))
            .route("/{id}/reserve", web::post().to(reserve))
            .route(
                "/{id}/reserve/{reservation_id}",
                web::delete().to(release_reservation),
            )
            .route("/{id}/register", web::post().to(register_free))
            .route("/{id}/register", web::delete().to(cancel_registration))
            .route("/{id}/register/paid", web::post().to(register_paid))
            .route("/{id}/refund", web::post().to(request_refund)),
    );
}
