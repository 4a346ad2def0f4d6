use crate::handlers::user::get_user_id_from_request;
use crate::models::*;
use crate::services::PaymentService;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/payments/square",
    tag = "payment",
    request_body = SquarePaymentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Payment completed", body = SquarePaymentResponse),
        (status = 409, description = "No active reservation for this event"),
        (status = 502, description = "Square rejected the charge")
    )
)]
pub async fn square_payment(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    request: web::Json<SquarePaymentRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match payment_service.charge(user_id, request.into_inner()).await {
        Ok(payment) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": payment
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/payments").route("/square", web::post().to(square_payment)));
}
