use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;
use crate::pricing::{PriceDisplay, PricingSummary};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::user::get_profile,
        handlers::user::update_profile,
        handlers::user::admin_status,
        handlers::user::get_credits,
        handlers::user::spend_credits,
        handlers::user::my_events,
        handlers::event::list_events,
        handlers::event::list_all_events,
        handlers::event::get_event,
        handlers::event::create_event,
        handlers::event::update_event,
        handlers::event::delete_event,
        handlers::event::ticket_options,
        handlers::event::capacity,
        handlers::event::reserve,
        handlers::event::release_reservation,
        handlers::event::register_free,
        handlers::event::cancel_registration,
        handlers::event::register_paid,
        handlers::event::request_refund,
        handlers::payment::square_payment,
        handlers::form::create_form,
        handlers::form::list_forms,
        handlers::form::get_form,
        handlers::form::update_form,
        handlers::form::delete_form,
        handlers::form::list_submissions,
        handlers::form::get_form_by_event,
        handlers::form::form_qr,
        handlers::form::public_form,
        handlers::form::submit_form,
        handlers::form::check_submission,
        handlers::form::create_coupon,
        handlers::form::list_coupons,
        handlers::form::validate_coupon,
        handlers::form::redeem_coupon,
        handlers::admin::list_refunds,
        handlers::admin::refund_stats,
        handlers::admin::process_refund,
        handlers::admin::list_unregistered_refunds,
        handlers::admin::refund_unregistered,
        handlers::admin::list_users,
        handlers::admin::set_admin,
        handlers::admin::export_registrants,
        handlers::admin::analytics,
        handlers::admin::analytics_detailed,
    ),
    components(
        schemas(
            User,
            UserResponse,
            SignupRequest,
            LoginRequest,
            RefreshRequest,
            UpdateUserRequest,
            AuthResponse,
            AdminStatusResponse,
            SetAdminRequest,
            Event,
            EventResponse,
            CreateEventRequest,
            UpdateEventRequest,
            TicketTier,
            TicketTierInput,
            SubEvent,
            SubEventInput,
            TierOption,
            TicketOptionsResponse,
            CapacityResponse,
            PricingSummary,
            PriceDisplay,
            Reservation,
            ReserveRequest,
            ReserveResponse,
            PaidRegistrationRequest,
            EventRegistration,
            MyEventRow,
            SquarePaymentRequest,
            SquarePaymentResponse,
            RefundRequest,
            CreateRefundRequest,
            RefundRequestDetail,
            ProcessRefundRequest,
            ProcessRefundResponse,
            RefundStats,
            UnregisteredRefund,
            UnregisteredPayment,
            UnregisteredRefundsQuery,
            RefundUnregisteredRequest,
            Form,
            FormField,
            FormSubmission,
            FormFieldInput,
            CreateFormRequest,
            UpdateFormRequest,
            FormDetailResponse,
            PublicFormResponse,
            FormAnswer,
            SubmitFormRequest,
            SubmitFormResponse,
            CheckSubmissionResponse,
            FormQrResponse,
            SubmissionResponseItem,
            SubmissionDetail,
            Coupon,
            CreateCouponRequest,
            ValidateCouponRequest,
            RedeemCouponRequest,
            ValidateCouponResponse,
            CreditTransaction,
            CreditsResponse,
            SpendCreditsRequest,
            AnalyticsTotals,
            EventAnalyticsRow,
            RegistrantRow,
            PaginationInfo,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication API"),
        (name = "user", description = "User profile API"),
        (name = "credits", description = "Credit balance API"),
        (name = "event", description = "Event management API"),
        (name = "ticketing", description = "Tier and capacity API"),
        (name = "registration", description = "Reservation and registration API"),
        (name = "payment", description = "Square payment API"),
        (name = "refund", description = "Refund request API"),
        (name = "form", description = "Feedback form API"),
        (name = "coupon", description = "Coupon API"),
        (name = "admin", description = "Admin console API"),
    ),
    info(
        title = "UTJN Backend API",
        version = "1.0.0",
        description = "UTJN membership and event platform REST API documentation",
        contact(
            name = "API Support",
            email = "uoftjn@gmail.com"
        )
    ),
    servers(
        (url = "/api", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
