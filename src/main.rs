use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use utjn_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::SquareClient,
    handlers,
    middlewares::{create_cors, AuthMiddleware},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": { "status": "ok" }
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    let square_client = SquareClient::new(config.square.clone());

    let auth_service = AuthService::new(pool.clone(), jwt_service.clone());
    let user_service = UserService::new(pool.clone());
    let event_service = EventService::new(pool.clone());
    let registration_service =
        RegistrationService::new(pool.clone(), config.app.reservation_ttl_seconds);
    let payment_service = PaymentService::new(pool.clone(), square_client.clone());
    let refund_service = RefundService::new(pool.clone(), square_client.clone());
    let form_service = FormService::new(pool.clone(), config.app.frontend_base_url.clone());
    let coupon_service = CouponService::new(pool.clone());
    let credit_service = CreditService::new(pool.clone());
    let analytics_service = AnalyticsService::new(pool.clone());

    tasks::spawn_all(registration_service.clone());

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(event_service.clone()))
            .app_data(web::Data::new(registration_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(refund_service.clone()))
            .app_data(web::Data::new(form_service.clone()))
            .app_data(web::Data::new(coupon_service.clone()))
            .app_data(web::Data::new(credit_service.clone()))
            .app_data(web::Data::new(analytics_service.clone()))
            .configure(swagger_config)
            .route("/health", web::get().to(health))
            .service(
                web::scope("/api")
                    .configure(handlers::auth_config)
                    .configure(handlers::user_config)
                    .configure(handlers::event_config)
                    .configure(handlers::payment_config)
                    .configure(handlers::form_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
