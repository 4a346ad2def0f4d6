pub mod admin;
pub mod auth;
pub mod event;
pub mod form;
pub mod payment;
pub mod user;

pub use admin::admin_config;
pub use auth::auth_config;
pub use event::event_config;
pub use form::form_config;
pub use payment::payment_config;
pub use user::user_config;
