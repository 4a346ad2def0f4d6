pub mod analytics_service;
pub mod auth_service;
pub mod coupon_service;
pub mod credit_service;
pub mod event_service;
pub mod form_service;
pub mod payment_service;
pub mod refund_service;
pub mod registration_service;
pub mod user_service;

pub use analytics_service::*;
pub use auth_service::*;
pub use coupon_service::*;
pub use credit_service::*;
pub use event_service::*;
pub use form_service::*;
pub use payment_service::*;
pub use refund_service::*;
pub use registration_service::*;
pub use user_service::*;
