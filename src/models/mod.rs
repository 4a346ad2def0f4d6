pub mod analytics;
pub mod common;
pub mod coupon;
pub mod credit;
pub mod event;
pub mod form;
pub mod pagination;
pub mod payment;
pub mod refund;
pub mod registration;
pub mod user;

pub use analytics::*;
pub use common::*;
pub use coupon::*;
pub use credit::*;
pub use event::*;
pub use form::*;
pub use pagination::*;
pub use payment::*;
pub use refund::*;
pub use registration::*;
pub use user::*;
