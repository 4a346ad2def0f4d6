pub mod code_generator;
pub mod jwt;
pub mod password;

pub use code_generator::{generate_access_token, generate_coupon_code};
pub use jwt::*;
pub use password::*;
