//! Request middleware

pub mod auth;

pub use auth::{auth_middleware, require_admin, require_customer, AuthUser, Claims, CurrentUser};
