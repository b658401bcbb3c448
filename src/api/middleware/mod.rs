//! Route middleware: bearer admission and the request-log hook.

pub mod auth;
pub mod request_log;

pub use auth::require_bearer;
pub use request_log::log_request;
