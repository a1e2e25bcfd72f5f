pub mod auth;
pub mod response;

pub use auth::{cookie_value, header_str, session_context_middleware, set_cookie, SessionUser};
pub use response::{ApiResponse, ApiResult};
