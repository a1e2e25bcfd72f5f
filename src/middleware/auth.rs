use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use cookie::Cookie;

use crate::app::AppState;
use crate::error::ApiError;

/// Session identity of an internal caller, asserted by the fronting auth proxy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUser {
    pub username: String,
}

/// Middleware that requires the session header and injects a `SessionUser`
pub async fn session_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_name = state.config.external.session_header.as_str();
    let username = header_str(request.headers(), header_name)
        .ok_or_else(|| ApiError::unauthorized(format!("Missing {} header", header_name)))?
        .to_string();

    tracing::debug!("Session user: {}", username);
    request.extensions_mut().insert(SessionUser { username });

    Ok(next.run(request).await)
}

/// Non-empty, trimmed value of a header
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Value of a cookie from the `Cookie` header(s)
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw).filter_map(Result::ok))
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value for a site-wide cookie
pub fn set_cookie(name: &str, value: &str) -> String {
    Cookie::build((name, value)).path("/").build().to_string()
}
