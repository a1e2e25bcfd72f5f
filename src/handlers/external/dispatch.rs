// handlers/external/dispatch.rs - POST /external/dispatch/ handler

use axum::{body::Bytes, extract::State, http::HeaderMap};

use crate::app::AppState;
use crate::dispatch::{dispatch_external, ExternalCaller};
use crate::error::ApiError;
use crate::middleware::{cookie_value, header_str};
use crate::views::ViewResponse;

/// POST /external/dispatch/ - Replay an internal API call for an external user
///
/// The external identity comes from the `User` header set by the auth proxy in
/// front of this service; `space_uid` falls back to the cookie of that name.
///
/// Expected Input:
/// ```json
/// {
///   "url": "/api/v1/search/index_set/",
///   "method": "GET",
///   "space_uid": "bkcc__2",
///   "data": {}
/// }
/// ```
///
/// The response is the proxied view's own body and status, with list data
/// narrowed to the resources the caller was granted.
pub async fn post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ViewResponse, ApiError> {
    let external = &state.config.external;
    let space_cookie = cookie_value(&headers, &external.space_cookie);
    let caller = ExternalCaller {
        user: header_str(&headers, &external.user_header),
        space_cookie: space_cookie.as_deref(),
    };

    Ok(dispatch_external(&state, caller, &body).await?)
}
