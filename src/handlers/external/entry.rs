// handlers/external/entry.rs - GET /external/ handler

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
};
use chrono::Utc;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{header_str, set_cookie, ApiResponse};

#[derive(Debug, Deserialize)]
pub struct EntryQuery {
    pub space_uid: Option<String>,
}

/// GET /external/ - Entry point for an external user
///
/// Picks `?space_uid=` or the first space the user holds a grant in, checks
/// the grant and the space's authorizer, and leaves the space and identity
/// cookies the dispatch endpoint falls back to.
///
/// Response data:
/// ```json
/// {
///   "external_user": "alice",
///   "space_uid": "bkcc__2",
///   "authorizer": "admin",
///   "space": { "space_uid": "bkcc__2", "space_name": "Blue Whale", ... }
/// }
/// ```
pub async fn get(
    State(state): State<AppState>,
    Query(query): Query<EntryQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let external = &state.config.external;
    let external_user = header_str(&headers, &external.user_header)
        .ok_or_else(|| ApiError::forbidden(format!("missing {} header", external.user_header)))?;

    let entry = state
        .permission_service()
        .entry(external_user, query.space_uid.as_deref(), Utc::now())
        .await?;

    tracing::info!("external_user {} entered {} as {}", entry.external_user, entry.space_uid, entry.authorizer);

    let cookies = AppendHeaders([
        (header::SET_COOKIE, set_cookie(&external.space_cookie, &entry.space_uid)),
        (header::SET_COOKIE, set_cookie(&external.user_cookie, &entry.external_user)),
    ]);
    let message = format!("external_user:{} entered space_uid:{}", entry.external_user, entry.space_uid);
    Ok((cookies, ApiResponse::success(entry).with_message(message)))
}
