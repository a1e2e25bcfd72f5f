// handlers/external/spaces.rs - GET /external/spaces/ handler

use axum::{extract::State, http::HeaderMap};
use chrono::Utc;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{header_str, ApiResponse, ApiResult};
use crate::services::SpaceEntry;

/// GET /external/spaces/ - Spaces the external user holds an active grant in
pub async fn get(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Vec<SpaceEntry>> {
    let user_header = state.config.external.user_header.as_str();
    let external_user = header_str(&headers, user_header)
        .ok_or_else(|| ApiError::forbidden(format!("missing {} header", user_header)))?;

    let spaces = state
        .permission_service()
        .authorized_spaces(external_user, Utc::now())
        .await?;

    if spaces.is_empty() {
        return Err(ApiError::forbidden(format!(
            "external_user:{} has no authorized space.",
            external_user
        )));
    }

    let message = format!("list external_user:{} spaces success", external_user);
    Ok(ApiResponse::success(spaces).with_message(message))
}
