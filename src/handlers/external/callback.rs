// handlers/external/callback.rs - POST /external/callback/ handler

use axum::{body::Bytes, extract::State, response::Json};
use chrono::Utc;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::{ApprovalCallback, CallbackOutcome};

/// POST /external/callback/ - Approval workflow result for an apply record
///
/// Always answers 200 once the payload parses; `result` says whether the
/// record moved.
pub async fn post(State(state): State<AppState>, body: Bytes) -> Result<Json<CallbackOutcome>, ApiError> {
    let payload: ApprovalCallback =
        serde_json::from_slice(&body).map_err(|_| ApiError::invalid_json("invalid json format"))?;

    let outcome = state.permission_service().callback(&payload, Utc::now()).await?;
    Ok(Json(outcome))
}
