// handlers/internal.rs - /api/v1/* for session callers

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, Uri},
    Extension,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::SessionUser;
use crate::views::{RequestContext, ViewRequest, ViewResponse};

/// Any method under /api/v1/ - run the view the routing table maps the path to
///
/// Same table and same views the external proxy replays, but the caller's
/// own session identity is used and the space comes from `?space_uid=`.
pub async fn view(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ViewResponse, ApiError> {
    let path = uri.path();
    let matched = state
        .routes
        .resolve(&method, path)
        .ok_or_else(|| ApiError::not_found(format!("no view for {} {}", method, path)))?;

    let body = json_body(&body)?;
    let space_uid = query.get("space_uid").cloned().unwrap_or_default();
    let ctx = RequestContext::session(user.username, space_uid);

    tracing::debug!("{} {} -> {} as {}", method, path, matched.route.view, ctx.username);

    let request = ViewRequest {
        method,
        path: path.to_string(),
        query,
        params: matched.params,
        body,
        headers,
    };
    Ok(matched.route.handler.call(&state, &ctx, &request).await?)
}

/// Empty bodies read as `{}`.
fn json_body(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|_| ApiError::invalid_json("invalid json format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_body_is_an_empty_object() {
        assert_eq!(json_body(b"").unwrap(), json!({}));
        assert_eq!(json_body(b"  \n").unwrap(), json!({}));
        assert_eq!(json_body(br#"{"a": 1}"#).unwrap(), json!({"a": 1}));
        assert!(json_body(b"{oops").is_err());
    }
}
