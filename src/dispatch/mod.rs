//! External access proxy.
//!
//! An external identity posts `{url, method, data, space_uid}`. The URL is
//! resolved against the internal routing table, the identity's grants decide
//! whether and how far it may go, and the matched view runs under the space's
//! authorizer. List responses are cut down to the granted resources.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::app::AppState;
use crate::store::StoreError;
use crate::views::{RequestContext, ViewError, ViewResponse};

pub mod filter;
pub mod resolver;
pub mod scope;

pub use filter::filter_payload;
pub use scope::{Scope, ScopeRequest};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid json format")]
    InvalidJson,

    #[error("dispatch_plugin_query: only support get and post method.")]
    UnsupportedMethod(String),

    #[error("dispatch_plugin_query: resolve view func 404 for: {0}")]
    RouteNotFound(String),

    #[error(transparent)]
    Forbidden(#[from] Forbidden),

    #[error(transparent)]
    Upstream(ViewError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Forbidden {
    #[error("dispatch_plugin_query: missing external user.")]
    MissingIdentity,

    #[error("dispatch_plugin_query: external_user:{user} has no permission.")]
    NoPermission { user: String },

    #[error("external_user:{user} has not enough permission.")]
    InsufficientPermission { user: String },

    #[error("external_user:{user} cannot access resource(ID:{resource}).")]
    ResourceDenied { user: String, resource: String },

    #[error("space_uid:{space_uid} has no authorizer.")]
    NoAuthorizer { space_uid: String },

    #[error("external_user:{user} has no authorized space.")]
    NoAuthorizedSpace { user: String },

    #[error("external_user:{user} has no permission in space_uid:{space_uid}.")]
    NoSpacePermission { user: String, space_uid: String },
}

/// Body of a proxied call.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchParams {
    pub url: String,
    #[serde(default)]
    pub space_uid: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub data: Value,
}

fn default_method() -> String {
    "GET".to_string()
}

impl DispatchParams {
    pub fn parse(body: &[u8]) -> Result<Self, DispatchError> {
        let mut params: Self = serde_json::from_slice(body).map_err(|_| DispatchError::InvalidJson)?;
        match params.data {
            Value::Null => params.data = Value::Object(Map::new()),
            Value::Object(_) => {}
            _ => return Err(DispatchError::InvalidJson),
        }
        Ok(params)
    }
}

/// What the outer boundary knows about the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalCaller<'a> {
    pub user: Option<&'a str>,
    pub space_cookie: Option<&'a str>,
}

/// Run one proxied call end to end.
pub async fn dispatch_external(
    state: &AppState,
    caller: ExternalCaller<'_>,
    body: &[u8],
) -> Result<ViewResponse, DispatchError> {
    let span = tracing::info_span!("dispatch", request_id = %Uuid::new_v4());
    dispatch_inner(state, caller, body).instrument(span).await
}

async fn dispatch_inner(
    state: &AppState,
    caller: ExternalCaller<'_>,
    body: &[u8],
) -> Result<ViewResponse, DispatchError> {
    let params = DispatchParams::parse(body)?;
    let space_uid = params
        .space_uid
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| caller.space_cookie.map(str::to_string))
        .unwrap_or_default();

    let (matched, request) =
        resolver::resolve(&state.routes, &params.method, &params.url, &params.data).map_err(|e| {
            tracing::warn!("dispatch {} {} failed: {}", params.method, params.url, e);
            e
        })?;
    let view = matched.route.view;

    let external_user = caller.user.ok_or(Forbidden::MissingIdentity)?;

    let scope = scope::authorize(
        state.permissions.as_ref(),
        ScopeRequest {
            external_user,
            space_uid: &space_uid,
            view,
            params: &matched.params,
            data: &params.data,
        },
        Utc::now(),
    )
    .await?;

    let authorizer = state
        .permissions
        .authorizer(&space_uid)
        .await?
        .ok_or_else(|| Forbidden::NoAuthorizer { space_uid: space_uid.clone() })?;

    tracing::info!(
        "external_user {} dispatching {} {} as {} in {} (view {})",
        external_user,
        request.method,
        params.url,
        authorizer,
        space_uid,
        view
    );

    let ctx = RequestContext {
        username: authorizer,
        space_uid,
        external_user: Some(external_user.to_string()),
    };

    let response = matched.route.handler.call(state, &ctx, &request).await.map_err(|e| {
        tracing::error!(
            "view {} failed for external_user {} in {}: {}",
            view,
            external_user,
            ctx.space_uid,
            e
        );
        DispatchError::Upstream(e)
    })?;

    Ok(ViewResponse {
        status: response.status,
        body: filter_payload(response.body, view, &scope),
    })
}
