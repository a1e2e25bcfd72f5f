//! Internal API views and the static routing table that maps paths to them.
//!
//! Every view is reachable two ways: directly by session callers under its
//! own path, and through the external dispatch proxy, which resolves the same
//! table in-process and replays the request under the space's authorizer.

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::app::AppState;
use crate::middleware::ApiResponse;
use crate::permission::ViewId;
use crate::store::StoreError;

pub mod meta;
pub mod pattern;
pub mod search;

/// Identity and space a view executes under.
///
/// Built once per request and passed by reference; views never see the raw
/// inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    /// Identity the view runs as. For proxied calls this is the authorizer.
    pub username: String,
    pub space_uid: String,
    /// Set when the call arrived through the external dispatch proxy.
    pub external_user: Option<String>,
}

impl RequestContext {
    pub fn session(username: impl Into<String>, space_uid: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            space_uid: space_uid.into(),
            external_user: None,
        }
    }

    pub fn is_external(&self) -> bool {
        self.external_user.is_some()
    }

    pub fn require_space(&self) -> Result<&str, ViewError> {
        if self.space_uid.is_empty() {
            return Err(ViewError::BadRequest("space_uid is required".to_string()));
        }
        Ok(&self.space_uid)
    }
}

/// The request a view sees, synthesized from either entry point.
#[derive(Debug, Clone)]
pub struct ViewRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub params: HashMap<String, String>,
    pub body: Value,
    pub headers: HeaderMap,
}

impl ViewRequest {
    pub fn param_i64(&self, name: &str) -> Result<i64, ViewError> {
        let raw = self
            .params
            .get(name)
            .ok_or_else(|| ViewError::BadRequest(format!("missing path parameter {}", name)))?;
        raw.parse()
            .map_err(|_| ViewError::BadRequest(format!("{} must be an integer, got '{}'", name, raw)))
    }

    /// Deserialize the JSON body into a view's parameter struct.
    pub fn parse_body<T: DeserializeOwned>(&self) -> Result<T, ViewError> {
        serde_json::from_value(self.body.clone()).map_err(|e| ViewError::BadRequest(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ViewResponse {
    pub fn ok<T: Serialize>(data: T) -> Result<Self, ViewError> {
        let body = ApiResponse::success(data)
            .into_value()
            .map_err(|e| ViewError::Serialization(e.to_string()))?;
        Ok(Self { status: StatusCode::OK, body })
    }
}

impl IntoResponse for ViewResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("failed to serialize response: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ViewError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ViewError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ViewError::NotFound(_) => StatusCode::NOT_FOUND,
            ViewError::Serialization(_) | ViewError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[async_trait]
pub trait View: Send + Sync {
    async fn call(&self, state: &AppState, ctx: &RequestContext, request: &ViewRequest)
        -> Result<ViewResponse, ViewError>;
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route {pattern}: {source}")]
    Insert {
        pattern: String,
        #[source]
        source: matchit::InsertError,
    },
}

/// One entry of the routing table.
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: &'static str,
    pub view: ViewId,
    pub handler: Arc<dyn View>,
}

/// A resolved path: the route it hit and the captured path parameters.
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: HashMap<String, String>,
}

/// Explicit routing table, one matcher per method.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    matchers: HashMap<Method, matchit::Router<usize>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. Patterns use `:name` segments.
    pub fn add(
        &mut self,
        method: Method,
        pattern: &'static str,
        view: ViewId,
        handler: Arc<dyn View>,
    ) -> Result<&mut Self, RouteError> {
        let index = self.routes.len();
        self.matchers
            .entry(method.clone())
            .or_insert_with(matchit::Router::new)
            .insert(to_matchit_pattern(pattern), index)
            .map_err(|source| RouteError::Insert { pattern: pattern.to_string(), source })?;
        self.routes.push(Route { method, pattern, view, handler });
        Ok(self)
    }

    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let matched = self.matchers.get(method)?.at(path).ok()?;
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Some(RouteMatch { route: &self.routes[*matched.value], params })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// Convert `:param` segments to matchit's `{param}` syntax.
fn to_matchit_pattern(path: &str) -> String {
    let mut result = String::with_capacity(path.len() + 4);
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == ':' {
            result.push('{');
            while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                result.push(c);
            }
            result.push('}');
        } else {
            result.push(ch);
        }
    }

    result
}

/// The routing table of every view this service exposes.
pub fn route_table() -> Result<RouteTable, RouteError> {
    let mut table = RouteTable::new();
    table
        .add(Method::GET, "/api/v1/meta/user_info/", meta::USER_INFO, Arc::new(meta::UserInfo))?
        .add(Method::GET, "/api/v1/search/index_set/", search::INDEX_SET_LIST, Arc::new(search::IndexSetList))?
        .add(Method::GET, "/api/v1/search/favorite/", search::FAVORITE_LIST, Arc::new(search::FavoriteList))?
        .add(
            Method::GET,
            "/api/v1/search/favorite/list_by_group/",
            search::FAVORITE_LIST_BY_GROUP,
            Arc::new(search::FavoriteListByGroup),
        )?
        .add(
            Method::GET,
            "/api/v1/search/favorite_group/",
            search::FAVORITE_GROUP_LIST,
            Arc::new(search::FavoriteGroupList),
        )?
        .add(
            Method::POST,
            "/api/v1/pattern/:index_set_id/search/",
            pattern::SEARCH,
            Arc::new(pattern::Search),
        )?
        .add(
            Method::POST,
            "/api/v1/pattern/:index_set_id/label/",
            pattern::SET_LABEL,
            Arc::new(pattern::SetLabel),
        )?
        .add(
            Method::POST,
            "/api/v1/pattern/:index_set_id/remark/",
            pattern::SET_REMARK,
            Arc::new(pattern::SetRemark),
        )?
        .add(
            Method::PUT,
            "/api/v1/pattern/:index_set_id/update_remark/",
            pattern::UPDATE_REMARK,
            Arc::new(pattern::UpdateRemark),
        )?
        .add(
            Method::DELETE,
            "/api/v1/pattern/:index_set_id/delete_remark/",
            pattern::DELETE_REMARK,
            Arc::new(pattern::DeleteRemark),
        )?
        .add(
            Method::POST,
            "/api/v1/pattern/:index_set_id/owner/",
            pattern::SET_OWNER,
            Arc::new(pattern::SetOwner),
        )?;
    Ok(table)
}

pub(crate) fn context_json(ctx: &RequestContext) -> Value {
    json!({
        "username": ctx.username,
        "space_uid": ctx.space_uid,
        "external_user": ctx.external_user,
        "is_external": ctx.is_external(),
    })
}
