//! In-process resolution of a proxied URL against the view routing table.

use axum::http::{header, HeaderMap, HeaderValue, Method};
use serde_json::{Map, Value};
use url::Url;

use super::DispatchError;
use crate::views::{RouteMatch, RouteTable, ViewRequest};

/// Only used to parse relative URLs; never contacted.
const INTERNAL_BASE: &str = "http://internal.invalid/";

/// Accepts `GET` and `POST` in any case.
pub fn parse_method(method: &str) -> Result<Method, DispatchError> {
    match method.to_ascii_lowercase().as_str() {
        "get" => Ok(Method::GET),
        "post" => Ok(Method::POST),
        _ => Err(DispatchError::UnsupportedMethod(method.to_string())),
    }
}

/// Resolve `url` to a route and synthesize the request its view will see.
///
/// The body is the proxied `data` for POST and empty for GET.
pub fn resolve<'t>(
    table: &'t RouteTable,
    method: &str,
    url: &str,
    data: &Value,
) -> Result<(RouteMatch<'t>, ViewRequest), DispatchError> {
    let method = parse_method(method)?;

    let base = Url::parse(INTERNAL_BASE).map_err(|_| DispatchError::RouteNotFound(url.to_string()))?;
    let parsed = base
        .join(url)
        .map_err(|_| DispatchError::RouteNotFound(url.to_string()))?;

    let matched = table
        .resolve(&method, parsed.path())
        .ok_or_else(|| DispatchError::RouteNotFound(url.to_string()))?;

    let body = if method == Method::POST {
        data.clone()
    } else {
        Value::Object(Map::new())
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let request = ViewRequest {
        method,
        path: parsed.path().to_string(),
        query: parsed.query_pairs().into_owned().collect(),
        params: matched.params.clone(),
        body,
        headers,
    };
    Ok((matched, request))
}
