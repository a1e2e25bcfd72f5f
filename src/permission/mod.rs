//! Static classification of (view set, action) pairs against external action IDs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Capabilities that can be granted to an external identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalAction {
    LogSearch,
    LogExtract,
    LogCommon,
}

impl ExternalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalAction::LogSearch => "log_search",
            ExternalAction::LogExtract => "log_extract",
            ExternalAction::LogCommon => "log_common",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "log_search" => Some(ExternalAction::LogSearch),
            "log_extract" => Some(ExternalAction::LogExtract),
            "log_common" => Some(ExternalAction::LogCommon),
            _ => None,
        }
    }

    /// Name of the request field that identifies the guarded resource, if any.
    pub fn resource_key(&self) -> Option<&'static str> {
        match self {
            ExternalAction::LogSearch => Some("index_set_id"),
            ExternalAction::LogExtract | ExternalAction::LogCommon => None,
        }
    }
}

/// A routed view: the view set and the action it dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId {
    pub view_set: &'static str,
    pub view_action: &'static str,
}

impl ViewId {
    pub const fn new(view_set: &'static str, view_action: &'static str) -> Self {
        Self { view_set, view_action }
    }
}

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.view_set, self.view_action)
    }
}

/// A row of the compatibility table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSetAction {
    pub action_id: ExternalAction,
    pub view_set: &'static str,
    /// Empty matches every action of the view set.
    pub view_action: &'static str,
    /// Reachable without any grant.
    pub default_permission: bool,
}

impl ViewSetAction {
    const fn new(action_id: ExternalAction, view_set: &'static str, view_action: &'static str) -> Self {
        Self { action_id, view_set, view_action, default_permission: false }
    }

    const fn open(action_id: ExternalAction, view_set: &'static str, view_action: &'static str) -> Self {
        Self { action_id, view_set, view_action, default_permission: true }
    }

    pub fn matches(&self, view: ViewId) -> bool {
        self.view_set == view.view_set && (self.view_action.is_empty() || self.view_action == view.view_action)
    }

    /// Exact match, no wildcard.
    pub fn is_view(&self, view: ViewId) -> bool {
        self.view_set == view.view_set && self.view_action == view.view_action
    }
}

pub const SEARCH_VIEWSET_LIST: ViewSetAction = ViewSetAction::new(ExternalAction::LogSearch, "SearchViewSet", "list");
pub const FAVORITE_VIEWSET_LIST: ViewSetAction =
    ViewSetAction::new(ExternalAction::LogSearch, "FavoriteViewSet", "list");
pub const FAVORITE_VIEWSET_LIST_BY_GROUP: ViewSetAction =
    ViewSetAction::new(ExternalAction::LogSearch, "FavoriteViewSet", "list_by_group");

/// Ordered table consulted by both the default-allowed check and the grant check.
pub const VIEW_SET_ACTIONS: &[ViewSetAction] = &[
    ViewSetAction::new(ExternalAction::LogCommon, "MetaViewSet", ""),
    SEARCH_VIEWSET_LIST,
    FAVORITE_VIEWSET_LIST,
    FAVORITE_VIEWSET_LIST_BY_GROUP,
    ViewSetAction::open(ExternalAction::LogSearch, "FavoriteGroupViewSet", "list"),
    ViewSetAction::new(ExternalAction::LogSearch, "PatternViewSet", ""),
];

/// True when the view needs no grant at all: a common action, or a row
/// explicitly flagged as open.
pub fn is_default_allowed(view: ViewId) -> bool {
    VIEW_SET_ACTIONS
        .iter()
        .filter(|row| row.matches(view))
        .any(|row| row.action_id == ExternalAction::LogCommon || row.default_permission)
}

/// True when a grant of `action_id` covers the view.
pub fn is_action_valid(view: ViewId, action_id: &str) -> bool {
    VIEW_SET_ACTIONS
        .iter()
        .any(|row| row.action_id.as_str() == action_id && row.matches(view))
}

/// The resource a request targets under `action`, path parameters first.
///
/// `Err` carries a value that is present but not an integer ID.
pub fn resource_of(
    action: ExternalAction,
    params: &HashMap<String, String>,
    body: &Value,
) -> Result<Option<i64>, String> {
    let Some(key) = action.resource_key() else {
        return Ok(None);
    };
    if let Some(raw) = params.get(key) {
        return raw.trim().parse::<i64>().map(Some).map_err(|_| raw.clone());
    }
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| n.to_string()),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| s.clone()),
        Some(other) => Err(other.to_string()),
    }
}
