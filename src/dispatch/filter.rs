//! Restricts list payloads to the resources a grant covers.

use serde_json::Value;

use super::Scope;
use crate::permission::{
    ExternalAction, ViewId, FAVORITE_VIEWSET_LIST, FAVORITE_VIEWSET_LIST_BY_GROUP, SEARCH_VIEWSET_LIST,
};

const RESOURCE_FIELD: &str = "index_set_id";
const GROUP_ITEMS_FIELD: &str = "favorites";

enum Shape {
    /// `data` is a list of resource-keyed items.
    Flat,
    /// `data` is a list of groups, each nesting its items.
    Grouped,
}

fn shape_of(action: ExternalAction, view: ViewId) -> Option<Shape> {
    if action != ExternalAction::LogSearch {
        return None;
    }
    if SEARCH_VIEWSET_LIST.is_view(view) || FAVORITE_VIEWSET_LIST.is_view(view) {
        Some(Shape::Flat)
    } else if FAVORITE_VIEWSET_LIST_BY_GROUP.is_view(view) {
        Some(Shape::Grouped)
    } else {
        None
    }
}

/// Filter the `data` list of a response body. Anything not recognized passes
/// through untouched.
pub fn filter_payload(mut body: Value, view: ViewId, scope: &Scope) -> Value {
    if !scope.is_restricted() {
        return body;
    }
    let Some(shape) = scope.action_id.and_then(|action| shape_of(action, view)) else {
        return body;
    };
    let Some(Value::Array(items)) = body.get_mut("data") else {
        return body;
    };

    match shape {
        Shape::Flat => retain_allowed(items, scope),
        Shape::Grouped => {
            for group in items.iter_mut() {
                if let Some(Value::Array(nested)) = group.get_mut(GROUP_ITEMS_FIELD) {
                    retain_allowed(nested, scope);
                }
            }
        }
    }
    body
}

fn retain_allowed(items: &mut Vec<Value>, scope: &Scope) {
    items.retain(|item| {
        item.get(RESOURCE_FIELD)
            .and_then(Value::as_i64)
            .is_some_and(|id| scope.resources.contains(&id))
    });
}
