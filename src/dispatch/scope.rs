//! Authorization scope of an external identity for one routed view.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use super::{DispatchError, Forbidden};
use crate::permission::{self, ExternalAction, ViewId};
use crate::store::PermissionStore;

/// Result of the scope lookup. `allowed` means the response is restricted to
/// `resources`; it is false for default-allowed views.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scope {
    pub allowed: bool,
    pub action_id: Option<ExternalAction>,
    pub resources: HashSet<i64>,
}

impl Scope {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Whether the response must be narrowed to `resources`.
    pub fn is_restricted(&self) -> bool {
        self.allowed && self.action_id.is_some()
    }
}

/// Who is asking for what.
#[derive(Debug, Clone, Copy)]
pub struct ScopeRequest<'a> {
    pub external_user: &'a str,
    pub space_uid: &'a str,
    pub view: ViewId,
    pub params: &'a HashMap<String, String>,
    pub data: &'a Value,
}

pub async fn authorize(
    store: &dyn PermissionStore,
    request: ScopeRequest<'_>,
    now: DateTime<Utc>,
) -> Result<Scope, DispatchError> {
    if permission::is_default_allowed(request.view) {
        tracing::debug!("{} is default allowed", request.view);
        return Ok(Scope::unrestricted());
    }

    let user = request.external_user;
    let action_ids = store.active_action_ids(user, request.space_uid, now).await?;
    if action_ids.is_empty() {
        tracing::warn!("external_user {} has no grant in space {}", user, request.space_uid);
        return Err(Forbidden::NoPermission { user: user.to_string() }.into());
    }

    let action = action_ids
        .iter()
        .filter(|id| permission::is_action_valid(request.view, id))
        .find_map(|id| ExternalAction::parse(id))
        .ok_or_else(|| {
            tracing::warn!("external_user {} holds {:?}, none valid for {}", user, action_ids, request.view);
            DispatchError::from(Forbidden::InsufficientPermission { user: user.to_string() })
        })?;

    let Some(grant) = store
        .active_grant(user, request.space_uid, action.as_str(), now)
        .await?
    else {
        // Expired between the two lookups.
        return Ok(Scope { allowed: false, action_id: Some(action), resources: HashSet::new() });
    };

    let scope = Scope {
        allowed: true,
        action_id: Some(action),
        resources: grant.resources.into_iter().collect(),
    };

    let denied = |resource: String| {
        tracing::warn!("external_user {} denied resource {} for {}", user, resource, request.view);
        DispatchError::from(Forbidden::ResourceDenied { user: user.to_string(), resource })
    };
    match permission::resource_of(action, request.params, request.data) {
        Ok(Some(id)) if !scope.resources.contains(&id) => Err(denied(id.to_string())),
        Ok(_) => Ok(scope),
        Err(raw) => Err(denied(raw)),
    }
}
