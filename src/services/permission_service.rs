use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::dispatch::{DispatchError, Forbidden};
use crate::models::{ApplyStatus, Space};
use crate::store::{PermissionStore, StoreError};

/// A space as the external space selector shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceEntry {
    #[serde(flatten)]
    pub space: Space,
    pub is_sticky: bool,
    pub permission: Value,
}

/// Where an external user lands when opening the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalEntry {
    pub external_user: String,
    pub space_uid: String,
    pub authorizer: String,
    pub space: Option<Space>,
}

/// Payload posted by the approval workflow when an application completes.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalCallback {
    pub sn: String,
    #[serde(default)]
    pub approve_result: bool,
    #[serde(default)]
    pub current_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackOutcome {
    pub result: bool,
    pub message: String,
}

impl CallbackOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self { result: true, message: message.into() }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self { result: false, message: message.into() }
    }
}

/// Grant bookkeeping outside the dispatch path: which spaces an external
/// identity can pick, and turning approved applications into grants.
pub struct PermissionService {
    store: Arc<dyn PermissionStore>,
    default_time_zone: String,
}

impl PermissionService {
    pub fn new(store: Arc<dyn PermissionStore>, default_time_zone: impl Into<String>) -> Self {
        Self { store, default_time_zone: default_time_zone.into() }
    }

    /// Spaces with at least one active grant, in first-grant order.
    pub async fn authorized_spaces(
        &self,
        external_user: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SpaceEntry>, StoreError> {
        let space_uids = self.store.authorized_spaces(external_user, now).await?;
        if space_uids.is_empty() {
            return Ok(Vec::new());
        }

        let mut spaces = self.store.spaces(&space_uids).await?;
        spaces.sort_by_key(|s| space_uids.iter().position(|uid| *uid == s.space_uid));

        Ok(spaces
            .into_iter()
            .map(|mut space| {
                if space.time_zone.is_none() {
                    space.time_zone = Some(self.default_time_zone.clone());
                }
                SpaceEntry {
                    space,
                    is_sticky: false,
                    permission: json!({"view_business_v2": true}),
                }
            })
            .collect())
    }

    /// Pick the space an external user enters: the requested one, else the
    /// first authorized. The user needs an active grant there and the space
    /// needs an authorizer.
    pub async fn entry(
        &self,
        external_user: &str,
        requested_space: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ExternalEntry, DispatchError> {
        let space_uids = self.store.authorized_spaces(external_user, now).await?;

        let space_uid = match requested_space.filter(|s| !s.is_empty()) {
            Some(uid) => uid.to_string(),
            None => space_uids
                .first()
                .cloned()
                .ok_or_else(|| Forbidden::NoAuthorizedSpace { user: external_user.to_string() })?,
        };

        if !space_uids.contains(&space_uid) {
            tracing::warn!("external_user {} has no active grant in {}", external_user, space_uid);
            return Err(Forbidden::NoSpacePermission {
                user: external_user.to_string(),
                space_uid,
            }
            .into());
        }

        let authorizer = self
            .store
            .authorizer(&space_uid)
            .await?
            .ok_or_else(|| Forbidden::NoAuthorizer { space_uid: space_uid.clone() })?;

        let space = self
            .store
            .spaces(std::slice::from_ref(&space_uid))
            .await?
            .into_iter()
            .next()
            .map(|mut space| {
                if space.time_zone.is_none() {
                    space.time_zone = Some(self.default_time_zone.clone());
                }
                space
            });
        if space.is_none() {
            tracing::warn!("no space detail for {}", space_uid);
        }

        Ok(ExternalEntry {
            external_user: external_user.to_string(),
            space_uid,
            authorizer,
            space,
        })
    }

    /// Settle an application. Only a pending record moves; anything else is
    /// reported back without touching the store.
    pub async fn callback(
        &self,
        payload: &ApprovalCallback,
        now: DateTime<Utc>,
    ) -> Result<CallbackOutcome, StoreError> {
        let Some(record) = self.store.apply_record_by_sn(&payload.sn).await? else {
            tracing::warn!("approval callback for unknown sn {}", payload.sn);
            return Ok(CallbackOutcome::rejected(format!("apply record sn:{} not found", payload.sn)));
        };

        if record.status.is_terminal() {
            return Ok(CallbackOutcome::rejected(format!(
                "apply record sn:{} already processed ({})",
                record.sn,
                record.status.as_str()
            )));
        }

        let (status, grants) = if payload.approve_result {
            (ApplyStatus::Success, record.to_grants(now))
        } else {
            (ApplyStatus::Failed, Vec::new())
        };

        match self.store.finish_apply_record(record.id, status, grants).await {
            Ok(()) => {}
            // Lost a race with another callback for the same record.
            Err(StoreError::NotFound(_)) => {
                return Ok(CallbackOutcome::rejected(format!("apply record sn:{} already processed", record.sn)));
            }
            Err(e) => return Err(e),
        }

        tracing::info!(
            "apply record {} ({}) -> {} for {:?} in {} [{}]",
            record.sn,
            payload.current_status.as_deref().unwrap_or("-"),
            status.as_str(),
            record.authorized_users,
            record.space_uid,
            record.action_id
        );
        Ok(CallbackOutcome::ok(format!("apply record sn:{} {}", record.sn, status.as_str())))
    }
}
