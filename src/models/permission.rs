use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A grant of one action in one space to an external identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPermission {
    #[serde(default)]
    pub id: i64,
    pub authorized_user: String,
    pub space_uid: String,
    pub action_id: String,
    #[serde(default)]
    pub resources: Vec<i64>,
    pub expire_time: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ExternalPermission {
    /// Expired grants are treated as if they did not exist.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expire_time > now
    }
}

/// Which internal identity proxied requests in a space execute as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizerSettings {
    pub space_uid: String,
    pub authorizer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Pending,
    Success,
    Failed,
}

impl ApplyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyStatus::Pending => "pending",
            ApplyStatus::Success => "success",
            ApplyStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ApplyStatus::Pending),
            "success" => Some(ApplyStatus::Success),
            "failed" => Some(ApplyStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplyStatus::Pending)
    }
}

/// An application for a grant, waiting on the approval workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPermissionApplyRecord {
    #[serde(default)]
    pub id: i64,
    pub sn: String,
    pub authorized_users: Vec<String>,
    pub space_uid: String,
    pub action_id: String,
    #[serde(default)]
    pub resources: Vec<i64>,
    pub expire_time: DateTime<Utc>,
    #[serde(default = "pending")]
    pub status: ApplyStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn pending() -> ApplyStatus {
    ApplyStatus::Pending
}

impl ExternalPermissionApplyRecord {
    /// The grants an approval of this record creates, one per authorized user.
    pub fn to_grants(&self, now: DateTime<Utc>) -> Vec<ExternalPermission> {
        self.authorized_users
            .iter()
            .map(|user| ExternalPermission {
                id: 0,
                authorized_user: user.clone(),
                space_uid: self.space_uid.clone(),
                action_id: self.action_id.clone(),
                resources: self.resources.clone(),
                expire_time: self.expire_time,
                created_at: now,
            })
            .collect()
    }
}
