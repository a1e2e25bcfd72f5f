use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    ApplyStatus, ExternalPermission, ExternalPermissionApplyRecord, Favorite, FavoriteGroup, IndexSet,
    PatternRow, SignatureConfig, Space,
};

pub mod fixture;
pub mod memory;
pub mod postgres;

pub use fixture::Fixture;
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid stored value: {0}")]
    Corrupt(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Grants, authorizers, spaces and apply records.
///
/// Every lookup taking `now` ignores grants whose `expire_time` is not after it.
/// Grant order is stored order (`created_at`, then `id`).
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Action IDs the user holds in the space, first grant first, without duplicates.
    async fn active_action_ids(
        &self,
        authorized_user: &str,
        space_uid: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError>;

    /// First active grant for (user, space, action).
    async fn active_grant(
        &self,
        authorized_user: &str,
        space_uid: &str,
        action_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ExternalPermission>, StoreError>;

    /// Space UIDs in which the user holds at least one active grant.
    async fn authorized_spaces(&self, authorized_user: &str, now: DateTime<Utc>) -> Result<Vec<String>, StoreError>;

    async fn authorizer(&self, space_uid: &str) -> Result<Option<String>, StoreError>;

    async fn spaces(&self, space_uids: &[String]) -> Result<Vec<Space>, StoreError>;

    async fn apply_record_by_sn(&self, sn: &str) -> Result<Option<ExternalPermissionApplyRecord>, StoreError>;

    /// Moves a pending record to a terminal status and stores the grants it
    /// produced, replacing existing grants for the same (user, space, action).
    async fn finish_apply_record(
        &self,
        record_id: i64,
        status: ApplyStatus,
        grants: Vec<ExternalPermission>,
    ) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Read side of the search page: index sets and favorites per space.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn index_sets(&self, space_uid: &str) -> Result<Vec<IndexSet>, StoreError>;

    async fn favorites(&self, space_uid: &str) -> Result<Vec<Favorite>, StoreError>;

    async fn favorite_groups(&self, space_uid: &str) -> Result<Vec<FavoriteGroup>, StoreError>;
}

/// Clustering output and the annotations users attach to it.
#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn patterns(&self, index_set_id: i64, pattern_level: &str) -> Result<Vec<PatternRow>, StoreError>;

    async fn signature_configs(&self, index_set_id: i64) -> Result<Vec<SignatureConfig>, StoreError>;

    async fn signature_config(&self, index_set_id: i64, signature: &str)
        -> Result<Option<SignatureConfig>, StoreError>;

    async fn save_signature_config(&self, config: SignatureConfig) -> Result<SignatureConfig, StoreError>;
}
