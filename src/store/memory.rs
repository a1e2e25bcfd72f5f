use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CatalogStore, Fixture, PatternStore, PermissionStore, StoreError};
use crate::models::{
    ApplyStatus, ExternalPermission, ExternalPermissionApplyRecord, Favorite, FavoriteGroup, IndexSet,
    PatternRow, SignatureConfig, Space,
};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    grants: Vec<ExternalPermission>,
    authorizers: HashMap<String, String>,
    spaces: Vec<Space>,
    apply_records: Vec<ExternalPermissionApplyRecord>,
    index_sets: Vec<IndexSet>,
    favorites: Vec<Favorite>,
    favorite_groups: Vec<FavoriteGroup>,
    patterns: Vec<PatternRow>,
    signature_configs: HashMap<(i64, String), SignatureConfig>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn push_grant(&mut self, mut grant: ExternalPermission) {
        if grant.id == 0 {
            grant.id = self.allocate_id();
        } else {
            self.next_id = self.next_id.max(grant.id);
        }
        self.grants.push(grant);
        self.grants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    }

    fn active_grants<'a>(
        &'a self,
        authorized_user: &'a str,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a ExternalPermission> + 'a {
        self.grants
            .iter()
            .filter(move |g| g.authorized_user == authorized_user && g.is_active(now))
    }
}

/// In-process store used for development, tests, and the catalog in every mode.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let mut state = MemoryState::default();
        for grant in fixture.grants {
            state.push_grant(grant);
        }
        for settings in fixture.authorizers {
            state.authorizers.insert(settings.space_uid, settings.authorizer);
        }
        for mut record in fixture.apply_records {
            if record.id == 0 {
                record.id = state.allocate_id();
            }
            state.apply_records.push(record);
        }
        for config in fixture.signature_configs {
            state
                .signature_configs
                .insert((config.index_set_id, config.signature.clone()), config);
        }
        state.spaces = fixture.spaces;
        state.index_sets = fixture.index_sets;
        state.favorites = fixture.favorites;
        state.favorite_groups = fixture.favorite_groups;
        state.patterns = fixture.patterns;
        Self { state: RwLock::new(state) }
    }

    pub async fn insert_grant(&self, grant: ExternalPermission) {
        self.state.write().await.push_grant(grant);
    }

    pub async fn set_authorizer(&self, space_uid: &str, authorizer: &str) {
        self.state
            .write()
            .await
            .authorizers
            .insert(space_uid.to_string(), authorizer.to_string());
    }

    pub async fn insert_space(&self, space: Space) {
        self.state.write().await.spaces.push(space);
    }

    pub async fn insert_apply_record(&self, mut record: ExternalPermissionApplyRecord) -> i64 {
        let mut state = self.state.write().await;
        if record.id == 0 {
            record.id = state.allocate_id();
        }
        let id = record.id;
        state.apply_records.push(record);
        id
    }

    pub async fn insert_index_set(&self, index_set: IndexSet) {
        self.state.write().await.index_sets.push(index_set);
    }

    pub async fn insert_favorite_group(&self, group: FavoriteGroup) {
        self.state.write().await.favorite_groups.push(group);
    }

    pub async fn insert_favorite(&self, favorite: Favorite) {
        self.state.write().await.favorites.push(favorite);
    }

    pub async fn insert_pattern(&self, pattern: PatternRow) {
        self.state.write().await.patterns.push(pattern);
    }

    /// Every stored grant regardless of expiry, in stored order.
    pub async fn grants(&self) -> Vec<ExternalPermission> {
        self.state.read().await.grants.clone()
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn active_action_ids(
        &self,
        authorized_user: &str,
        space_uid: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        let mut action_ids: Vec<String> = Vec::new();
        for grant in state.active_grants(authorized_user, now).filter(|g| g.space_uid == space_uid) {
            if !action_ids.contains(&grant.action_id) {
                action_ids.push(grant.action_id.clone());
            }
        }
        Ok(action_ids)
    }

    async fn active_grant(
        &self,
        authorized_user: &str,
        space_uid: &str,
        action_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ExternalPermission>, StoreError> {
        let state = self.state.read().await;
        let grant = state
            .active_grants(authorized_user, now)
            .find(|g| g.space_uid == space_uid && g.action_id == action_id)
            .cloned();
        Ok(grant)
    }

    async fn authorized_spaces(&self, authorized_user: &str, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        let mut spaces: Vec<String> = Vec::new();
        for grant in state.active_grants(authorized_user, now) {
            if !spaces.contains(&grant.space_uid) {
                spaces.push(grant.space_uid.clone());
            }
        }
        Ok(spaces)
    }

    async fn authorizer(&self, space_uid: &str) -> Result<Option<String>, StoreError> {
        Ok(self.state.read().await.authorizers.get(space_uid).cloned())
    }

    async fn spaces(&self, space_uids: &[String]) -> Result<Vec<Space>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .spaces
            .iter()
            .filter(|s| space_uids.contains(&s.space_uid))
            .cloned()
            .collect())
    }

    async fn apply_record_by_sn(&self, sn: &str) -> Result<Option<ExternalPermissionApplyRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.apply_records.iter().find(|r| r.sn == sn).cloned())
    }

    async fn finish_apply_record(
        &self,
        record_id: i64,
        status: ApplyStatus,
        grants: Vec<ExternalPermission>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let record = state
            .apply_records
            .iter_mut()
            .find(|r| r.id == record_id && !r.status.is_terminal())
            .ok_or_else(|| StoreError::NotFound(format!("pending apply record {}", record_id)))?;
        record.status = status;

        for grant in grants {
            state.grants.retain(|g| {
                !(g.authorized_user == grant.authorized_user
                    && g.space_uid == grant.space_uid
                    && g.action_id == grant.action_id)
            });
            state.push_grant(grant);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn index_sets(&self, space_uid: &str) -> Result<Vec<IndexSet>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .index_sets
            .iter()
            .filter(|i| i.space_uid == space_uid)
            .cloned()
            .collect())
    }

    async fn favorites(&self, space_uid: &str) -> Result<Vec<Favorite>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .favorites
            .iter()
            .filter(|f| f.space_uid == space_uid)
            .cloned()
            .collect())
    }

    async fn favorite_groups(&self, space_uid: &str) -> Result<Vec<FavoriteGroup>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .favorite_groups
            .iter()
            .filter(|g| g.space_uid == space_uid)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PatternStore for MemoryStore {
    async fn patterns(&self, index_set_id: i64, pattern_level: &str) -> Result<Vec<PatternRow>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .patterns
            .iter()
            .filter(|p| p.index_set_id == index_set_id && p.pattern_level == pattern_level)
            .cloned()
            .collect())
    }

    async fn signature_configs(&self, index_set_id: i64) -> Result<Vec<SignatureConfig>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .signature_configs
            .values()
            .filter(|c| c.index_set_id == index_set_id)
            .cloned()
            .collect())
    }

    async fn signature_config(
        &self,
        index_set_id: i64,
        signature: &str,
    ) -> Result<Option<SignatureConfig>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .signature_configs
            .get(&(index_set_id, signature.to_string()))
            .cloned())
    }

    async fn save_signature_config(&self, config: SignatureConfig) -> Result<SignatureConfig, StoreError> {
        let mut state = self.state.write().await;
        state
            .signature_configs
            .insert((config.index_set_id, config.signature.clone()), config.clone());
        Ok(config)
    }
}
