use serde::Deserialize;
use std::path::Path;

use super::StoreError;
use crate::models::{
    AuthorizerSettings, ExternalPermission, ExternalPermissionApplyRecord, Favorite, FavoriteGroup, IndexSet,
    PatternRow, SignatureConfig, Space,
};

/// Seed data loaded from YAML, see `fixtures/dev.yaml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub spaces: Vec<Space>,
    pub authorizers: Vec<AuthorizerSettings>,
    pub grants: Vec<ExternalPermission>,
    pub apply_records: Vec<ExternalPermissionApplyRecord>,
    pub index_sets: Vec<IndexSet>,
    pub favorites: Vec<Favorite>,
    pub favorite_groups: Vec<FavoriteGroup>,
    pub patterns: Vec<PatternRow>,
    pub signature_configs: Vec<SignatureConfig>,
}

impl Fixture {
    pub fn from_yaml(source: &str) -> Result<Self, StoreError> {
        serde_yaml::from_str(source).map_err(|e| StoreError::Fixture(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Fixture(format!("{}: {}", path.display(), e)))?;
        let fixture = Self::from_yaml(&source)?;
        tracing::info!(
            "Loaded fixture {} ({} spaces, {} grants, {} index sets, {} patterns)",
            path.display(),
            fixture.spaces.len(),
            fixture.grants.len(),
            fixture.index_sets.len(),
            fixture.patterns.len()
        );
        Ok(fixture)
    }
}
