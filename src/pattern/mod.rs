//! Pattern search over clustering output, plus the label/remark/owner
//! annotations users attach to a pattern signature.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{PatternRow, Remark, SignatureConfig};
use crate::store::{PatternStore, StoreError};

pub const DEFAULT_SIZE: usize = 10000;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternQuery {
    pub pattern_level: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default)]
    pub show_new_pattern: bool,
}

fn default_size() -> usize {
    DEFAULT_SIZE
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternResult {
    pub pattern: String,
    pub signature: String,
    pub count: u64,
    pub percentage: f64,
    pub is_new_class: bool,
    pub labels: Vec<String>,
    pub remark: Vec<Remark>,
    pub owners: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum SignatureUpdate {
    Label(String),
    Owners(Vec<String>),
}

#[derive(Debug, Clone)]
pub enum RemarkChange {
    Create { remark: String },
    Update { old_remark: String, new_remark: String, create_time: i64 },
    Delete { remark: String, create_time: i64 },
}

/// Business object for one index set's patterns.
pub struct PatternHandler<'a> {
    store: &'a dyn PatternStore,
    index_set_id: i64,
}

impl<'a> PatternHandler<'a> {
    pub fn new(store: &'a dyn PatternStore, index_set_id: i64) -> Self {
        Self { store, index_set_id }
    }

    pub async fn pattern_search(&self, query: &PatternQuery) -> Result<Vec<PatternResult>, PatternError> {
        if query.pattern_level.trim().is_empty() {
            return Err(PatternError::Invalid("pattern_level is required".to_string()));
        }

        let rows = self.store.patterns(self.index_set_id, &query.pattern_level).await?;
        // Share is relative to everything clustered at this level, not just the matches.
        let total: u64 = rows.iter().map(|r| r.count).sum();

        let configs: HashMap<String, SignatureConfig> = self
            .store
            .signature_configs(self.index_set_id)
            .await?
            .into_iter()
            .map(|c| (c.signature.clone(), c))
            .collect();

        let keyword = query.keyword.trim().to_lowercase();
        let mut matched: Vec<PatternRow> = rows
            .into_iter()
            .filter(|r| keyword.is_empty() || r.pattern.to_lowercase().contains(&keyword))
            .filter(|r| !query.show_new_pattern || r.is_new_class)
            .collect();
        matched.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.signature.cmp(&b.signature)));
        matched.truncate(query.size);

        Ok(matched
            .into_iter()
            .map(|row| {
                let config = configs.get(&row.signature);
                PatternResult {
                    percentage: percentage(row.count, total),
                    labels: config
                        .map(|c| c.label.clone())
                        .filter(|l| !l.is_empty())
                        .into_iter()
                        .collect(),
                    remark: config.map(|c| c.remark.clone()).unwrap_or_default(),
                    owners: config.map(|c| c.owners.clone()).unwrap_or_default(),
                    pattern: row.pattern,
                    signature: row.signature,
                    count: row.count,
                    is_new_class: row.is_new_class,
                }
            })
            .collect())
    }

    pub async fn set_signature_config(
        &self,
        signature: &str,
        update: SignatureUpdate,
        username: &str,
    ) -> Result<SignatureConfig, PatternError> {
        let mut config = self.load(signature).await?;
        match update {
            SignatureUpdate::Label(label) => config.label = label,
            SignatureUpdate::Owners(owners) => config.owners = owners,
        }
        self.save(config, username).await
    }

    pub async fn set_clustering_remark(
        &self,
        signature: &str,
        change: RemarkChange,
        username: &str,
    ) -> Result<SignatureConfig, PatternError> {
        let mut config = self.load(signature).await?;
        match change {
            RemarkChange::Create { remark } => {
                if remark.trim().is_empty() {
                    return Err(PatternError::Invalid("remark must not be empty".to_string()));
                }
                config.remark.push(Remark {
                    remark,
                    username: username.to_string(),
                    create_time: Utc::now().timestamp_millis(),
                });
            }
            RemarkChange::Update { old_remark, new_remark, create_time } => {
                let entry = config
                    .remark
                    .iter_mut()
                    .find(|r| r.remark == old_remark && r.create_time == create_time)
                    .ok_or_else(|| remark_not_found(signature, create_time))?;
                entry.remark = new_remark;
                entry.username = username.to_string();
            }
            RemarkChange::Delete { remark, create_time } => {
                let before = config.remark.len();
                config
                    .remark
                    .retain(|r| !(r.remark == remark && r.create_time == create_time));
                if config.remark.len() == before {
                    return Err(remark_not_found(signature, create_time));
                }
            }
        }
        self.save(config, username).await
    }

    async fn load(&self, signature: &str) -> Result<SignatureConfig, PatternError> {
        if signature.trim().is_empty() {
            return Err(PatternError::Invalid("signature is required".to_string()));
        }
        Ok(self
            .store
            .signature_config(self.index_set_id, signature)
            .await?
            .unwrap_or_else(|| SignatureConfig::empty(self.index_set_id, signature)))
    }

    async fn save(&self, mut config: SignatureConfig, username: &str) -> Result<SignatureConfig, PatternError> {
        config.updated_by = username.to_string();
        config.updated_at = Utc::now();
        Ok(self.store.save_signature_config(config).await?)
    }
}

fn remark_not_found(signature: &str, create_time: i64) -> PatternError {
    PatternError::NotFound(format!("remark (create_time={}) not found on signature {}", create_time, signature))
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 10000.0 / total as f64).round() / 100.0
}
