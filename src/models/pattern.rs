use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One aggregated pattern produced by the clustering pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRow {
    pub index_set_id: i64,
    pub pattern_level: String,
    pub pattern: String,
    pub signature: String,
    pub count: u64,
    #[serde(default)]
    pub is_new_class: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remark {
    pub remark: String,
    pub username: String,
    /// Milliseconds since the epoch.
    pub create_time: i64,
}

/// User annotations attached to a pattern signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureConfig {
    pub index_set_id: i64,
    pub signature: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub remark: Vec<Remark>,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default)]
    pub updated_by: String,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl SignatureConfig {
    pub fn empty(index_set_id: i64, signature: &str) -> Self {
        Self {
            index_set_id,
            signature: signature.to_string(),
            label: String::new(),
            remark: Vec::new(),
            owners: Vec::new(),
            updated_by: String::new(),
            updated_at: Utc::now(),
        }
    }
}
