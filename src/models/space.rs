use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: i64,
    pub space_type_id: String,
    pub space_type_name: String,
    pub space_id: String,
    pub space_name: String,
    pub space_uid: String,
    pub space_code: String,
    pub bk_biz_id: i64,
    /// Taken from the space properties; `None` falls back to the configured default.
    #[serde(default)]
    pub time_zone: Option<String>,
}
