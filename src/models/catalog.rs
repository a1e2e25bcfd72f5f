use serde::{Deserialize, Serialize};

/// An index set visible in a space's search page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSet {
    pub space_uid: String,
    pub index_set_id: i64,
    pub index_set_name: String,
    #[serde(default)]
    pub scenario_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub space_uid: String,
    pub id: i64,
    pub name: String,
    pub index_set_id: i64,
    pub group_id: i64,
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteGroup {
    pub space_uid: String,
    pub id: i64,
    pub name: String,
}
