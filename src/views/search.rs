use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{RequestContext, View, ViewError, ViewRequest, ViewResponse};
use crate::app::AppState;
use crate::models::Favorite;
use crate::permission::ViewId;

pub const INDEX_SET_LIST: ViewId = ViewId::new("SearchViewSet", "list");
pub const FAVORITE_LIST: ViewId = ViewId::new("FavoriteViewSet", "list");
pub const FAVORITE_LIST_BY_GROUP: ViewId = ViewId::new("FavoriteViewSet", "list_by_group");
pub const FAVORITE_GROUP_LIST: ViewId = ViewId::new("FavoriteGroupViewSet", "list");

/// Favorites whose group no longer exists are shown under this id.
pub const UNGROUPED_ID: i64 = 0;

/// GET /api/v1/search/index_set/
pub struct IndexSetList;

#[async_trait]
impl View for IndexSetList {
    async fn call(&self, state: &AppState, ctx: &RequestContext, _request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        let index_sets = state.catalog.index_sets(ctx.require_space()?).await?;
        ViewResponse::ok(index_sets)
    }
}

/// GET /api/v1/search/favorite/
pub struct FavoriteList;

#[async_trait]
impl View for FavoriteList {
    async fn call(&self, state: &AppState, ctx: &RequestContext, _request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        let favorites = state.catalog.favorites(ctx.require_space()?).await?;
        ViewResponse::ok(favorites)
    }
}

#[derive(Debug, Serialize)]
struct FavoriteGroupEntry {
    group_id: i64,
    group_name: String,
    favorites: Vec<Favorite>,
}

/// GET /api/v1/search/favorite/list_by_group/
pub struct FavoriteListByGroup;

#[async_trait]
impl View for FavoriteListByGroup {
    async fn call(&self, state: &AppState, ctx: &RequestContext, _request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        let space_uid = ctx.require_space()?;
        let groups = state.catalog.favorite_groups(space_uid).await?;
        let mut by_group: BTreeMap<i64, Vec<Favorite>> = BTreeMap::new();
        for favorite in state.catalog.favorites(space_uid).await? {
            let group_id = if groups.iter().any(|g| g.id == favorite.group_id) {
                favorite.group_id
            } else {
                UNGROUPED_ID
            };
            by_group.entry(group_id).or_default().push(favorite);
        }

        let mut entries: Vec<FavoriteGroupEntry> = groups
            .into_iter()
            .map(|g| FavoriteGroupEntry {
                favorites: by_group.remove(&g.id).unwrap_or_default(),
                group_id: g.id,
                group_name: g.name,
            })
            .collect();
        if let Some(favorites) = by_group.remove(&UNGROUPED_ID) {
            entries.push(FavoriteGroupEntry {
                group_id: UNGROUPED_ID,
                group_name: "ungrouped".to_string(),
                favorites,
            });
        }
        ViewResponse::ok(entries)
    }
}

/// GET /api/v1/search/favorite_group/
pub struct FavoriteGroupList;

#[async_trait]
impl View for FavoriteGroupList {
    async fn call(&self, state: &AppState, ctx: &RequestContext, _request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        let groups = state.catalog.favorite_groups(ctx.require_space()?).await?;
        ViewResponse::ok(groups)
    }
}
