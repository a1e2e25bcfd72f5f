use async_trait::async_trait;

use super::{context_json, RequestContext, View, ViewError, ViewRequest, ViewResponse};
use crate::app::AppState;
use crate::permission::ViewId;

pub const USER_INFO: ViewId = ViewId::new("MetaViewSet", "user_info");

/// GET /api/v1/meta/user_info/ - who the request runs as
pub struct UserInfo;

#[async_trait]
impl View for UserInfo {
    async fn call(&self, _state: &AppState, ctx: &RequestContext, _request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        ViewResponse::ok(context_json(ctx))
    }
}
