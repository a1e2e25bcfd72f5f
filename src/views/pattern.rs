use async_trait::async_trait;
use serde::Deserialize;

use super::{RequestContext, View, ViewError, ViewRequest, ViewResponse};
use crate::app::AppState;
use crate::pattern::{PatternError, PatternHandler, PatternQuery, RemarkChange, SignatureUpdate};
use crate::permission::ViewId;

pub const SEARCH: ViewId = ViewId::new("PatternViewSet", "search");
pub const SET_LABEL: ViewId = ViewId::new("PatternViewSet", "set_label");
pub const SET_REMARK: ViewId = ViewId::new("PatternViewSet", "set_remark");
pub const UPDATE_REMARK: ViewId = ViewId::new("PatternViewSet", "update_remark");
pub const DELETE_REMARK: ViewId = ViewId::new("PatternViewSet", "delete_remark");
pub const SET_OWNER: ViewId = ViewId::new("PatternViewSet", "set_owner");

impl From<PatternError> for ViewError {
    fn from(err: PatternError) -> Self {
        match err {
            PatternError::Invalid(msg) => ViewError::BadRequest(msg),
            PatternError::NotFound(msg) => ViewError::NotFound(msg),
            PatternError::Store(e) => ViewError::Store(e),
        }
    }
}

fn handler<'a>(state: &'a AppState, request: &ViewRequest) -> Result<PatternHandler<'a>, ViewError> {
    let index_set_id = request.param_i64("index_set_id")?;
    Ok(PatternHandler::new(state.patterns.as_ref(), index_set_id))
}

#[derive(Debug, Deserialize)]
struct SetLabelParams {
    signature: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct SetRemarkParams {
    signature: String,
    remark: String,
}

#[derive(Debug, Deserialize)]
struct UpdateRemarkParams {
    signature: String,
    old_remark: String,
    new_remark: String,
    create_time: i64,
}

#[derive(Debug, Deserialize)]
struct DeleteRemarkParams {
    signature: String,
    remark: String,
    create_time: i64,
}

#[derive(Debug, Deserialize)]
struct SetOwnerParams {
    signature: String,
    owners: Vec<String>,
}

/// POST /api/v1/pattern/:index_set_id/search/
pub struct Search;

#[async_trait]
impl View for Search {
    async fn call(&self, state: &AppState, _ctx: &RequestContext, request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        let query: PatternQuery = request.parse_body()?;
        let results = handler(state, request)?.pattern_search(&query).await?;
        ViewResponse::ok(results)
    }
}

/// POST /api/v1/pattern/:index_set_id/label/
pub struct SetLabel;

#[async_trait]
impl View for SetLabel {
    async fn call(&self, state: &AppState, ctx: &RequestContext, request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        let params: SetLabelParams = request.parse_body()?;
        let config = handler(state, request)?
            .set_signature_config(&params.signature, SignatureUpdate::Label(params.label), &ctx.username)
            .await?;
        ViewResponse::ok(config)
    }
}

/// POST /api/v1/pattern/:index_set_id/remark/
pub struct SetRemark;

#[async_trait]
impl View for SetRemark {
    async fn call(&self, state: &AppState, ctx: &RequestContext, request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        let params: SetRemarkParams = request.parse_body()?;
        let config = handler(state, request)?
            .set_clustering_remark(
                &params.signature,
                RemarkChange::Create { remark: params.remark },
                &ctx.username,
            )
            .await?;
        ViewResponse::ok(config)
    }
}

/// PUT /api/v1/pattern/:index_set_id/update_remark/
pub struct UpdateRemark;

#[async_trait]
impl View for UpdateRemark {
    async fn call(&self, state: &AppState, ctx: &RequestContext, request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        let params: UpdateRemarkParams = request.parse_body()?;
        let config = handler(state, request)?
            .set_clustering_remark(
                &params.signature,
                RemarkChange::Update {
                    old_remark: params.old_remark,
                    new_remark: params.new_remark,
                    create_time: params.create_time,
                },
                &ctx.username,
            )
            .await?;
        ViewResponse::ok(config)
    }
}

/// DELETE /api/v1/pattern/:index_set_id/delete_remark/
pub struct DeleteRemark;

#[async_trait]
impl View for DeleteRemark {
    async fn call(&self, state: &AppState, ctx: &RequestContext, request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        let params: DeleteRemarkParams = request.parse_body()?;
        let config = handler(state, request)?
            .set_clustering_remark(
                &params.signature,
                RemarkChange::Delete { remark: params.remark, create_time: params.create_time },
                &ctx.username,
            )
            .await?;
        ViewResponse::ok(config)
    }
}

/// POST /api/v1/pattern/:index_set_id/owner/
pub struct SetOwner;

#[async_trait]
impl View for SetOwner {
    async fn call(&self, state: &AppState, ctx: &RequestContext, request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        let params: SetOwnerParams = request.parse_body()?;
        let config = handler(state, request)?
            .set_signature_config(&params.signature, SignatureUpdate::Owners(params.owners), &ctx.username)
            .await?;
        ViewResponse::ok(config)
    }
}
