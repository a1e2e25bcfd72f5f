mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use chrono::Duration;
use serde_json::{json, Value};

use common::{TestApp, SPACE};
use log_gateway::views::{search, RequestContext, RouteTable, View, ViewError, ViewRequest, ViewResponse};
use log_gateway::AppState;

fn ids(items: &Value, field: &str) -> Vec<i64> {
    items
        .as_array()
        .map(|a| a.iter().filter_map(|i| i[field].as_i64()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn default_allowed_view_needs_no_grant() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .dispatch(Some("alice"), &json!({"url": "/api/v1/meta/user_info/", "space_uid": SPACE}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!(true));
    assert_eq!(body["data"]["username"], json!("admin"));
    assert_eq!(body["data"]["external_user"], json!("alice"));
    assert_eq!(body["data"]["is_external"], json!(true));
    assert!(app.store.grants().await.is_empty());
}

#[tokio::test]
async fn flagged_view_is_open_and_unfiltered() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .dispatch(Some("alice"), &json!({"url": "/api/v1/search/favorite_group/", "space_uid": SPACE}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], json!("on-call"));
}

/// Counts invocations; stands in for a real list view.
struct CountingView {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl View for CountingView {
    async fn call(&self, _state: &AppState, _ctx: &RequestContext, _request: &ViewRequest) -> Result<ViewResponse, ViewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ViewResponse::ok(Vec::<Value>::new())
    }
}

#[tokio::test]
async fn missing_grant_is_forbidden_before_the_view_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut routes = RouteTable::new();
    routes
        .add(
            Method::GET,
            "/api/v1/search/index_set/",
            search::INDEX_SET_LIST,
            Arc::new(CountingView { calls: calls.clone() }),
        )
        .unwrap();
    let app = TestApp::seeded_with_routes(routes).await;

    let (status, body) = app
        .dispatch(Some("mallory"), &json!({"url": "/api/v1/search/index_set/", "space_uid": SPACE}))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({"result": false, "message": "dispatch_plugin_query: external_user:mallory has no permission."})
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    app.grant("mallory", "log_search", vec![7]).await;
    let (status, _) = app
        .dispatch(Some("mallory"), &json!({"url": "/api/v1/search/index_set/", "space_uid": SPACE}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_grant_counts_as_absent() {
    let app = TestApp::seeded().await;
    app.store
        .insert_grant(common::grant("alice", SPACE, "log_search", vec![7], -Duration::minutes(1)))
        .await;

    let (status, body) = app
        .dispatch(Some("alice"), &json!({"url": "/api/v1/search/index_set/", "space_uid": SPACE}))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("has no permission"));
}

#[tokio::test]
async fn grant_for_another_action_is_not_enough() {
    let app = TestApp::seeded().await;
    app.grant("alice", "log_extract", vec![7]).await;

    let (status, body) = app
        .dispatch(Some("alice"), &json!({"url": "/api/v1/search/index_set/", "space_uid": SPACE}))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("external_user:alice has not enough permission."));
}

#[tokio::test]
async fn list_is_narrowed_to_granted_resources() {
    let app = TestApp::seeded().await;
    app.grant("alice", "log_search", vec![7]).await;

    let (status, body) = app
        .dispatch(Some("alice"), &json!({"url": "/api/v1/search/index_set/", "space_uid": SPACE}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["data"], "index_set_id"), vec![7]);

    let (_, body) = app
        .dispatch(Some("alice"), &json!({"url": "/api/v1/search/favorite/", "space_uid": SPACE}))
        .await;
    assert_eq!(ids(&body["data"], "index_set_id"), vec![7]);
}

#[tokio::test]
async fn grouped_list_is_narrowed_inside_groups() {
    let app = TestApp::seeded().await;
    app.grant("alice", "log_search", vec![7]).await;

    let (status, body) = app
        .dispatch(
            Some("alice"),
            &json!({"url": "/api/v1/search/favorite/list_by_group/", "space_uid": SPACE}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let groups = body["data"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(ids(&groups[0]["favorites"], "index_set_id"), vec![7]);
    assert_eq!(groups[1]["group_name"], json!("ungrouped"));
    assert!(groups[1]["favorites"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn resource_outside_the_grant_is_denied() {
    let app = TestApp::seeded().await;
    app.grant("alice", "log_search", vec![7]).await;

    let (status, body) = app
        .dispatch(
            Some("alice"),
            &json!({
                "url": "/api/v1/pattern/9/search/",
                "method": "POST",
                "space_uid": SPACE,
                "data": {"pattern_level": "05"}
            }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("external_user:alice cannot access resource(ID:9)."));
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .dispatch(Some("alice"), &json!({"url": "/bad/path", "method": "GET"}))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["result"], json!(false));
    assert!(body["message"].as_str().unwrap().contains("resolve view func 404"));
}

#[tokio::test]
async fn invalid_json_is_bad_request() {
    let app = TestApp::seeded().await;

    let (status, body) = app.dispatch_raw(Some("alice"), "{\"url\": ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"result": false, "message": "invalid json format"}));
}

#[tokio::test]
async fn only_get_and_post_are_proxied() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .dispatch(Some("alice"), &json!({"url": "/api/v1/meta/user_info/", "method": "PUT"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("only support get and post"));
}

#[tokio::test]
async fn space_without_authorizer_is_forbidden() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .dispatch(Some("alice"), &json!({"url": "/api/v1/meta/user_info/", "space_uid": "bkcc__404"}))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("space_uid:bkcc__404 has no authorizer."));
}

#[tokio::test]
async fn space_falls_back_to_the_cookie() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/external/dispatch/",
            &[("User", "alice"), ("Cookie", "lang=en; space_uid=bkcc__2")],
            Some(json!({"url": "/api/v1/meta/user_info/"}).to_string()),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["space_uid"], json!(SPACE));
}

#[tokio::test]
async fn null_or_empty_space_falls_back_to_the_cookie() {
    let app = TestApp::seeded().await;

    for body in [
        json!({"url": "/api/v1/meta/user_info/", "space_uid": null}),
        json!({"url": "/api/v1/meta/user_info/", "space_uid": ""}),
    ] {
        let (status, body) = app
            .request(
                Method::POST,
                "/external/dispatch/",
                &[("User", "alice"), ("Cookie", "space_uid=bkcc__2")],
                Some(body.to_string()),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["space_uid"], json!(SPACE));
    }
}

#[tokio::test]
async fn missing_user_header_is_forbidden() {
    let app = TestApp::seeded().await;

    let (status, _) = app
        .dispatch(None, &json!({"url": "/api/v1/meta/user_info/", "space_uid": SPACE}))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn repeated_calls_return_identical_payloads() {
    let app = TestApp::seeded().await;
    app.grant("alice", "log_search", vec![5, 7]).await;
    let request = json!({"url": "/api/v1/search/favorite/list_by_group/", "space_uid": SPACE});

    let (first_status, first) = app.dispatch(Some("alice"), &request).await;
    let (second_status, second) = app.dispatch(Some("alice"), &request).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(first_status, second_status);
    assert_eq!(first, second);
}

#[tokio::test]
async fn view_errors_keep_their_status() {
    let app = TestApp::seeded().await;
    app.grant("alice", "log_search", vec![7]).await;

    let (status, body) = app
        .dispatch(
            Some("alice"),
            &json!({"url": "/api/v1/pattern/7/search/", "method": "POST", "space_uid": SPACE, "data": {}}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["result"], json!(false));
}
