mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, SPACE};

const SESSION: (&str, &str) = ("X-Username", "carol");

#[tokio::test]
async fn internal_api_requires_a_session() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/meta/user_info/?space_uid=bkcc__2", &[], None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["result"], json!(false));
}

#[tokio::test]
async fn internal_api_runs_as_the_session_user_unfiltered() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/meta/user_info/?space_uid=bkcc__2", &[SESSION], None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], json!("carol"));
    assert_eq!(body["data"]["is_external"], json!(false));

    let (status, body) = app
        .request(Method::GET, "/api/v1/search/index_set/?space_uid=bkcc__2", &[SESSION], None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn internal_api_unknown_view_is_not_found() {
    let app = TestApp::seeded().await;

    let (status, _) = app
        .request(Method::GET, "/api/v1/nothing/here/", &[SESSION], None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_views_need_a_space() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/search/favorite/", &[SESSION], None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("space_uid is required"));
}

#[tokio::test]
async fn pattern_search_through_the_proxy() {
    let app = TestApp::seeded().await;
    app.grant("alice", "log_search", vec![7]).await;

    let (status, body) = app
        .dispatch(
            Some("alice"),
            &json!({
                "url": "/api/v1/pattern/7/search/",
                "method": "POST",
                "space_uid": SPACE,
                "data": {"pattern_level": "05"}
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["signature"], json!("s2"));
    assert_eq!(rows[0]["percentage"], json!(70.0));
}

#[tokio::test]
async fn proxied_annotations_are_made_by_the_authorizer() {
    let app = TestApp::seeded().await;
    app.grant("alice", "log_search", vec![7]).await;

    let (status, body) = app
        .dispatch(
            Some("alice"),
            &json!({
                "url": "/api/v1/pattern/7/remark/",
                "method": "POST",
                "space_uid": SPACE,
                "data": {"signature": "s1", "remark": "known flake"}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["remark"][0]["username"], json!("admin"));
    assert_eq!(body["data"]["updated_by"], json!("admin"));
}

#[tokio::test]
async fn remark_lifecycle_on_the_internal_api() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/pattern/7/remark/",
            &[SESSION],
            Some(json!({"signature": "s1", "remark": "first"}).to_string()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let create_time = body["data"]["remark"][0]["create_time"].as_i64().unwrap();

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/v1/pattern/7/update_remark/",
            &[SESSION],
            Some(
                json!({"signature": "s1", "old_remark": "first", "new_remark": "second", "create_time": create_time})
                    .to_string(),
            ),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["remark"][0]["remark"], json!("second"));

    let (status, _) = app
        .request(
            Method::DELETE,
            "/api/v1/pattern/7/delete_remark/",
            &[SESSION],
            Some(json!({"signature": "s1", "remark": "first", "create_time": create_time}).to_string()),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .request(
            Method::DELETE,
            "/api/v1/pattern/7/delete_remark/",
            &[SESSION],
            Some(json!({"signature": "s1", "remark": "second", "create_time": create_time}).to_string()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["remark"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn labels_and_owners_show_up_in_search() {
    let app = TestApp::seeded().await;

    for (path, body) in [
        ("/api/v1/pattern/7/label/", json!({"signature": "s1", "label": "network"})),
        ("/api/v1/pattern/7/owner/", json!({"signature": "s1", "owners": ["ops", "dba"]})),
    ] {
        let (status, _) = app
            .request(Method::POST, path, &[SESSION], Some(body.to_string()))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/pattern/7/search/",
            &[SESSION],
            Some(json!({"pattern_level": "05", "keyword": "connect"}).to_string()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["labels"], json!(["network"]));
    assert_eq!(body["data"][0]["owners"], json!(["ops", "dba"]));
}

#[tokio::test]
async fn malformed_internal_body_is_bad_request() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .request(Method::POST, "/api/v1/pattern/7/search/", &[SESSION], Some("{".to_string()))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("invalid json format"));
}
