mod common;

use axum::http::{header, Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use common::{TestApp, SPACE};
use log_gateway::models::{ApplyStatus, ExternalPermissionApplyRecord};
use log_gateway::store::PermissionStore;

fn apply_record(sn: &str) -> ExternalPermissionApplyRecord {
    let now = Utc::now();
    ExternalPermissionApplyRecord {
        id: 0,
        sn: sn.into(),
        authorized_users: vec!["bob".into()],
        space_uid: SPACE.into(),
        action_id: "log_search".into(),
        resources: vec![5, 7],
        expire_time: now + Duration::days(30),
        status: ApplyStatus::Pending,
        created_at: now,
    }
}

#[tokio::test]
async fn spaces_lists_authorized_spaces() {
    let app = TestApp::seeded().await;
    app.grant("alice", "log_search", vec![7]).await;

    let (status, body) = app
        .request(Method::GET, "/external/spaces/", &[("User", "alice")], None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!(true));
    let spaces = body["data"].as_array().unwrap();
    assert_eq!(spaces.len(), 1);
    assert_eq!(spaces[0]["space_uid"], json!(SPACE));
    assert_eq!(spaces[0]["is_sticky"], json!(false));
    assert_eq!(spaces[0]["permission"], json!({"view_business_v2": true}));
    assert_eq!(spaces[0]["time_zone"], json!("Asia/Shanghai"));
    assert_eq!(body["message"], json!("list external_user:alice spaces success"));
}

#[tokio::test]
async fn spaces_without_grants_or_header_is_forbidden() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .request(Method::GET, "/external/spaces/", &[("User", "nobody")], None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["result"], json!(false));

    let (status, _) = app.request(Method::GET, "/external/spaces/", &[], None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn entry_picks_the_first_space_and_sets_cookies() {
    let app = TestApp::seeded().await;
    app.grant("alice", "log_search", vec![7]).await;

    let (status, headers, body) = app
        .request_with_headers(Method::GET, "/external/", &[("User", "alice")], None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["space_uid"], json!(SPACE));
    assert_eq!(body["data"]["authorizer"], json!(common::AUTHORIZER));
    assert_eq!(body["data"]["space"]["space_name"], json!("Blue Whale"));

    let cookies: Vec<&str> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert!(cookies.contains(&"space_uid=bkcc__2; Path=/"));
    assert!(cookies.contains(&"external_user=alice; Path=/"));

    // The space cookie is what a later dispatch without space_uid relies on.
    let (status, body) = app
        .request(
            Method::POST,
            "/external/dispatch/",
            &[("User", "alice"), ("Cookie", "space_uid=bkcc__2; external_user=alice")],
            Some(json!({"url": "/api/v1/search/index_set/"}).to_string()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn entry_is_forbidden_without_grant_or_authorizer() {
    let app = TestApp::seeded().await;
    app.grant("alice", "log_search", vec![7]).await;
    app.store
        .insert_grant(common::grant("alice", "bkcc__3", "log_search", vec![21], Duration::days(1)))
        .await;

    let (status, body) = app
        .request(Method::GET, "/external/?space_uid=bkcc__9", &[("User", "alice")], None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({"result": false, "message": "external_user:alice has no permission in space_uid:bkcc__9."})
    );

    let (status, body) = app
        .request(Method::GET, "/external/?space_uid=bkcc__3", &[("User", "alice")], None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("space_uid:bkcc__3 has no authorizer."));

    let (status, body) = app.request(Method::GET, "/external/", &[("User", "nobody")], None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("external_user:nobody has no authorized space."));

    let (status, _) = app.request(Method::GET, "/external/", &[], None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn approved_application_unlocks_dispatch() {
    let app = TestApp::seeded().await;
    app.store.insert_apply_record(apply_record("REQ-1")).await;

    let request = json!({"url": "/api/v1/search/index_set/", "space_uid": SPACE});
    let (status, _) = app.dispatch(Some("bob"), &request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            Method::POST,
            "/external/callback/",
            &[],
            Some(json!({"sn": "REQ-1", "approve_result": true}).to_string()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!(true));

    let (status, body) = app.dispatch(Some("bob"), &request).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|i| i["index_set_id"].as_i64())
        .collect();
    assert_eq!(ids, vec![5, 7]);
}

#[tokio::test]
async fn callback_reports_unknown_and_settled_records() {
    let app = TestApp::seeded().await;
    app.store.insert_apply_record(apply_record("REQ-2")).await;
    let callback = |sn: &str, approve: bool| Some(json!({"sn": sn, "approve_result": approve}).to_string());

    let (status, body) = app
        .request(Method::POST, "/external/callback/", &[], callback("REQ-404", true))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!(false));

    let (status, body) = app
        .request(Method::POST, "/external/callback/", &[], callback("REQ-2", false))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!(true));
    let record = app.store.apply_record_by_sn("REQ-2").await.unwrap().unwrap();
    assert_eq!(record.status, ApplyStatus::Failed);

    let (status, body) = app
        .request(Method::POST, "/external/callback/", &[], callback("REQ-2", true))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!(false));
    assert!(body["message"].as_str().unwrap().contains("already processed"));
    assert!(app.store.grants().await.is_empty());
}

#[tokio::test]
async fn callback_rejects_invalid_json() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .request(Method::POST, "/external/callback/", &[], Some("sn=REQ-1".to_string()))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"result": false, "message": "invalid json format"}));
}
