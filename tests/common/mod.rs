#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use log_gateway::config::{AppConfig, Environment};
use log_gateway::models::{ExternalPermission, Favorite, FavoriteGroup, IndexSet, PatternRow, Space};
use log_gateway::store::MemoryStore;
use log_gateway::views::{route_table, RouteTable};
use log_gateway::{router, AppState};

pub const SPACE: &str = "bkcc__2";
pub const AUTHORIZER: &str = "admin";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
        .with_test_writer()
        .try_init();
}

/// In-process app over a memory store, driven with `oneshot`.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl TestApp {
    /// Space `bkcc__2` with an authorizer, index sets 5/7/9, a favorite on
    /// each (two grouped, one ungrouped) and a few patterns on index set 7.
    pub async fn seeded() -> Self {
        let routes = route_table().expect("route table");
        Self::seeded_with_routes(routes).await
    }

    pub async fn seeded_with_routes(routes: RouteTable) -> Self {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;
        Self::with_store(store, routes)
    }

    pub fn with_store(store: Arc<MemoryStore>, routes: RouteTable) -> Self {
        let config = AppConfig::for_environment(Environment::Development);
        let state = AppState::in_memory(config, store.clone(), routes);
        Self { store, router: router(state) }
    }

    pub async fn grant(&self, user: &str, action: &str, resources: Vec<i64>) {
        self.store
            .insert_grant(grant(user, SPACE, action, resources, Duration::days(1)))
            .await;
    }

    /// POST /external/dispatch/ as `user`.
    pub async fn dispatch(&self, user: Option<&str>, body: &Value) -> (StatusCode, Value) {
        self.dispatch_raw(user, &body.to_string()).await
    }

    pub async fn dispatch_raw(&self, user: Option<&str>, body: &str) -> (StatusCode, Value) {
        let headers: Vec<(&str, &str)> = user.map(|u| ("User", u)).into_iter().collect();
        self.request(Method::POST, "/external/dispatch/", &headers, Some(body.to_string()))
            .await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let (status, _, body) = self.request_with_headers(method, uri, headers, body).await;
        (status, body)
    }

    /// Like `request`, also returning the response headers.
    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<String>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, headers, body)
    }
}

pub fn grant(
    user: &str,
    space_uid: &str,
    action: &str,
    resources: Vec<i64>,
    expire_in: Duration,
) -> ExternalPermission {
    let now = Utc::now();
    ExternalPermission {
        id: 0,
        authorized_user: user.to_string(),
        space_uid: space_uid.to_string(),
        action_id: action.to_string(),
        resources,
        expire_time: now + expire_in,
        created_at: now,
    }
}

pub fn space(uid: &str, name: &str) -> Space {
    Space {
        id: 1,
        space_type_id: "bkcc".into(),
        space_type_name: "Business".into(),
        space_id: uid.trim_start_matches("bkcc__").into(),
        space_name: name.into(),
        space_uid: uid.into(),
        space_code: uid.trim_start_matches("bkcc__").into(),
        bk_biz_id: 2,
        time_zone: None,
    }
}

async fn seed(store: &MemoryStore) {
    store.set_authorizer(SPACE, AUTHORIZER).await;
    store.insert_space(space(SPACE, "Blue Whale")).await;

    for id in [5, 7, 9] {
        store
            .insert_index_set(IndexSet {
                space_uid: SPACE.into(),
                index_set_id: id,
                index_set_name: format!("index set {}", id),
                scenario_id: "log".into(),
            })
            .await;
    }

    store
        .insert_favorite_group(FavoriteGroup { space_uid: SPACE.into(), id: 1, name: "on-call".into() })
        .await;
    for (id, index_set_id, group_id) in [(1, 5, 1), (2, 7, 1), (3, 9, 0)] {
        store
            .insert_favorite(Favorite {
                space_uid: SPACE.into(),
                id,
                name: format!("favorite {}", id),
                index_set_id,
                group_id,
                keyword: "*".into(),
            })
            .await;
    }

    for (signature, pattern, count) in [("s1", "connect to [ip] failed", 30), ("s2", "user [name] login", 70)] {
        store
            .insert_pattern(PatternRow {
                index_set_id: 7,
                pattern_level: "05".into(),
                pattern: pattern.into(),
                signature: signature.into(),
                count,
                is_new_class: false,
            })
            .await;
    }
}

/// The real `log-gateway` binary on a free port, killed on drop.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_log-gateway"))
            .env("APP_ENV", "development")
            .env("LOG_GATEWAY_PORT", port.to_string())
            .env("STORAGE_BACKEND", "memory")
            .env("FIXTURE_PATH", concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/dev.yaml"))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        let server = Self { port, base_url, child };
        server.wait_ready(StdDuration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: StdDuration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(StdDuration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
