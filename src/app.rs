use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{any, get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, Environment, ServerConfig, StorageBackend};
use crate::handlers::{external, internal};
use crate::middleware::session_context_middleware;
use crate::services::PermissionService;
use crate::store::{CatalogStore, Fixture, MemoryStore, PatternStore, PermissionStore, PgStore};
use crate::views::{route_table, RouteTable};

/// Shared handles every request needs.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub permissions: Arc<dyn PermissionStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub patterns: Arc<dyn PatternStore>,
    pub routes: Arc<RouteTable>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        permissions: Arc<dyn PermissionStore>,
        catalog: Arc<dyn CatalogStore>,
        patterns: Arc<dyn PatternStore>,
        routes: RouteTable,
    ) -> Self {
        Self {
            config: Arc::new(config),
            permissions,
            catalog,
            patterns,
            routes: Arc::new(routes),
        }
    }

    /// Everything backed by one memory store.
    pub fn in_memory(config: AppConfig, store: Arc<MemoryStore>, routes: RouteTable) -> Self {
        Self::new(config, store.clone(), store.clone(), store, routes)
    }

    /// Build stores from configuration. Postgres only backs permissions; the
    /// catalog and pattern data always come from the fixture.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let fixture = match &config.storage.fixture_path {
            Some(path) => Fixture::load(path)?,
            None => Fixture::default(),
        };
        let memory = Arc::new(MemoryStore::from_fixture(fixture));

        let permissions: Arc<dyn PermissionStore> = match config.storage.backend {
            StorageBackend::Memory => {
                if config.environment != Environment::Development {
                    tracing::warn!("permissions are held in memory in {:?}", config.environment);
                }
                memory.clone()
            }
            StorageBackend::Postgres => {
                let store = PgStore::connect(&config.storage).await?;
                store.migrate().await?;
                Arc::new(store)
            }
        };

        Ok(Self::new(config, permissions, memory.clone(), memory, route_table()?))
    }

    pub fn permission_service(&self) -> PermissionService {
        PermissionService::new(self.permissions.clone(), self.config.external.default_time_zone.clone())
    }
}

pub fn router(state: AppState) -> Router {
    let server = state.config.server.clone();

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // External access
        .merge(external_routes())
        // Internal views for session callers
        .merge(internal_routes(state.clone()))
        // Global middleware
        .layer(DefaultBodyLimit::max(server.max_request_size_bytes))
        .layer(cors_layer(&server))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn external_routes() -> Router<AppState> {
    Router::new()
        .route("/external/", get(external::entry_get))
        .route("/external/dispatch/", post(external::dispatch_post))
        .route("/external/callback/", post(external::callback_post))
        .route("/external/spaces/", get(external::spaces_get))
}

fn internal_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/*path", any(internal::view))
        .route_layer(from_fn_with_state(state, session_context_middleware))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if !server.enable_cors {
        return CorsLayer::new();
    }
    if server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "result": true,
        "data": {
            "name": "Log Gateway",
            "version": version,
            "environment": state.config.environment,
            "description": "Log platform API with scoped external access",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "entry": "/external/ (external user)",
                "dispatch": "/external/dispatch/ (external user)",
                "spaces": "/external/spaces/ (external user)",
                "callback": "/external/callback/ (approval workflow)",
                "api": "/api/v1/* (session)",
            },
            "views": state.routes.routes().iter().map(|r| json!({
                "method": r.method.as_str(),
                "path": r.pattern,
                "view": r.view.to_string(),
            })).collect::<Vec<_>>(),
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.permissions.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "result": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "result": false,
                    "message": "store unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store_error": e.to_string()
                    }
                })),
            )
        }
    }
}
