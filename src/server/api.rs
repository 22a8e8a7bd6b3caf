//! JSON HTTP API over one cache facade.
//!
//! - GET /health, GET /metrics, GET /v1/cache/stats
//! - GET|PUT|DELETE /v1/cache/{group}/{key}
//! - POST /v1/cache/{group}/{key}/{add,replace,incr,decr}
//! - POST /v1/get_multi
//! - POST /v1/flush, /v1/flush/groups, /v1/flush/sites
//! - POST /v1/tenant, /v1/groups/global, /v1/groups/non_persistent

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::facade::{CacheFacade, MultiGetResult};
use crate::cache::tenant::TenantId;
use crate::cache::value::CacheValue;

/// Application state shared across handlers.
pub struct AppState {
    pub cache: Arc<CacheFacade>,
    pub start_time: Instant,
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/v1/cache/stats", get(cache_stats))
        .route(
            "/v1/cache/{group}/{key}",
            get(get_entry).put(set_entry).delete(delete_entry),
        )
        .route("/v1/cache/{group}/{key}/add", post(add_entry))
        .route("/v1/cache/{group}/{key}/replace", post(replace_entry))
        .route("/v1/cache/{group}/{key}/incr", post(incr_entry))
        .route("/v1/cache/{group}/{key}/decr", post(decr_entry))
        .route("/v1/get_multi", post(get_multi))
        .route("/v1/flush", post(flush))
        .route("/v1/flush/groups", post(flush_groups))
        .route("/v1/flush/sites", post(flush_sites))
        .route("/v1/tenant", post(switch_tenant))
        .route("/v1/groups/global", post(register_global_groups))
        .route("/v1/groups/non_persistent", post(register_non_persistent_groups))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Body for set / add / replace.
#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    pub value: CacheValue,
    #[serde(default)]
    pub ttl: i64,
}

/// Body for incr / decr.
#[derive(Debug, Deserialize)]
pub struct OffsetRequest {
    #[serde(default = "default_offset")]
    pub offset: i64,
}

fn default_offset() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct GroupsRequest {
    pub groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SitesRequest {
    #[serde(default)]
    pub sites: Vec<TenantId>,
}

#[derive(Debug, Deserialize)]
pub struct TenantRequest {
    pub tenant_id: TenantId,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub group: String,
    pub key: String,
    pub value: CacheValue,
}

#[derive(Debug, Serialize)]
pub struct CounterResponse {
    pub value: i64,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub tenant_id: TenantId,
    pub multi_tenant: bool,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStatsResponse,
}

/// Cache statistics response.
#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
    pub tenant_id: TenantId,
    pub multi_tenant: bool,
    pub shared_store: bool,
    pub local_entries: usize,
    pub global_groups: Vec<String>,
    pub non_persistent_groups: Vec<String>,
    pub group_versions: BTreeMap<String, u64>,
    pub site_versions: BTreeMap<TenantId, u64>,
}

impl CacheStatsResponse {
    fn from_cache(cache: &CacheFacade) -> Self {
        let stats = cache.stats();
        Self {
            hits: stats.hits,
            misses: stats.misses,
            hit_ratio: stats.hit_ratio(),
            tenant_id: cache.tenant_prefix(),
            multi_tenant: cache.is_multi_tenant(),
            shared_store: cache.is_shared_available(),
            local_entries: cache.local_len(),
            global_groups: cache.global_groups().into_iter().collect(),
            non_persistent_groups: cache.non_persistent_groups().into_iter().collect(),
            group_versions: cache.group_versions().into_iter().collect(),
            site_versions: cache.site_versions().into_iter().collect(),
        }
    }
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        cache: CacheStatsResponse::from_cache(&state.cache),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, StatusCode> {
    let encoder = TextEncoder::new();
    let families = state.cache.metrics_registry().gather();
    let body = encoder
        .encode_to_string(&families)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], body))
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse::from_cache(&state.cache))
}

async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path((group, key)): Path<(String, String)>,
) -> Result<Json<EntryResponse>, StatusCode> {
    let value = state.cache.get(&key, &group).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(EntryResponse { group, key, value }))
}

async fn set_entry(
    State(state): State<Arc<AppState>>,
    Path((group, key)): Path<(String, String)>,
    Json(req): Json<WriteRequest>,
) -> Result<Json<OkResponse>, StatusCode> {
    let request_id = Uuid::new_v4().to_string();
    debug!(request_id, group, key, ttl = req.ttl, "Set request");

    if state.cache.set(&key, &req.value, &group, req.ttl) {
        Ok(Json(OkResponse { ok: true }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn add_entry(
    State(state): State<Arc<AppState>>,
    Path((group, key)): Path<(String, String)>,
    Json(req): Json<WriteRequest>,
) -> Result<(StatusCode, Json<OkResponse>), StatusCode> {
    let request_id = Uuid::new_v4().to_string();
    debug!(request_id, group, key, ttl = req.ttl, "Add request");

    if state.cache.add(&key, &req.value, &group, req.ttl) {
        Ok((StatusCode::CREATED, Json(OkResponse { ok: true })))
    } else {
        Err(StatusCode::CONFLICT)
    }
}

async fn replace_entry(
    State(state): State<Arc<AppState>>,
    Path((group, key)): Path<(String, String)>,
    Json(req): Json<WriteRequest>,
) -> Result<Json<OkResponse>, StatusCode> {
    let request_id = Uuid::new_v4().to_string();
    debug!(request_id, group, key, ttl = req.ttl, "Replace request");

    if state.cache.replace(&key, &req.value, &group, req.ttl) {
        Ok(Json(OkResponse { ok: true }))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path((group, key)): Path<(String, String)>,
) -> Result<Json<OkResponse>, StatusCode> {
    if state.cache.delete(&key, &group) {
        Ok(Json(OkResponse { ok: true }))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn incr_entry(
    State(state): State<Arc<AppState>>,
    Path((group, key)): Path<(String, String)>,
    Json(req): Json<OffsetRequest>,
) -> Result<Json<CounterResponse>, StatusCode> {
    let value = state
        .cache
        .incr(&key, req.offset, &group)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(CounterResponse { value }))
}

async fn decr_entry(
    State(state): State<Arc<AppState>>,
    Path((group, key)): Path<(String, String)>,
    Json(req): Json<OffsetRequest>,
) -> Result<Json<CounterResponse>, StatusCode> {
    let value = state
        .cache
        .decr(&key, req.offset, &group)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(CounterResponse { value }))
}

async fn get_multi(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BTreeMap<String, Vec<String>>>,
) -> Json<MultiGetResult> {
    Json(state.cache.get_multi(req))
}

async fn flush(State(state): State<Arc<AppState>>) -> Result<Json<OkResponse>, StatusCode> {
    let request_id = Uuid::new_v4().to_string();
    info!(request_id, "Full flush requested");

    if state.cache.flush() {
        Ok(Json(OkResponse { ok: true }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn flush_groups(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GroupsRequest>,
) -> Result<Json<OkResponse>, StatusCode> {
    let request_id = Uuid::new_v4().to_string();
    info!(request_id, groups = ?req.groups, "Group flush requested");

    if req.groups.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if state.cache.flush_groups(&req.groups) {
        Ok(Json(OkResponse { ok: true }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn flush_sites(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SitesRequest>,
) -> Json<OkResponse> {
    let request_id = Uuid::new_v4().to_string();
    info!(request_id, sites = ?req.sites, "Site flush requested");

    Json(OkResponse {
        ok: state.cache.flush_sites(req.sites),
    })
}

async fn switch_tenant(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TenantRequest>,
) -> Json<TenantResponse> {
    state.cache.switch_tenant(req.tenant_id);
    Json(TenantResponse {
        tenant_id: state.cache.tenant_prefix(),
        multi_tenant: state.cache.is_multi_tenant(),
    })
}

async fn register_global_groups(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GroupsRequest>,
) -> Json<OkResponse> {
    state.cache.register_global_groups(&req.groups);
    Json(OkResponse { ok: true })
}

async fn register_non_persistent_groups(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GroupsRequest>,
) -> Json<OkResponse> {
    state.cache.register_non_persistent_groups(&req.groups);
    Json(OkResponse { ok: true })
}
