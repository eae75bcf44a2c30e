use anyhow::Result;
use axum::{extract::{Query, State}, http::{HeaderMap, HeaderValue, StatusCode}, routing::{get, post}, Json, Router};
use freqsearch_core::persist::{load_config, load_documents, WorkspacePaths};
use freqsearch_core::{rank_query, InvertedIndex, RelevanceResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// Caller-side limit, applied on top of the ranker's own cap
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub results: Vec<RelevanceResult>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub num_docs: u32,
    pub num_terms: usize,
}

/// Index plus the settings it was built with. Replaced wholesale on rebuild.
pub struct Snapshot {
    pub index: InvertedIndex,
    pub max_responses: usize,
}

impl Snapshot {
    /// Read config.json and its documents under `root` and build a fresh index.
    pub fn load(root: &Path) -> Result<Self> {
        let paths = WorkspacePaths::new(root);
        let config = load_config(&paths)?;
        let docs = load_documents(&paths, &config);
        let index = InvertedIndex::build(&docs);
        tracing::info!(name = %config.config.name, num_docs = index.num_docs(), num_terms = index.num_terms(), "index loaded");
        Ok(Self { index, max_responses: config.config.max_responses })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub snapshot: Arc<RwLock<Arc<Snapshot>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn load(root: impl Into<PathBuf>, admin_token: Option<String>) -> Result<Self> {
        let root = root.into();
        let snapshot = Snapshot::load(&root)?;
        Ok(Self { root, snapshot: Arc::new(RwLock::new(Arc::new(snapshot))), admin_token })
    }

    /// Current snapshot. Readers keep it alive across a concurrent rebuild.
    pub fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }
}

pub fn build_app(root: &str) -> Result<Router> {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let state = AppState::load(root, admin_token)?;
    Ok(router(state))
}

/// Header carrying the token that unlocks `/index/rebuild`.
pub const ADMIN_TOKEN_HEADER: &str = "X-ADMIN-TOKEN";

/// Origins listed in `CORS_ALLOW_ORIGIN` (comma-separated); any origin when
/// unset or when nothing in it parses.
fn cors_layer() -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let origins: Vec<HeaderValue> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|list| list.split(',').filter_map(|o| o.trim().parse().ok()).collect())
        .unwrap_or_default();
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .route("/index/rebuild", post(rebuild_handler))
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let snapshot = state.current();
    let limit = params.k.unwrap_or(snapshot.max_responses);

    let mut results = rank_query(&snapshot.index, &params.q);
    results.truncate(limit);

    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, hits = results.len(), "search served");
    Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), results })
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let snapshot = state.current();
    Json(StatsResponse { num_docs: snapshot.index.num_docs(), num_terms: snapshot.index.num_terms() })
}

/// Rebuild the index from disk and swap it in; searches already running keep
/// the snapshot they started with.
async fn rebuild_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    check_admin_token(&state, &headers)?;

    let root = state.root.clone();
    let snapshot = tokio::task::spawn_blocking(move || Snapshot::load(&root))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::error!(error = %e, "index rebuild failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let stats = StatsResponse { num_docs: snapshot.index.num_docs(), num_terms: snapshot.index.num_terms() };
    *state.snapshot.write() = Arc::new(snapshot);
    tracing::info!(num_docs = stats.num_docs, "index swapped");
    Ok(Json(stats))
}

fn check_admin_token(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err((StatusCode::UNAUTHORIZED, "index rebuild disabled: no admin token configured".into()));
    };
    match headers.get(ADMIN_TOKEN_HEADER).map(HeaderValue::as_bytes) {
        Some(given) if given == expected.as_bytes() => Ok(()),
        _ => {
            tracing::warn!("rejected index rebuild with missing or wrong admin token");
            Err((StatusCode::UNAUTHORIZED, "missing or wrong admin token".into()))
        }
    }
}
