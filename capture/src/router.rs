use std::future::ready;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::analytics::AnalyticsStore;
use crate::dispatch::Dispatcher;
use crate::metrics_middleware::track_metrics;
use crate::prometheus::setup_metrics_recorder;
use crate::time::TimeSource;
use crate::{ingest, query, script};

/// Event log topics the ingestion endpoints write to.
#[derive(Clone, Debug)]
pub struct Topics {
    pub visits: String,
    pub recordings: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            visits: "website_visits".to_string(),
            recordings: "session_recordings".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct State {
    pub dispatcher: Dispatcher,
    pub timesource: Arc<dyn TimeSource + Send + Sync>,
    pub store: Arc<dyn AnalyticsStore + Send + Sync>,
    pub topics: Topics,
}

async fn index() -> &'static str {
    "edge-capture"
}

async fn ok() -> &'static str {
    "ok"
}

pub fn router<TZ, A>(
    timesource: TZ,
    dispatcher: Dispatcher,
    store: A,
    topics: Topics,
    max_body_size: usize,
    metrics: bool,
) -> Router
where
    TZ: TimeSource + Send + Sync + 'static,
    A: AnalyticsStore + Send + Sync + 'static,
{
    let state = State {
        dispatcher,
        timesource: Arc::new(timesource),
        store: Arc::new(store),
        topics,
    };

    // Snippets are embedded in arbitrary third-party pages
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_origin(AllowOrigin::any());

    let router = Router::new()
        .route("/", get(index))
        .route("/_readiness", get(ok))
        .route("/_liveness", get(ok))
        .route("/track", post(ingest::track))
        .route("/save-recording", post(ingest::save_recording))
        .route("/totals", get(query::totals))
        .route("/recordings", get(query::recordings))
        .route("/recordings/:id", get(query::recording_by_id))
        .route("/js", get(script::page_view))
        .route("/record.js", get(script::recorder))
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::middleware::from_fn(track_metrics));

    // Don't install metrics unless asked to
    // Installing a global recorder when capture is used as a library (during tests etc)
    // does not work well.
    if !metrics {
        return router;
    }

    match setup_metrics_recorder() {
        Ok(recorder_handle) => {
            router.route("/metrics", get(move || ready(recorder_handle.render())))
        }
        Err(err) => {
            warn!("prometheus recorder unavailable, not exposing /metrics: {}", err);
            router
        }
    }
}
