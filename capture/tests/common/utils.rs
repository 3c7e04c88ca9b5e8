#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use edge_capture::analytics::AnalyticsStore;
use edge_capture::api::CaptureError;
use edge_capture::dispatch::Dispatcher;
use edge_capture::router::{router, Topics};
use edge_capture::sinks::{DispatchEnvelope, EventLog};
use edge_capture::time::TimeSource;

pub const FIXED_TIME: i64 = 1_700_000_000;

pub const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static TRACING_INIT: Once = Once::new();
pub fn setup_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_writer(tracing_subscriber::fmt::TestWriter::new())
            .init()
    });
}

#[derive(Clone)]
pub struct FixedTime {
    pub time: i64,
}

impl TimeSource for FixedTime {
    fn current_time(&self) -> i64 {
        self.time
    }
}

/// Keeps every envelope it is handed.
#[derive(Clone, Default)]
pub struct MemorySink {
    envelopes: Arc<Mutex<Vec<DispatchEnvelope>>>,
}

impl MemorySink {
    pub fn envelopes(&self) -> Vec<DispatchEnvelope> {
        self.envelopes.lock().unwrap().clone()
    }

    pub fn values(&self, topic: &str) -> Vec<Value> {
        self.envelopes()
            .into_iter()
            .filter(|e| e.topic == topic)
            .map(|e| serde_json::from_str(e.value.get()).unwrap())
            .collect()
    }
}

#[async_trait]
impl EventLog for MemorySink {
    async fn send(&self, envelope: DispatchEnvelope) -> Result<(), CaptureError> {
        self.envelopes.lock().unwrap().push(envelope);
        Ok(())
    }
}

/// Never answers, like an event log that accepted the connection and hung.
pub struct HangingSink {}

#[async_trait]
impl EventLog for HangingSink {
    async fn send(&self, _envelope: DispatchEnvelope) -> Result<(), CaptureError> {
        std::future::pending().await
    }
}

/// Answers every delivery with an upstream error.
pub struct FailingSink {}

#[async_trait]
impl EventLog for FailingSink {
    async fn send(&self, _envelope: DispatchEnvelope) -> Result<(), CaptureError> {
        Err(CaptureError::UpstreamNon2xx(503))
    }
}

pub type RecordedQuery = (String, Vec<(String, String)>);

/// Canned analytical store answers, recording the queries it receives.
#[derive(Clone, Default)]
pub struct StubStore {
    pub text: String,
    pub rows: Vec<Value>,
    pub fail: bool,
    pub queries: Arc<Mutex<Vec<RecordedQuery>>>,
}

impl StubStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, params: &[(&str, &str)]) -> Result<(), CaptureError> {
        self.queries.lock().unwrap().push((
            sql.to_string(),
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        match self.fail {
            true => Err(CaptureError::TransportFailure("connection refused".to_string())),
            false => Ok(()),
        }
    }
}

#[async_trait]
impl AnalyticsStore for StubStore {
    async fn query_text(&self, sql: &str) -> Result<String, CaptureError> {
        self.record(sql, &[])?;
        Ok(self.text.clone())
    }

    async fn query_rows(
        &self,
        sql: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<Value>, CaptureError> {
        self.record(sql, params)?;
        Ok(self.rows.clone())
    }
}

pub const TEST_MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

pub fn test_router(dispatcher: Dispatcher, store: StubStore) -> Router {
    test_router_with_limit(dispatcher, store, TEST_MAX_BODY_SIZE)
}

pub fn test_router_with_limit(
    dispatcher: Dispatcher,
    store: StubStore,
    max_body_size: usize,
) -> Router {
    router(
        FixedTime { time: FIXED_TIME },
        dispatcher,
        store,
        Topics::default(),
        max_body_size,
        false,
    )
}

pub async fn call(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

pub fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
