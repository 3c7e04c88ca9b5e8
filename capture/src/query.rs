//! Read endpoints over the analytical store.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics::counter;
use serde_json::Value;
use tracing::{error, instrument};

use crate::api::CaptureError;
use crate::router;

pub const TOTALS_QUERY: &str = "SELECT ip, COUNT() as total FROM analytics.web GROUP BY ip";

pub const RECORDINGS_QUERY: &str = "SELECT id, page_title, max(timestamp) AS latest_timestamp \
     FROM analytics.recordings \
     WHERE page_title != 'Admin' \
     GROUP BY id, page_title \
     ORDER BY latest_timestamp DESC \
     LIMIT 50";

pub const RECORDING_BY_ID_QUERY: &str =
    "SELECT * FROM analytics.recordings WHERE id = {id:String} ORDER BY timestamp DESC";

/// Store failures are logged with their cause and answered with a bare 500.
pub struct QueryError(CaptureError);

impl From<CaptureError> for QueryError {
    fn from(err: CaptureError) -> Self {
        QueryError(err)
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        error!("analytics query failed: {}", self.0);
        counter!("capture_query_errors_total", "cause" => self.0.to_metric_tag()).increment(1);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

#[instrument(skip_all)]
pub async fn totals(state: State<router::State>) -> Result<String, QueryError> {
    Ok(state.store.query_text(TOTALS_QUERY).await?)
}

#[instrument(skip_all)]
pub async fn recordings(state: State<router::State>) -> Result<Json<Vec<Value>>, QueryError> {
    Ok(Json(state.store.query_rows(RECORDINGS_QUERY, &[]).await?))
}

#[instrument(skip(state))]
pub async fn recording_by_id(
    state: State<router::State>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Value>>, QueryError> {
    let rows = state
        .store
        .query_rows(RECORDING_BY_ID_QUERY, &[("id", id.as_str())])
        .await?;
    Ok(Json(rows))
}
