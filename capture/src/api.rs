use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Plain-text acknowledgment of the `/track` endpoint.
pub const TRACK_ACK: &str = "Ok";
/// Plain-text acknowledgment of the `/save-recording` endpoint.
pub const RECORDING_ACK: &str = "ok";

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to parse request: {0}")]
    MalformedInput(#[from] serde_json::Error),

    #[error("failed to serialize record: {0}")]
    Serialization(String),

    #[error("upstream unreachable: {0}")]
    TransportFailure(String),
    #[error("upstream responded with status {0}")]
    UpstreamNon2xx(u16),
}

impl CaptureError {
    pub fn to_metric_tag(&self) -> &'static str {
        match self {
            CaptureError::MalformedInput(_) => "malformed_input",
            CaptureError::Serialization(_) => "serialization",
            CaptureError::TransportFailure(_) => "transport_failure",
            CaptureError::UpstreamNon2xx(_) => "upstream_non_2xx",
        }
    }
}

impl IntoResponse for CaptureError {
    // The body never carries the underlying error, it is logged by the caller.
    fn into_response(self) -> Response {
        match self {
            CaptureError::MalformedInput(_) => (StatusCode::BAD_REQUEST, "Bad Request"),

            CaptureError::Serialization(_)
            | CaptureError::TransportFailure(_)
            | CaptureError::UpstreamNon2xx(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
        .into_response()
    }
}
