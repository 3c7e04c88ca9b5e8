use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::CaptureError;
use crate::metadata::{flatten, FlatMetadata};
use crate::time::TimeSource;
use crate::user_agent;

/// Trusted proxy header carrying the original client address.
pub const CLIENT_IP_HEADER: &str = "cf-connecting-ip";
/// Platform header carrying the two-letter country of the client.
pub const COUNTRY_HEADER: &str = "cf-ipcountry";
/// Reported when the request did not go through the trusted proxy.
pub const LOOPBACK_IP: &str = "127.0.0.1";

/// Record fields that always take precedence over client metadata keys.
pub const RESERVED_FIELDS: [&str; 4] = ["url", "ip", "country", "timestamp"];

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub url: String,
}

/// A page view, as produced to the visits topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingEvent {
    pub url: String,
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub timestamp: i64,
    #[serde(flatten)]
    pub metadata: FlatMetadata,
}

impl TrackingEvent {
    /// Metadata keys clashing with a reserved field are dropped, even when
    /// the reserved field itself is absent (country).
    pub fn new(
        url: String,
        ip: String,
        country: Option<String>,
        mut metadata: FlatMetadata,
        timestamp: i64,
    ) -> Self {
        for field in RESERVED_FIELDS {
            if metadata.remove(field).is_some() {
                debug!(field, "dropping client metadata shadowing a reserved field");
            }
        }

        Self {
            url,
            ip,
            country,
            timestamp,
            metadata,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn client_ip(headers: &HeaderMap) -> String {
    header_str(headers, CLIENT_IP_HEADER)
        .unwrap_or(LOOPBACK_IP)
        .to_string()
}

pub fn client_country(headers: &HeaderMap) -> Option<String> {
    header_str(headers, COUNTRY_HEADER).map(str::to_string)
}

/// Builds the page-view record from the request body and headers.
///
/// Only a body that is not a JSON object with a string `url` fails; a missing
/// or unrecognised user agent just yields less metadata.
pub fn assemble(
    body: &[u8],
    headers: &HeaderMap,
    timesource: &(dyn TimeSource + Send + Sync),
) -> Result<TrackingEvent, CaptureError> {
    let request: TrackRequest = serde_json::from_slice(body)?;

    let user_agent = header_str(headers, axum::http::header::USER_AGENT.as_str());
    let metadata = flatten(&user_agent::parse(user_agent));

    Ok(TrackingEvent::new(
        request.url,
        client_ip(headers),
        client_country(headers),
        metadata,
        timesource.current_time(),
    ))
}
