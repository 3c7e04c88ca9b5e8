use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::header;
use tracing::{debug, instrument};
use url::Url;

use crate::api::CaptureError;
use crate::sinks::{DispatchEnvelope, EventLog};

/// Content type expected by Kafka REST proxies for JSON-embedded records.
pub const KAFKA_JSON_CONTENT_TYPE: &str = "application/vnd.kafka.json.v2+json";

/// Produces records through the HTTP proxy of the event log
/// (`POST {base}/topics/{topic}`).
#[derive(Clone)]
pub struct RestSink {
    client: reqwest::Client,
    base_url: Url,
}

pub fn build_http_client(request_timeout: Option<Duration>) -> reqwest::Result<reqwest::Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(KAFKA_JSON_CONTENT_TYPE),
    );
    let mut client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .user_agent("edge-capture");
    if let Some(timeout) = request_timeout {
        client_builder = client_builder.timeout(timeout);
    }
    client_builder.build()
}

impl RestSink {
    pub fn new(base_url: &str, request_timeout: Option<Duration>) -> anyhow::Result<RestSink> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("event log url {base_url} cannot hold a path");
        }

        Ok(RestSink {
            client: build_http_client(request_timeout)?,
            base_url,
        })
    }

    fn topic_url(&self, topic: &str) -> Result<Url, CaptureError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CaptureError::TransportFailure("invalid event log url".to_string()))?
            .pop_if_empty()
            .push("topics")
            .push(topic);
        Ok(url)
    }
}

#[async_trait]
impl EventLog for RestSink {
    #[instrument(skip_all, fields(topic = %envelope.topic))]
    async fn send(&self, envelope: DispatchEnvelope) -> Result<(), CaptureError> {
        let url = self.topic_url(&envelope.topic)?;
        let body = envelope
            .to_produce_request()
            .map_err(|e| CaptureError::Serialization(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .body(body)
            .send()
            .await
            .map_err(|e| CaptureError::TransportFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            counter!("capture_event_log_errors_total", "status" => status.as_u16().to_string())
                .increment(1);
            return Err(CaptureError::UpstreamNon2xx(status.as_u16()));
        }

        debug!("record accepted by the event log");
        counter!("capture_events_ingested_total", "topic" => envelope.topic).increment(1);
        Ok(())
    }
}
