use async_trait::async_trait;

use metrics::counter;
use tracing::info;

use crate::api::CaptureError;
use crate::sinks::{DispatchEnvelope, EventLog};

pub struct PrintSink {}

#[async_trait]
impl EventLog for PrintSink {
    async fn send(&self, envelope: DispatchEnvelope) -> Result<(), CaptureError> {
        info!(topic = %envelope.topic, "record: {}", envelope.value.get());
        counter!("capture_events_ingested_total", "topic" => envelope.topic).increment(1);

        Ok(())
    }
}
