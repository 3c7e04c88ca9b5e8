//! Fire-and-forget delivery to the event log.
//!
//! Handlers hand a record to the [`Dispatcher`] and answer the client right
//! away. Delivery runs on a tracked background task; its outcome is logged and
//! counted but never reaches the caller.

use std::sync::Arc;

use metrics::{counter, gauge};
use serde::Serialize;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::api::CaptureError;
use crate::sinks::{DispatchEnvelope, EventLog};

const PENDING_GAUGE: &str = "capture_dispatch_pending";

#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn EventLog + Send + Sync>,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new<S>(sink: S) -> Self
    where
        S: EventLog + Send + Sync + 'static,
    {
        Self::from_arc(Arc::new(sink))
    }

    pub fn from_arc(sink: Arc<dyn EventLog + Send + Sync>) -> Self {
        Self {
            sink,
            tracker: TaskTracker::new(),
        }
    }

    /// Serializes `record` and schedules its delivery to `topic`.
    pub fn dispatch<T: Serialize + ?Sized>(&self, topic: &str, record: &T) {
        match serde_json::value::to_raw_value(record) {
            Ok(value) => self.dispatch_raw(DispatchEnvelope::new(topic, value)),
            Err(err) => {
                let err = CaptureError::Serialization(err.to_string());
                report_dispatch_failure(topic, &err);
            }
        }
    }

    /// Schedules delivery of an already encoded record. Returns immediately.
    ///
    /// Records handed over once [`Dispatcher::drain`] has started are dropped.
    pub fn dispatch_raw(&self, envelope: DispatchEnvelope) {
        if self.tracker.is_closed() {
            let err = CaptureError::TransportFailure("dispatcher is draining".to_string());
            report_dispatch_failure(&envelope.topic, &err);
            return;
        }

        let sink = self.sink.clone();
        let tracker = self.tracker.clone();
        let span = info_span!("dispatch", topic = %envelope.topic);

        drop(self.tracker.spawn(
            async move {
                let topic = envelope.topic.clone();
                match sink.send(envelope).await {
                    Ok(()) => {
                        debug!("record delivered");
                        counter!("capture_events_dispatched_total", "topic" => topic)
                            .increment(1);
                    }
                    Err(err) => report_dispatch_failure(&topic, &err),
                }
                // The running task still counts towards the tracker
                gauge!(PENDING_GAUGE).set(tracker.len().saturating_sub(1) as f64);
            }
            .instrument(span),
        ));
        gauge!(PENDING_GAUGE).set(self.tracker.len() as f64);
    }

    /// Number of deliveries still in flight.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Refuses further deliveries and waits for the in-flight ones.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        gauge!(PENDING_GAUGE).set(0.0);
    }
}

fn report_dispatch_failure(topic: &str, err: &CaptureError) {
    counter!(
        "capture_dispatch_failures_total",
        "topic" => topic.to_string(),
        "cause" => err.to_metric_tag()
    )
    .increment(1);
    match err {
        CaptureError::Serialization(_) => error!(topic, "failed to encode record: {}", err),
        _ => warn!(topic, "failed to deliver record: {}", err),
    }
}
