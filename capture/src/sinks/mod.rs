use async_trait::async_trait;
use serde::Serialize;
use serde_json::value::RawValue;

use crate::api::CaptureError;

pub mod kafka;
pub mod print;
pub mod rest;

/// Every record is produced to the first partition of its topic.
pub const DEFAULT_PARTITION: i32 = 0;

/// One record on its way to a topic of the event log.
#[derive(Debug, Clone)]
pub struct DispatchEnvelope {
    pub topic: String,
    pub value: Box<RawValue>,
}

#[derive(Serialize)]
struct ProduceRecord<'a> {
    value: &'a RawValue,
    partition: i32,
}

#[derive(Serialize)]
struct ProduceRequest<'a> {
    records: [ProduceRecord<'a>; 1],
}

impl DispatchEnvelope {
    pub fn new(topic: impl Into<String>, value: Box<RawValue>) -> Self {
        Self {
            topic: topic.into(),
            value,
        }
    }

    /// Body of a REST proxy produce call: `{"records":[{"value":...,"partition":0}]}`.
    pub fn to_produce_request(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&ProduceRequest {
            records: [ProduceRecord {
                value: &self.value,
                partition: DEFAULT_PARTITION,
            }],
        })
    }
}

#[async_trait]
pub trait EventLog {
    async fn send(&self, envelope: DispatchEnvelope) -> Result<(), CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produce_request_wraps_a_single_record() {
        let value = RawValue::from_string(r#"{"url":"/", "n": 1.50}"#.to_string()).unwrap();
        let envelope = DispatchEnvelope::new("website_visits", value);

        assert_eq!(
            envelope.to_produce_request().unwrap(),
            r#"{"records":[{"value":{"url":"/", "n": 1.50},"partition":0}]}"#
        );
    }
}
