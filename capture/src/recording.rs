//! Session replay payloads.
//!
//! A recording event is produced exactly as the client sent it: the body is
//! only checked to be valid JSON and forwarded as raw text, so the opaque
//! `recording` payload reaches the event log byte-for-byte.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Number;
use uuid::Uuid;

use crate::api::CaptureError;

/// Typed view over a recording body, used for logging only.
#[derive(Debug, Deserialize)]
pub struct RecordingEvent<'a> {
    pub id: Option<Uuid>,
    #[serde(borrow)]
    pub page_title: Option<Cow<'a, str>>,
    #[serde(borrow)]
    pub recording: Option<&'a RawValue>,
    pub timestamp: Option<Number>,
}

impl<'a> RecordingEvent<'a> {
    /// Returns None when the payload does not have the expected shape, which
    /// is not an error for the ingestion path.
    pub fn view(raw: &'a RawValue) -> Option<Self> {
        serde_json::from_str(raw.get()).ok()
    }
}

/// Validates the body as JSON and keeps its original text.
pub fn parse_recording(body: &[u8]) -> Result<Box<RawValue>, CaptureError> {
    Ok(serde_json::from_slice(body)?)
}
