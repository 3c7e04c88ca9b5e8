use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use metrics::counter;
use tracing::field::display;
use tracing::{debug, instrument, warn, Span};

use crate::api::{CaptureError, RECORDING_ACK, TRACK_ACK};
use crate::event::assemble;
use crate::recording::{parse_recording, RecordingEvent};
use crate::router;
use crate::sinks::DispatchEnvelope;

fn report_rejected(endpoint: &'static str, err: &CaptureError) {
    warn!("rejected request: {}", err);
    counter!(
        "capture_requests_rejected_total",
        "endpoint" => endpoint,
        "cause" => err.to_metric_tag()
    )
    .increment(1);
}

/// Page views. The record is handed to the dispatcher and acknowledged
/// without waiting for the event log.
#[instrument(
    skip_all,
    fields(
        url,
        ip,
        user_agent = headers
            .get("user-agent")
            .map_or("unknown", |v| v.to_str().unwrap_or("unknown")),
    )
)]
pub async fn track(
    state: State<router::State>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), CaptureError> {
    let event = assemble(&body, &headers, state.timesource.as_ref()).map_err(|err| {
        report_rejected("track", &err);
        err
    })?;

    Span::current().record("url", event.url.as_str());
    Span::current().record("ip", event.ip.as_str());
    debug!("visit assembled");

    state.dispatcher.dispatch(&state.topics.visits, &event);
    counter!("capture_events_received_total", "endpoint" => "track").increment(1);

    Ok((StatusCode::OK, TRACK_ACK))
}

/// Session recordings, forwarded as sent.
#[instrument(skip_all, fields(recording_id, page_title))]
pub async fn save_recording(
    state: State<router::State>,
    body: Bytes,
) -> Result<(StatusCode, &'static str), CaptureError> {
    let raw = parse_recording(&body).map_err(|err| {
        report_rejected("save_recording", &err);
        err
    })?;

    if let Some(view) = RecordingEvent::view(&raw) {
        if let Some(id) = view.id {
            Span::current().record("recording_id", display(id));
        }
        if let Some(title) = view.page_title.as_deref() {
            Span::current().record("page_title", title);
        }
    }

    state
        .dispatcher
        .dispatch_raw(DispatchEnvelope::new(state.topics.recordings.clone(), raw));
    counter!("capture_events_received_total", "endpoint" => "save_recording").increment(1);

    Ok((StatusCode::OK, RECORDING_ACK))
}
