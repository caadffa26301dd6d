use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("palaver.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("palaver.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("palaver.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("palaver.stream.chunks");
pub(crate) static STREAM_CHUNK_ERRORS: Counter = Counter::new("palaver.stream.chunk_errors");
pub(crate) static STREAM_TRANSPORT_ERRORS: Counter =
    Counter::new("palaver.stream.transport_errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("palaver.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("palaver.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("palaver.stream.duration_seconds");

pub(crate) static SESSION_DISPATCHES: Counter = Counter::new("palaver.session.dispatches");
pub(crate) static SESSION_REJECTED_APPENDS: Counter =
    Counter::new("palaver.session.rejected_appends");

pub(crate) static FEEDBACK_UP: Counter = Counter::new("palaver.feedback.up");
pub(crate) static FEEDBACK_DOWN: Counter = Counter::new("palaver.feedback.down");
pub(crate) static EDITS_SAVED: Counter = Counter::new("palaver.feedback.edits_saved");
pub(crate) static EDITS_DISCARDED: Counter = Counter::new("palaver.feedback.edits_discarded");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_CHUNK_ERRORS);
    collector.register_counter(&STREAM_TRANSPORT_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_DISPATCHES);
    collector.register_counter(&SESSION_REJECTED_APPENDS);

    collector.register_counter(&FEEDBACK_UP);
    collector.register_counter(&FEEDBACK_DOWN);
    collector.register_counter(&EDITS_SAVED);
    collector.register_counter(&EDITS_DISCARDED);
}
