use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("dataeng_chat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("dataeng_chat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("dataeng_chat.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("dataeng_chat.stream.chunks");
pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("dataeng_chat.stream.fragments");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("dataeng_chat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("dataeng_chat.stream.bytes");
pub(crate) static STREAM_DURATION: Moments =
    Moments::new("dataeng_chat.stream.duration_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("dataeng_chat.session.turns");
pub(crate) static SESSION_TURN_ERRORS: Counter =
    Counter::new("dataeng_chat.session.turn_errors");
pub(crate) static SESSION_MODEL_SWITCHES: Counter =
    Counter::new("dataeng_chat.session.model_switches");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURN_ERRORS);
    collector.register_counter(&SESSION_MODEL_SWITCHES);
}
