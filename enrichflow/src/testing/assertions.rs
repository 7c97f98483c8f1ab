//! Test assertions for chain runs.

use crate::context::Context;
use crate::events::CollectingEventSink;

use super::mocks::read_log;

/// Asserts that the log under `key` holds exactly `expected`.
pub fn assert_log(ctx: &Context, key: &str, expected: &[&str]) {
    let actual = read_log(ctx, key);
    assert_eq!(
        actual, expected,
        "Expected log {expected:?} under '{key}', got {actual:?}"
    );
}

/// Asserts that the sink received exactly `expected` event types, in order.
pub fn assert_event_sequence(sink: &CollectingEventSink, expected: &[&str]) {
    let actual = sink.event_types();
    assert_eq!(
        actual, expected,
        "Expected events {expected:?}, got {actual:?}"
    );
}

/// Asserts that the context recorded no soft errors.
pub fn assert_no_errors(ctx: &Context) {
    assert!(
        !ctx.has_errors(),
        "Expected no recorded errors, got {:?}",
        ctx.errors()
    );
}
