//! Lifecycle event emission.
//!
//! Chains report their progress as named events with a JSON payload. Events
//! go to the sink held by the running [`Context`](crate::context::Context),
//! which defaults to the process-wide sink registered here.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use parking_lot::RwLock;
use std::sync::Arc;

/// Event type names emitted by chains.
pub mod event_types {
    /// A chain began executing.
    pub const CHAIN_STARTED: &str = "chain.started";
    /// A chain ran every child to completion.
    pub const CHAIN_FINISHED: &str = "chain.finished";
    /// A child failed and the chain stopped.
    pub const CHAIN_ABORTED: &str = "chain.aborted";
    /// A child command is about to run.
    pub const COMMAND_STARTED: &str = "command.started";
    /// A child command completed.
    pub const COMMAND_FINISHED: &str = "command.finished";
}

static GLOBAL_EVENT_SINK: RwLock<Option<Arc<dyn EventSink>>> = RwLock::new(None);

/// Sets the process-wide default event sink.
pub fn set_event_sink(sink: Arc<dyn EventSink>) {
    *GLOBAL_EVENT_SINK.write() = Some(sink);
}

/// Clears the process-wide default event sink.
pub fn clear_event_sink() {
    *GLOBAL_EVENT_SINK.write() = None;
}

/// Gets the process-wide default event sink.
///
/// Returns a `NoOpEventSink` if no sink is set.
pub fn get_event_sink() -> Arc<dyn EventSink> {
    GLOBAL_EVENT_SINK
        .read()
        .clone()
        .unwrap_or_else(|| Arc::new(NoOpEventSink))
}
