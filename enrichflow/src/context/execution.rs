//! The per-invocation execution context.

use super::template::{self, Lookup};
use super::{ImageHandle, Value};
use crate::config::Configuration;
use crate::errors::{CommandError, ContextError};
use crate::events::{get_event_sink, EventSink};
use crate::utils::iso_timestamp;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// The mutable state of one chain invocation.
///
/// A context is created at request start, populated with the initial keys,
/// handed to a chain by `&mut` and discarded afterwards. It is the only
/// object mutated during a run, so two concurrent runs never share one.
pub struct Context {
    /// Run identifier attached to every emitted event.
    run_id: Uuid,
    /// Key/value state.
    state: HashMap<String, Value>,
    /// Soft errors recorded by commands, in order.
    errors: Vec<ContextError>,
    /// Process-wide configuration.
    configuration: Arc<Configuration>,
    /// Event sink for lifecycle events.
    event_sink: Arc<dyn EventSink>,
}

impl Context {
    /// Creates an empty context bound to the shared configuration.
    #[must_use]
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: HashMap::new(),
            errors: Vec::new(),
            configuration,
            event_sink: get_event_sink(),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the run identifier.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Sets an initial value.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Returns the run identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the shared configuration.
    #[must_use]
    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Gets a stored value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    /// Gets a stored value or the provided default.
    #[must_use]
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.state.get(key).cloned().unwrap_or(default)
    }

    /// Gets a text value.
    #[must_use]
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    /// Gets a list value.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_list)
    }

    /// Gets an image value.
    #[must_use]
    pub fn get_image(&self, key: &str) -> Option<&ImageHandle> {
        self.get(key).and_then(Value::as_image)
    }

    /// Gets a text value a command cannot do without.
    ///
    /// # Errors
    ///
    /// `MissingInput` when the key is absent or null, `InvalidValue` when
    /// it holds something other than text.
    pub fn require_text(&self, command: &str, key: &str) -> Result<&str, CommandError> {
        match self.get(key) {
            None | Some(Value::Null) => Err(CommandError::missing_input(command, key)),
            Some(Value::Text(s)) => Ok(s),
            Some(other) => Err(CommandError::InvalidValue {
                key: key.to_string(),
                expected: "text",
                found: other.kind(),
            }),
        }
    }

    /// Inserts or overwrites a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.insert(key.into(), value.into());
    }

    /// Removes a value, returning it.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.state.remove(key)
    }

    /// Returns true if the key holds a non-null value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.state.get(key).is_some_and(|v| !v.is_null())
    }

    /// Records a soft error. Never halts execution by itself.
    pub fn add_error(&mut self, error: ContextError) {
        tracing::debug!(
            run_id = %self.run_id,
            command = %error.command,
            error = %error.message,
            "Recorded context error"
        );
        self.errors.push(error);
    }

    /// Returns true if any soft error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the recorded soft errors, oldest first.
    #[must_use]
    pub fn errors(&self) -> &[ContextError] {
        &self.errors
    }

    /// Expands `${key}` placeholders against this context's state.
    #[must_use]
    pub fn expand(&self, template: &str) -> String {
        template::expand(template, self)
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Returns true if no key is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Returns the stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.state.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Returns the state as a JSON object.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.state
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Emits an event, enriched with the run identifier and a timestamp.
    pub fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));

        if let serde_json::Value::Object(ref mut map) = enriched {
            map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
            map.insert("timestamp".to_string(), serde_json::json!(iso_timestamp()));
        }

        self.event_sink.try_emit(event_type, Some(enriched));
    }
}

impl Lookup for Context {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("run_id", &self.run_id)
            .field("keys", &self.keys())
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}
