//! Mock commands and providers for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::commands::Command;
use crate::context::{Context, ImageHandle, Value};
use crate::errors::{CommandError, ContextError, GenerationError};
use crate::providers::{Embedder, Generator};

/// Default key recording commands append to.
pub const LOG_KEY: &str = "log";

fn append_to_log(ctx: &mut Context, key: &str, entry: &str) {
    let mut log = ctx.get_list(key).map(<[Value]>::to_vec).unwrap_or_default();
    log.push(Value::from(entry));
    ctx.set(key, Value::List(log));
}

/// Reads a log written by recording commands.
#[must_use]
pub fn read_log(ctx: &Context, key: &str) -> Vec<String> {
    ctx.get_list(key)
        .unwrap_or_default()
        .iter()
        .filter_map(|v| v.as_text().map(String::from))
        .collect()
}

/// A command that appends its own name to a list in the context.
#[derive(Debug)]
pub struct RecordingCommand {
    name: String,
}

impl RecordingCommand {
    /// Creates a recorder writing to [`LOG_KEY`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Command for RecordingCommand {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &mut Context) -> Result<(), CommandError> {
        append_to_log(ctx, LOG_KEY, &self.name);
        Ok(())
    }
}

/// A command that always fails.
#[derive(Debug)]
pub struct FailingCommand {
    name: String,
    message: String,
}

impl FailingCommand {
    /// Creates a new failing command.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Command for FailingCommand {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &mut Context) -> Result<(), CommandError> {
        Err(CommandError::failed(&self.name, &self.message))
    }
}

/// A command that records a soft error and carries on.
#[derive(Debug)]
pub struct SoftFailingCommand {
    name: String,
    message: String,
}

impl SoftFailingCommand {
    /// Creates a new soft-failing command.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Command for SoftFailingCommand {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &mut Context) -> Result<(), CommandError> {
        ctx.add_error(ContextError::new(&self.name, &self.message));
        Ok(())
    }
}

/// A command that sleeps, then appends its name to [`LOG_KEY`].
#[derive(Debug)]
pub struct SlowCommand {
    name: String,
    delay: Duration,
}

impl SlowCommand {
    /// Creates a new slow command.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

#[async_trait]
impl Command for SlowCommand {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &mut Context) -> Result<(), CommandError> {
        tokio::time::sleep(self.delay).await;
        append_to_log(ctx, LOG_KEY, &self.name);
        Ok(())
    }
}

/// A scripted generator.
///
/// Responses are chosen by the first registered pattern contained in the
/// prompt; otherwise the default response is returned, or the prompt itself
/// in echo mode.
#[derive(Debug, Default)]
pub struct MockGenerator {
    patterns: Vec<(String, String)>,
    default_response: Option<String>,
    failing: bool,
    prompts: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl MockGenerator {
    /// Creates a generator echoing its prompts.
    #[must_use]
    pub fn echo() -> Self {
        Self::default()
    }

    /// Creates a generator answering every prompt with `response`.
    #[must_use]
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            default_response: Some(response.into()),
            ..Self::default()
        }
    }

    /// Creates a generator failing every call.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Answers prompts containing `pattern` with `response`.
    #[must_use]
    pub fn on(mut self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.patterns.push((pattern.into(), response.into()));
        self
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Returns every prompt received, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn respond(&self, prompt: &str) -> Result<String, GenerationError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        if self.failing {
            return Err(GenerationError::Status {
                status: 503,
                body: "mock generator unavailable".to_string(),
            });
        }

        let scripted = self
            .patterns
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());

        Ok(scripted
            .or_else(|| self.default_response.clone())
            .unwrap_or_else(|| prompt.to_string()))
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate_content(&self, prompt: &str) -> Result<String, GenerationError> {
        self.respond(prompt)
    }

    async fn understand_image(
        &self,
        prompt: &str,
        _image: &ImageHandle,
    ) -> Result<String, GenerationError> {
        self.respond(prompt)
    }

    async fn understand_video(&self, prompt: &str, _video: &Path) -> Result<String, GenerationError> {
        self.respond(prompt)
    }
}

/// An embedder returning a fixed vector per input text.
#[derive(Debug, Default)]
pub struct MockEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl MockEmbedder {
    /// Registers the vector returned for `text`.
    #[must_use]
    pub fn on(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_text(&self, value: &str) -> Result<Vec<f32>, GenerationError> {
        Ok(self.vectors.get(value).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generator_patterns() {
        let generator = MockGenerator::with_response("default")
            .on("category", "Dress Shirts");

        assert_eq!(
            generator.generate_content("detect the category").await.unwrap(),
            "Dress Shirts"
        );
        assert_eq!(generator.generate_content("other").await.unwrap(), "default");
        assert_eq!(generator.call_count(), 2);
        assert_eq!(generator.prompts()[1], "other");
    }

    #[tokio::test]
    async fn test_mock_generator_echo_and_failure() {
        let image = ImageHandle::new("image/png", vec![1_u8]);
        assert_eq!(
            MockGenerator::echo().understand_image("hi", &image).await.unwrap(),
            "hi"
        );

        let err = MockGenerator::failing()
            .generate_content("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_mock_generator_video() {
        let generator = MockGenerator::with_response("none").on("unboxing", "a shirt is unfolded");

        let text = generator
            .understand_video("describe the unboxing", Path::new("clip.mp4"))
            .await
            .unwrap();
        assert_eq!(text, "a shirt is unfolded");
        assert_eq!(generator.prompts(), vec!["describe the unboxing"]);
    }
}
