//! Generative capability providers.
//!
//! Commands never talk to a model directly: they ask the shared
//! [`Configuration`](crate::config::Configuration) for a [`Generator`] by
//! name, so tests substitute scripted implementations without touching the
//! commands.

#[cfg(feature = "gemini")]
pub mod gemini;

use crate::context::ImageHandle;
use crate::errors::GenerationError;
use async_trait::async_trait;
use std::path::Path;

/// A text, image and video understanding model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generates text for a prompt.
    async fn generate_content(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Generates text for a prompt about an image.
    async fn understand_image(
        &self,
        prompt: &str,
        image: &ImageHandle,
    ) -> Result<String, GenerationError>;

    /// Generates text for a prompt about a local video file.
    ///
    /// The file is handed to the provider first; this resolves once the
    /// provider has finished processing it and answered the prompt.
    async fn understand_video(&self, prompt: &str, video: &Path) -> Result<String, GenerationError>;
}

/// A text embedding model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the embedding vector for `value`.
    async fn embed_text(&self, value: &str) -> Result<Vec<f32>, GenerationError>;
}
