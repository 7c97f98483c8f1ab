//! Process-wide configuration.
//!
//! A [`Configuration`] is built once at startup, wrapped in an `Arc` and
//! handed to every [`Context`](crate::context::Context). It owns the prompt
//! catalog and the provider clients, so commands look capabilities up by
//! name instead of reaching for globals.

mod secrets;
mod settings;

pub use secrets::{decrypt, encrypt, generate_salt, DEFAULT_SALT_LENGTH, ENC_PREFIX};
pub use settings::{
    ApplicationSettings, EmbeddingSettings, GenerativeAiSettings, GeneratorSettings, NamedPrompt,
    Settings, DEFAULT_RUNTIME_ENV, RUNTIME_ENV_VAR,
};

use crate::errors::ConfigError;
use crate::providers::{Embedder, Generator};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Resolved configuration shared by every invocation.
#[derive(Clone, Default)]
pub struct Configuration {
    application: ApplicationSettings,
    prompts: Vec<NamedPrompt>,
    generators: BTreeMap<String, Arc<dyn Generator>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl Configuration {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Loads settings from `path` and builds Gemini clients for them.
    ///
    /// # Errors
    ///
    /// Fails if the settings cannot be loaded, the API key cannot be
    /// decrypted or the HTTP client cannot be built.
    #[cfg(feature = "gemini")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        Self::from_settings(Settings::load(path)?)
    }

    /// Builds Gemini clients for already loaded settings.
    ///
    /// # Errors
    ///
    /// See [`Configuration::load`].
    #[cfg(feature = "gemini")]
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        use crate::providers::gemini::{GeminiClient, GeminiEmbedder, GeminiGenerator};

        let api_key = decrypt(&settings.application.api_key, &settings.application.salt)?;
        let client = Arc::new(GeminiClient::new(api_key)?);

        let mut builder = Self::builder().with_application(settings.application);
        for (name, generator) in settings.generative_ai.generators {
            tracing::debug!(generator = %name, model = %generator.model_name, "Registering generator");
            builder = builder.with_generator(name, Arc::new(GeminiGenerator::new(client.clone(), generator)));
        }
        if let Some(embedding) = settings.generative_ai.embedding {
            builder = builder.with_embedder(Arc::new(GeminiEmbedder::new(client, embedding)));
        }
        for prompt in settings.prompts {
            builder = builder.with_prompt(prompt);
        }
        Ok(builder.build())
    }

    /// Returns the application settings.
    #[must_use]
    pub fn application(&self) -> &ApplicationSettings {
        &self.application
    }

    /// Returns the generator registered under `name`.
    ///
    /// # Errors
    ///
    /// `UnknownGenerator` if none is registered.
    pub fn generator(&self, name: &str) -> Result<Arc<dyn Generator>, ConfigError> {
        self.generators
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownGenerator(name.to_string()))
    }

    /// Returns the prompt registered under `name`.
    ///
    /// # Errors
    ///
    /// `UnknownPrompt` if none is registered.
    pub fn prompt(&self, name: &str) -> Result<&NamedPrompt, ConfigError> {
        self.prompts
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::UnknownPrompt(name.to_string()))
    }

    /// Returns the embedder.
    ///
    /// # Errors
    ///
    /// `NoEmbedding` if no embedding model is configured.
    pub fn embedder(&self) -> Result<Arc<dyn Embedder>, ConfigError> {
        self.embedder.clone().ok_or(ConfigError::NoEmbedding)
    }

    /// Returns the prompt catalog in lookup order.
    #[must_use]
    pub fn prompts(&self) -> &[NamedPrompt] {
        &self.prompts
    }

    /// Returns the registered generator names, sorted.
    #[must_use]
    pub fn generator_names(&self) -> Vec<&str> {
        self.generators.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("project_id", &self.application.project_id)
            .field("prompts", &self.prompts.len())
            .field("generators", &self.generator_names())
            .field("embedder", &self.embedder.is_some())
            .finish()
    }
}

/// Builder for [`Configuration`].
#[derive(Default)]
pub struct ConfigurationBuilder {
    inner: Configuration,
}

impl ConfigurationBuilder {
    /// Sets the application settings.
    #[must_use]
    pub fn with_application(mut self, application: ApplicationSettings) -> Self {
        self.inner.application = application;
        self
    }

    /// Adds a prompt, replacing any prompt of the same name.
    #[must_use]
    pub fn with_prompt(mut self, prompt: NamedPrompt) -> Self {
        match self.inner.prompts.iter_mut().find(|p| p.name == prompt.name) {
            Some(existing) => *existing = prompt,
            None => self.inner.prompts.push(prompt),
        }
        self
    }

    /// Registers a generator under `name`.
    #[must_use]
    pub fn with_generator(mut self, name: impl Into<String>, generator: Arc<dyn Generator>) -> Self {
        self.inner.generators.insert(name.into(), generator);
        self
    }

    /// Sets the embedder.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.inner.embedder = Some(embedder);
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> Configuration {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEmbedder, MockGenerator};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_registers_capabilities() {
        let config = Configuration::builder()
            .with_generator("flash", Arc::new(MockGenerator::echo()))
            .with_generator("pro", Arc::new(MockGenerator::echo()))
            .with_prompt(NamedPrompt::new("greet", "Hello ${name}"))
            .build();

        assert_eq!(config.generator_names(), vec!["flash", "pro"]);
        assert!(config.generator("flash").is_ok());
        assert_eq!(config.prompt("greet").unwrap().prompt, "Hello ${name}");
    }

    #[test]
    fn test_unknown_lookups() {
        let config = Configuration::default();

        assert!(matches!(
            config.generator("flash"),
            Err(ConfigError::UnknownGenerator(name)) if name == "flash"
        ));
        assert!(matches!(
            config.prompt("missing"),
            Err(ConfigError::UnknownPrompt(name)) if name == "missing"
        ));
        assert!(matches!(config.embedder(), Err(ConfigError::NoEmbedding)));
    }

    #[test]
    fn test_with_prompt_replaces_same_name() {
        let config = Configuration::builder()
            .with_prompt(NamedPrompt::new("a", "first"))
            .with_prompt(NamedPrompt::new("b", "other"))
            .with_prompt(NamedPrompt::new("a", "second"))
            .build();

        assert_eq!(config.prompts().len(), 2);
        assert_eq!(config.prompt("a").unwrap().prompt, "second");
    }

    #[tokio::test]
    async fn test_embedder_lookup() {
        let config = Configuration::builder()
            .with_embedder(Arc::new(MockEmbedder::default().on("shirt", vec![0.5, 0.25])))
            .build();

        let vector = config.embedder().unwrap().embed_text("shirt").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.25]);
    }

    #[cfg(feature = "gemini")]
    #[test]
    fn test_from_settings_decrypts_and_registers() {
        let salt = generate_salt(DEFAULT_SALT_LENGTH);
        let mut settings = Settings::default();
        settings.application.salt = salt.clone();
        settings.application.api_key = encrypt("AIza-test", &salt);
        settings.generative_ai.generators.insert(
            "flash".to_string(),
            GeneratorSettings {
                model_name: "gemini-2.0-flash".to_string(),
                ..GeneratorSettings::default()
            },
        );
        settings.generative_ai.embedding = Some(EmbeddingSettings {
            model_name: "text-embedding-004".to_string(),
        });
        settings.prompts.push(NamedPrompt::new("p", "text"));

        let config = Configuration::from_settings(settings).unwrap();
        assert_eq!(config.generator_names(), vec!["flash"]);
        assert!(config.embedder().is_ok());
        assert_eq!(config.prompts().len(), 1);
    }

    #[cfg(feature = "gemini")]
    #[test]
    fn test_from_settings_rejects_bad_secret() {
        let mut settings = Settings::default();
        settings.application.api_key = "ENC:not-hex".to_string();

        let err = Configuration::from_settings(settings).unwrap_err();
        assert!(matches!(err, ConfigError::Secret(_)));
    }
}
