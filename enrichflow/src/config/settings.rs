//! File-backed settings.
//!
//! Settings come from a TOML file (conventionally `env.toml`). When a
//! sibling file named after the runtime environment exists, e.g.
//! `env.production.toml` for `GCP_RUNTIME_ENV=production`, it is merged on
//! top: scalar keys override, tables merge recursively, and prompts replace
//! the base prompts of the same name.
//!
//! Prompt text is kept verbatim unless `application.trim_prompts` is set.

use crate::errors::ConfigError;
use crate::utils::{env_file_name, fix_prompt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use toml::{Table, Value as TomlValue};
use tracing::info;

/// Environment variable naming the runtime environment.
pub const RUNTIME_ENV_VAR: &str = "GCP_RUNTIME_ENV";

/// Runtime environment used when [`RUNTIME_ENV_VAR`] is unset.
pub const DEFAULT_RUNTIME_ENV: &str = "local";

/// Top-level settings, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// `[application]` section.
    pub application: ApplicationSettings,

    /// `[generative_ai]` section.
    #[serde(default)]
    pub generative_ai: GenerativeAiSettings,

    /// `[[prompts]]` entries.
    #[serde(default)]
    pub prompts: Vec<NamedPrompt>,
}

/// `[application]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Cloud project identifier.
    #[serde(default)]
    pub project_id: String,

    /// Cloud region.
    #[serde(default)]
    pub location: String,

    /// Salt used to decrypt `api_key`.
    #[serde(default)]
    pub salt: String,

    /// API key, plain or `ENC:`-prefixed.
    #[serde(default)]
    pub api_key: String,

    /// Worker threads for the runtime.
    #[serde(default = "default_thread_pool_size")]
    pub thread_pool_size: usize,

    /// Strips leading and trailing whitespace from every prompt line.
    #[serde(default)]
    pub trim_prompts: bool,
}

fn default_thread_pool_size() -> usize {
    4
}

/// `[generative_ai]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerativeAiSettings {
    /// `[generative_ai.embedding]`.
    #[serde(default)]
    pub embedding: Option<EmbeddingSettings>,

    /// `[generative_ai.generators.<name>]`.
    #[serde(default)]
    pub generators: BTreeMap<String, GeneratorSettings>,
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Model name, e.g. `text-embedding-004`.
    pub model_name: String,
}

/// Content generator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Model name, e.g. `gemini-2.0-flash`.
    pub model_name: String,

    /// Enables Google Search grounding.
    #[serde(default)]
    pub ground_with_google: bool,

    /// System instruction.
    #[serde(default)]
    pub instructions: Option<String>,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Nucleus sampling threshold.
    #[serde(default)]
    pub top_p: Option<f32>,

    /// Top-k sampling.
    #[serde(default)]
    pub top_k: Option<f32>,

    /// Output token limit.
    #[serde(default)]
    pub max_output_tokens: Option<u32>,

    /// Response MIME type, e.g. `application/json`.
    #[serde(default)]
    pub output_format: Option<String>,
}

/// A named prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPrompt {
    /// Prompt name.
    pub name: String,
    /// Template text with `${key}` placeholders.
    pub prompt: String,
}

impl NamedPrompt {
    /// Creates a new named prompt.
    #[must_use]
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
        }
    }
}

impl Settings {
    /// Loads settings for the environment named by [`RUNTIME_ENV_VAR`].
    ///
    /// # Errors
    ///
    /// Fails if a file cannot be read or parsed, or the merged document
    /// does not match the schema.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let env = std::env::var(RUNTIME_ENV_VAR).unwrap_or_else(|_| DEFAULT_RUNTIME_ENV.to_string());
        Self::load_for_env(path, &env)
    }

    /// Loads settings, merging the override file for `env` if present.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn load_for_env(path: impl AsRef<Path>, env: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");
        let mut base = read_table(path)?;

        if let Some(env_path) = env_file_name(path, env) {
            info!(path = %env_path.display(), env, "Loading environment configuration");
            let overrides = read_table(&env_path)?;
            merge_settings(&mut base, overrides);
        }

        let mut settings: Self = TomlValue::Table(base)
            .try_into()
            .map_err(ConfigError::Schema)?;
        if settings.application.trim_prompts {
            for prompt in &mut settings.prompts {
                prompt.prompt = fix_prompt(&prompt.prompt);
            }
        }
        Ok(settings)
    }

    /// Returns a copy with the salt and API key blanked out.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.application.salt.is_empty() {
            copy.application.salt = "<redacted>".to_string();
        }
        if !copy.application.api_key.is_empty() {
            copy.application.api_key = "<redacted>".to_string();
        }
        copy
    }
}

fn read_table(path: &Path) -> Result<Table, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    text.parse::<Table>().map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merges an override document into the base document.
fn merge_settings(base: &mut Table, overrides: Table) {
    for (key, value) in overrides {
        if key == "prompts" {
            let existing = base.remove("prompts");
            base.insert(key, merge_prompts(existing, value));
        } else {
            merge_value(base, key, value);
        }
    }
}

fn merge_value(base: &mut Table, key: String, value: TomlValue) {
    match value {
        TomlValue::Table(incoming) => {
            if let Some(TomlValue::Table(existing)) = base.get_mut(&key) {
                for (k, v) in incoming {
                    merge_value(existing, k, v);
                }
            } else {
                base.insert(key, TomlValue::Table(incoming));
            }
        }
        other => {
            base.insert(key, other);
        }
    }
}

fn prompt_name(value: &TomlValue) -> Option<&str> {
    value.get("name").and_then(TomlValue::as_str)
}

/// Override prompts come first; base prompts whose name is not overridden
/// are kept after them.
fn merge_prompts(existing: Option<TomlValue>, overrides: TomlValue) -> TomlValue {
    let TomlValue::Array(mut merged) = overrides else {
        return overrides;
    };
    if let Some(TomlValue::Array(base)) = existing {
        for prompt in base {
            let overridden = prompt_name(&prompt)
                .is_some_and(|name| merged.iter().any(|o| prompt_name(o) == Some(name)));
            if !overridden {
                merged.push(prompt);
            }
        }
    }
    TomlValue::Array(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    const BASE: &str = r#"
[application]
project_id = "retail-demo"
location = "us-central1"
salt = "pepper"
api_key = "plain"

[generative_ai.embedding]
model_name = "text-embedding-004"

[generative_ai.generators.flash]
model_name = "gemini-2.0-flash"
temperature = 0.2
output_format = "application/json"

[generative_ai.generators.pro]
model_name = "gemini-2.5-pro"

[[prompts]]
name = "category_detection"
prompt = """
    Detect the category.
    Use ${category_model}.
"""

[[prompts]]
name = "extract_product_details"
prompt = "Extract details"
"#;

    const OVERRIDE: &str = r#"
[application]
project_id = "retail-prod"

[generative_ai.generators.flash]
temperature = 0.7

[[prompts]]
name = "extract_product_details"
prompt = "Extract production details"
"#;

    #[test]
    fn test_load_base_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.toml");
        fs::write(&path, BASE).unwrap();

        let settings = Settings::load_for_env(&path, "local").unwrap();

        assert_eq!(settings.application.project_id, "retail-demo");
        assert_eq!(settings.application.thread_pool_size, 4);
        assert_eq!(settings.generative_ai.generators.len(), 2);
        assert_eq!(settings.prompts.len(), 2);
        assert_eq!(
            settings.prompts[0].prompt,
            "    Detect the category.\n    Use ${category_model}.\n"
        );
    }

    #[test]
    fn test_trim_prompts_is_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.toml");
        fs::write(&path, BASE.replace("api_key = \"plain\"", "api_key = \"plain\"\ntrim_prompts = true")).unwrap();

        let settings = Settings::load_for_env(&path, "local").unwrap();

        assert!(settings.application.trim_prompts);
        assert_eq!(
            settings.prompts[0].prompt,
            "Detect the category.\nUse ${category_model}."
        );
    }

    #[test]
    fn test_load_merges_environment_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.toml");
        fs::write(&path, BASE).unwrap();
        fs::write(dir.path().join("env.prod.toml"), OVERRIDE).unwrap();

        let settings = Settings::load_for_env(&path, "prod").unwrap();

        assert_eq!(settings.application.project_id, "retail-prod");
        assert_eq!(settings.application.location, "us-central1");

        let flash = &settings.generative_ai.generators["flash"];
        assert_eq!(flash.temperature, Some(0.7));
        assert_eq!(flash.model_name, "gemini-2.0-flash");
        assert_eq!(flash.output_format.as_deref(), Some("application/json"));

        let names: Vec<&str> = settings.prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["extract_product_details", "category_detection"]);
        assert_eq!(settings.prompts[0].prompt, "Extract production details");
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load_for_env("/nonexistent/env.toml", "local").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.toml");
        fs::write(&path, "[application").unwrap();

        let err = Settings::load_for_env(&path, "local").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.toml");
        fs::write(&path, "[application]\nthread_pool_size = \"many\"\n").unwrap();

        let err = Settings::load_for_env(&path, "local").unwrap_err();
        assert!(matches!(err, ConfigError::Schema(_)));
    }

    #[test]
    fn test_redacted() {
        let mut settings = Settings::default();
        settings.application.api_key = "ENC:00".to_string();

        let redacted = settings.redacted();
        assert_eq!(redacted.application.api_key, "<redacted>");
        assert_eq!(redacted.application.salt, "");
    }
}
