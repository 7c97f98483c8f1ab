//! Error types for the enrichflow framework.
//!
//! Errors fall into two groups. [`CommandError`] is the fatal channel: a
//! command returning it aborts the enclosing chain and the error reaches the
//! chain's caller unchanged. [`ContextError`] is the soft channel: a record a
//! command appends to its context with `add_error` before carrying on.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// The error raised by a command body, aborting the running chain.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A required configuration entry was missing or unusable.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The capability provider failed.
    #[error("{0}")]
    Generation(#[from] GenerationError),

    /// A command whose contract mandates an input found it absent.
    #[error("Command '{command}' requires missing input '{key}'")]
    MissingInput {
        /// The command name.
        command: String,
        /// The missing key.
        key: String,
    },

    /// A stored value did not have the expected kind.
    #[error("Value for '{key}' has kind {found}, expected {expected}")]
    InvalidValue {
        /// The key read.
        key: String,
        /// The expected value kind.
        expected: &'static str,
        /// The kind actually found.
        found: &'static str,
    },

    /// A command produced output that failed validation.
    #[error("Invalid output from '{command}': {message}")]
    InvalidOutput {
        /// The command name.
        command: String,
        /// What was wrong with the output.
        message: String,
    },

    /// A command failed for a reason of its own.
    #[error("Command '{command}' failed: {message}")]
    Failed {
        /// The command name.
        command: String,
        /// The failure message.
        message: String,
    },

    /// Any other error surfaced from a command body.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CommandError {
    /// Creates a missing input error.
    #[must_use]
    pub fn missing_input(command: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingInput {
            command: command.into(),
            key: key.into(),
        }
    }

    /// Creates a generic failure error.
    #[must_use]
    pub fn failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid output error.
    #[must_use]
    pub fn invalid_output(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOutput {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable error kind, used in lifecycle events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Generation(_) => "generation",
            Self::MissingInput { .. } => "missing_input",
            Self::InvalidValue { .. } => "invalid_value",
            Self::InvalidOutput { .. } => "invalid_output",
            Self::Failed { .. } => "failed",
            Self::Other(_) => "other",
        }
    }
}

/// A recoverable error recorded on a context.
///
/// Recording one never halts a chain; callers inspect
/// `Context::has_errors` after the run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{command}: {message}")]
pub struct ContextError {
    /// The command that recorded the error.
    pub command: String,
    /// The error message.
    pub message: String,
}

impl ContextError {
    /// Creates a new context error.
    #[must_use]
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Records any error under the given command name.
    #[must_use]
    pub fn from_error(command: impl Into<String>, error: &dyn std::error::Error) -> Self {
        Self::new(command, error.to_string())
    }
}

/// Errors raised while loading or querying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Cannot read configuration file {path}: {source}")]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("Cannot parse configuration file {path}: {source}")]
    Parse {
        /// The file path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// The merged configuration does not match the expected schema.
    #[error("Invalid configuration: {0}")]
    Schema(#[source] toml::de::Error),

    /// No generator is registered under the name.
    #[error("Unknown generator: {0}")]
    UnknownGenerator(String),

    /// No prompt is registered under the name.
    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    /// No embedding model is configured.
    #[error("No embedding model configured")]
    NoEmbedding,

    /// The API key could not be decrypted.
    #[error("{0}")]
    Secret(#[from] SecretError),

    /// A provider client could not be built.
    #[error("Cannot build provider client: {0}")]
    Client(String),
}

/// Errors raised by a capability provider.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The request could not be sent or the response not read.
    #[error("Generation request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("Generation failed with status {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body.
        body: String,
    },

    /// The provider blocked the prompt or the response.
    #[error("Generation blocked: {reason}")]
    Blocked {
        /// The block reason reported by the provider.
        reason: String,
    },

    /// The response carried no text.
    #[error("Empty response from model {model}")]
    EmptyResponse {
        /// The model name.
        model: String,
    },

    /// The response body could not be decoded.
    #[error("Cannot decode generation response: {0}")]
    Decode(String),

    /// A local media file could not be read.
    #[error("Cannot read media file {path}: {message}")]
    ReadMedia {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error message.
        message: String,
    },

    /// An uploaded file ended in the `FAILED` state.
    #[error("Processing of uploaded file {name} failed")]
    FileFailed {
        /// The provider's file name, e.g. `files/abc123`.
        name: String,
    },
}

/// Errors raised while decoding an obfuscated secret.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The payload is not valid hex.
    #[error("Secret is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The decoded secret is not valid UTF-8.
    #[error("Secret is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}
