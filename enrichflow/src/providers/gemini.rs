//! Gemini REST provider.
//!
//! Talks to the Generative Language API (`models/{model}:generateContent`
//! and `models/{model}:embedContent`) with an API key. Videos go through
//! the Files API first: they are uploaded, then polled until processing
//! ends. One [`GeminiClient`] holds the HTTP connection pool and is shared
//! by every generator built from the configuration.

use super::{Embedder, Generator};
use crate::config::{EmbeddingSettings, GeneratorSettings};
use crate::context::ImageHandle;
use crate::errors::{ConfigError, GenerationError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Harm categories blocked at medium probability and above.
pub const SAFETY_CATEGORIES: [&str; 5] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_CIVIC_INTEGRITY",
];

const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const FILE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shared HTTP client for the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client for the public endpoint.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Overrides the endpoint, e.g. for a proxy.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    /// Upload endpoint, e.g. `.../upload/v1beta/files`.
    fn upload_url(&self) -> String {
        match self.base_url.rsplit_once('/') {
            Some((root, version)) => format!("{root}/upload/{version}/files?uploadType=media"),
            None => format!("{}/files?uploadType=media", self.base_url),
        }
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned + Send>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, GenerationError> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        decode(response).await
    }

    async fn upload_file(&self, bytes: Vec<u8>, mime_type: &str) -> Result<RemoteFile, GenerationError> {
        let response = self
            .http
            .post(self.upload_url())
            .header("x-goog-api-key", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let uploaded: UploadFileResponse = decode(response).await?;
        Ok(uploaded.file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, GenerationError> {
        let response = self
            .http
            .get(format!("{}/{name}", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, GenerationError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<R>()
        .await
        .map_err(|e| GenerationError::Decode(e.to_string()))
}

/// Polls `refresh` while the file is processing.
async fn wait_for_file<F, Fut>(
    mut file: RemoteFile,
    interval: Duration,
    mut refresh: F,
) -> Result<RemoteFile, GenerationError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<RemoteFile, GenerationError>>,
{
    while file.state == FileState::Processing {
        debug!(file = %file.name, "File still processing");
        tokio::time::sleep(interval).await;
        file = refresh(file.name.clone()).await?;
    }

    if file.state == FileState::Failed {
        return Err(GenerationError::FileFailed { name: file.name });
    }
    Ok(file)
}

fn video_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("mpeg" | "mpg") => "video/mpeg",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("webm") => "video/webm",
        Some("wmv") => "video/x-ms-wmv",
        Some("3gp") => "video/3gpp",
        _ => "application/octet-stream",
    }
}

/// A content generator backed by one Gemini model.
#[derive(Debug)]
pub struct GeminiGenerator {
    client: Arc<GeminiClient>,
    settings: GeneratorSettings,
}

impl GeminiGenerator {
    /// Creates a generator for the model named in `settings`.
    #[must_use]
    pub fn new(client: Arc<GeminiClient>, settings: GeneratorSettings) -> Self {
        Self { client, settings }
    }

    async fn generate(&self, parts: Vec<Part>) -> Result<String, GenerationError> {
        let request = build_request(&self.settings, parts);
        let url = self.client.model_url(&self.settings.model_name, "generateContent");
        debug!(model = %self.settings.model_name, "Sending generation request");

        let response: GenerateContentResponse = self.client.post(&url, &request).await?;
        extract_text(&self.settings.model_name, response)
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate_content(&self, prompt: &str) -> Result<String, GenerationError> {
        self.generate(vec![Part::text(prompt)]).await
    }

    async fn understand_image(
        &self,
        prompt: &str,
        image: &ImageHandle,
    ) -> Result<String, GenerationError> {
        self.generate(vec![Part::text(prompt), Part::image(image)]).await
    }

    async fn understand_video(&self, prompt: &str, video: &Path) -> Result<String, GenerationError> {
        let bytes = tokio::fs::read(video)
            .await
            .map_err(|e| GenerationError::ReadMedia {
                path: video.to_path_buf(),
                message: e.to_string(),
            })?;
        let mime_type = video_mime_type(video);

        let uploaded = self.client.upload_file(bytes, mime_type).await?;
        info!(file = %uploaded.name, path = %video.display(), "Uploaded video");

        let client = &self.client;
        let file = wait_for_file(uploaded, FILE_POLL_INTERVAL, |name| async move {
            client.get_file(&name).await
        })
        .await?;

        self.generate(vec![Part::file(&file, mime_type), Part::text(prompt)])
            .await
    }
}

/// A text embedder backed by one Gemini embedding model.
#[derive(Debug)]
pub struct GeminiEmbedder {
    client: Arc<GeminiClient>,
    settings: EmbeddingSettings,
}

impl GeminiEmbedder {
    /// Creates an embedder for the model named in `settings`.
    #[must_use]
    pub fn new(client: Arc<GeminiClient>, settings: EmbeddingSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed_text(&self, value: &str) -> Result<Vec<f32>, GenerationError> {
        let request = EmbedContentRequest {
            model: format!("models/{}", self.settings.model_name),
            content: Content {
                role: None,
                parts: vec![Part::text(value)],
            },
        };
        let url = self.client.model_url(&self.settings.model_name, "embedContent");

        let response: EmbedContentResponse = self.client.post(&url, &request).await?;
        Ok(response.embedding.values)
    }
}

// Wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    file_data: Option<FileData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
            file_data: None,
        }
    }

    fn image(image: &ImageHandle) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type().to_string(),
                data: image.to_base64(),
            }),
            file_data: None,
        }
    }

    // The provider's reported MIME type wins over the one guessed locally.
    fn file(file: &RemoteFile, fallback_mime_type: &str) -> Self {
        let mime_type = file
            .mime_type
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback_mime_type);
        Self {
            text: None,
            inline_data: None,
            file_data: Some(FileData {
                mime_type: mime_type.to_string(),
                file_uri: file.uri.clone(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct UploadFileResponse {
    file: RemoteFile,
}

/// File metadata returned by the Files API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: FileState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum FileState {
    Processing,
    Active,
    Failed,
    #[default]
    #[serde(other)]
    StateUnspecified,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn build_request(settings: &GeneratorSettings, parts: Vec<Part>) -> GenerateContentRequest {
    let system_instruction = settings
        .instructions
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|text| Content {
            role: None,
            parts: vec![Part::text(text)],
        });

    let tools = if settings.ground_with_google {
        vec![Tool {
            google_search: serde_json::Map::new(),
        }]
    } else {
        Vec::new()
    };

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        system_instruction,
        generation_config: GenerationConfig {
            temperature: settings.temperature,
            top_p: settings.top_p,
            top_k: settings.top_k.map(|k| k.max(0.0).round() as u32),
            max_output_tokens: settings.max_output_tokens,
            response_mime_type: settings.output_format.clone(),
        },
        safety_settings: SAFETY_CATEGORIES
            .into_iter()
            .map(|category| SafetySetting {
                category,
                threshold: SAFETY_THRESHOLD,
            })
            .collect(),
        tools,
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(model: &str, response: GenerateContentResponse) -> Result<String, GenerationError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationError::Blocked { reason });
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(GenerationError::EmptyResponse {
            model: model.to_string(),
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|r| r == "SAFETY") {
            return Err(GenerationError::Blocked { reason });
        }
        return Err(GenerationError::EmptyResponse {
            model: model.to_string(),
        });
    }
    Ok(text)
}
