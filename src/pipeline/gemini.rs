//! Native Gemini backend: `models/{model}:generateContent` over REST.
//!
//! PDFs and images go up as a single `inlineData` part next to the
//! instruction text, so a whole book is read in one request. The answer's
//! text is the concatenation of the first candidate's non-thought parts; a
//! response with no candidates (e.g. blocked by safety filters) yields empty
//! text, which the client turns into the fallback message.

use crate::error::{BackendError, StoryError};
use crate::pipeline::llm::{Generation, GenerationBackend, GenerationRequest};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

// ── Backend ──────────────────────────────────────────────────────────────

/// Calls the Gemini REST API directly.
pub struct GeminiBackend {
    http: reqwest::Client,
    base_url: String,
    model: String,
    label: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl GeminiBackend {
    /// The HTTP client has no timeout of its own; see
    /// [`crate::pipeline::llm::GenerationClient::with_timeout`].
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, StoryError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StoryError::Internal(format!("HTTP client: {e}")))?;
        let model = model.into();
        Ok(Self {
            http,
            base_url: base_url.into(),
            label: format!("gemini/{model}"),
            model,
            temperature: None,
            max_output_tokens: None,
        })
    }

    pub fn with_temperature(mut self, t: Option<f32>) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_max_output_tokens(mut self, n: Option<u32>) -> Self {
        self.max_output_tokens = n;
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body<'a>(&self, request: &'a GenerationRequest) -> GenerateContentRequest<'a> {
        let payload = request.payload();
        let generation_config = if self.temperature.is_some() || self.max_output_tokens.is_some() {
            Some(GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            })
        } else {
            None
        };
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: request.instruction(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: payload.mime_type(),
                            data: payload.data(),
                        },
                    },
                ],
            }],
            generation_config,
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        credential: &str,
    ) -> Result<Generation, BackendError> {
        let body = self.request_body(request);
        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, credential)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        debug!("Gemini answered HTTP {} with {} bytes", status, text.len());

        if !status.is_success() {
            return Err(status_error(status, &text));
        }
        parse_response(&text)
    }
}

fn transport_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_decode() {
        BackendError::Malformed(e.to_string())
    } else {
        BackendError::Transport(e.to_string())
    }
}

/// Map a non-success HTTP answer to the matching error kind.
fn status_error(status: StatusCode, body: &str) -> BackendError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => (env.error.message, env.error.status),
        Err(_) => (body.trim().chars().take(200).collect(), String::new()),
    };
    let message = if message.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    } else {
        message
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Auth { message },
        // Gemini answers an invalid key with 400 INVALID_ARGUMENT.
        StatusCode::BAD_REQUEST if api_status == "INVALID_ARGUMENT" && message.contains("API key") => {
            BackendError::Auth { message }
        }
        StatusCode::TOO_MANY_REQUESTS => BackendError::Quota { message },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendError::Timeout,
        _ => BackendError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn parse_response(body: &str) -> Result<Generation, BackendError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed(e.to_string()))?;

    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    let usage = parsed.usage_metadata;
    Ok(Generation {
        text,
        input_tokens: usage.as_ref().and_then(|u| u.prompt_token_count),
        output_tokens: usage.as_ref().and_then(|u| u.candidates_token_count),
    })
}
