//! Generation client: one request, one answer.
//!
//! [`GenerationClient`] pairs the instruction contract with an
//! [`EncodedPayload`] and sends it through a [`GenerationBackend`] exactly
//! once. It never retries, never truncates and never inspects the story for
//! compliance with the contract. Its only local decisions are:
//!
//! * an empty credential fails with [`StoryError::MissingCredential`] before
//!   the backend is touched;
//! * an empty answer becomes [`FALLBACK_MESSAGE`] (a degraded success);
//! * an optional local timeout turns a hung call into
//!   [`BackendError::Timeout`].
//!
//! Two backends ship with the crate: the native Gemini REST backend in
//! [`crate::pipeline::gemini`], and [`ProviderBackend`], which adapts any
//! `edgequake_llm` provider.

use crate::error::{BackendError, StoryError};
use crate::output::GenerationResult;
use crate::pipeline::encode::EncodedPayload;
use crate::prompts::FALLBACK_MESSAGE;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Instruction plus payload, built once per submission.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    instruction: String,
    payload: EncodedPayload,
}

impl GenerationRequest {
    pub fn new(instruction: impl Into<String>, payload: EncodedPayload) -> Self {
        Self {
            instruction: instruction.into(),
            payload,
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn payload(&self) -> &EncodedPayload {
        &self.payload
    }
}

/// Raw answer from a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    /// Concatenated text of the answer. May be empty.
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A capability that turns instruction + payload into text.
///
/// Implementations must issue at most one upstream request per call.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn generate(
        &self,
        request: &GenerationRequest,
        credential: &str,
    ) -> Result<Generation, BackendError>;
}

/// Sends a single [`GenerationRequest`] and interprets the answer.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
    instruction: String,
    credential_var: String,
    timeout: Option<Duration>,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerationBackend>, instruction: impl Into<String>) -> Self {
        Self {
            backend,
            instruction: instruction.into(),
            credential_var: crate::config::default_credential_var(crate::config::DEFAULT_PROVIDER)
                .to_string(),
            timeout: None,
        }
    }

    /// Name of the variable reported in [`StoryError::MissingCredential`].
    pub fn with_credential_var(mut self, var: impl Into<String>) -> Self {
        self.credential_var = var.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Fail fast when no key is available.
    pub fn check_credential(&self, credential: &str) -> Result<(), StoryError> {
        if credential.trim().is_empty() {
            return Err(StoryError::MissingCredential {
                var: self.credential_var.clone(),
            });
        }
        Ok(())
    }

    /// Generate the story, reporting failures as typed errors.
    ///
    /// `Ok` holds either the story or [`FALLBACK_MESSAGE`].
    pub async fn try_generate(
        &self,
        payload: &EncodedPayload,
        credential: &str,
    ) -> Result<String, StoryError> {
        self.check_credential(credential)?;

        let request = GenerationRequest::new(self.instruction.clone(), payload.clone());
        let start = Instant::now();
        info!(
            "Sending {} payload ({} bytes base64) to {}",
            payload.mime_type(),
            payload.data().len(),
            self.backend.name()
        );

        let call = self.backend.generate(&request, credential);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(r) => r,
                Err(_) => Err(BackendError::Timeout),
            },
            None => call.await,
        };

        let generation = outcome.inspect_err(|e| {
            warn!("Generation via {} failed after {:?}: {}", self.backend.name(), start.elapsed(), e);
        })?;

        debug!(
            "Generation finished in {:?}: {:?} input tokens, {:?} output tokens, {} chars",
            start.elapsed(),
            generation.input_tokens,
            generation.output_tokens,
            generation.text.len()
        );

        if generation.text.trim().is_empty() {
            warn!("Capability returned no text; using the fallback message");
            return Ok(FALLBACK_MESSAGE.to_string());
        }
        Ok(generation.text)
    }

    /// Generate the story as a [`GenerationResult`]; never fails.
    pub async fn generate(&self, payload: &EncodedPayload, credential: &str) -> GenerationResult {
        self.try_generate(payload, credential).await.into()
    }
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// Adapts an `edgequake_llm` provider to [`GenerationBackend`].
///
/// The payload travels as an image attachment on the user turn, and the
/// instruction as the system message. The attachment keeps the payload's
/// media type as-is (`application/pdf` included); a provider that cannot
/// read it answers with an error, which resolves as a failure. Provider factories read their own API
/// key from the environment, so the `credential` argument only gates the
/// call (see [`GenerationClient::check_credential`]).
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Instantiate a named provider via `ProviderFactory`.
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, StoryError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            StoryError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, format!("{provider_name}/{model}")))
    }

    pub fn with_temperature(mut self, t: Option<f32>) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_max_tokens(mut self, n: Option<u32>) -> Self {
        self.max_tokens = n.map(|n| n as usize);
        self
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..Default::default()
        }
    }
}

#[async_trait]
impl GenerationBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        _credential: &str,
    ) -> Result<Generation, BackendError> {
        let payload = request.payload();
        let messages = vec![
            ChatMessage::system(request.instruction()),
            ChatMessage::user_with_images(
                "",
                vec![ImageData::new(payload.data().to_string(), payload.mime_type())],
            ),
        ];
        let options = self.options();

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendError::Provider(format!("{e}")))?;

        Ok(Generation {
            text: response.content,
            input_tokens: Some(response.prompt_tokens as u64),
            output_tokens: Some(response.completion_tokens as u64),
        })
    }
}
