//! Configuration types for story generation.
//!
//! Everything a [`crate::controller::Pipeline`] needs to talk to the
//! generation capability lives in [`StoryConfig`], built via
//! [`StoryConfigBuilder`]. Defaults: Gemini,
//! `gemini-3-flash-preview`, the key from `GEMINI_API_KEY`, no local timeout
//! and no output-length cap.

use crate::error::StoryError;
use crate::pipeline::llm::GenerationBackend;
use crate::progress::ProgressCallback;
use crate::prompts::INSTRUCTION_CONTRACT;
use std::fmt;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Provider used when none is configured. Served by the native REST backend.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Public Gemini endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variable consulted for providers without a well-known key name.
pub const FALLBACK_CREDENTIAL_VAR: &str = "KIDDOPDF_API_KEY";

/// An API key. `Debug` never prints the secret.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Read the key from `var`; an unset variable yields an empty credential.
    pub fn from_env(var: &str) -> Self {
        Self(std::env::var(var).unwrap_or_default())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

/// The environment variable that conventionally holds the key for `provider`.
pub fn default_credential_var(provider: &str) -> &'static str {
    match provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" => "GEMINI_API_KEY",
        "openai" => "OPENAI_API_KEY",
        "anthropic" => "ANTHROPIC_API_KEY",
        "mistral" => "MISTRAL_API_KEY",
        _ => FALLBACK_CREDENTIAL_VAR,
    }
}

/// Configuration for story generation.
///
/// # Example
/// ```rust
/// use kiddopdf::StoryConfig;
///
/// let config = StoryConfig::builder()
///     .model("gemini-2.5-flash")
///     .api_timeout_secs(300)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct StoryConfig {
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Provider name. `"gemini"` uses the built-in REST backend; any other
    /// name is handed to `edgequake_llm::ProviderFactory`.
    pub provider_name: String,

    /// Pre-constructed backend. Takes precedence over `provider_name`.
    pub backend: Option<Arc<dyn GenerationBackend>>,

    /// Base URL of the Gemini REST API.
    pub api_base_url: String,

    /// Explicit API key. Takes precedence over `credential_env`.
    pub credential: Option<Credential>,

    /// Environment variable holding the API key. If None, derived from the
    /// provider name (see [`default_credential_var`]).
    pub credential_env: Option<String>,

    /// Instruction override. If None, [`INSTRUCTION_CONTRACT`] is sent.
    pub instruction: Option<String>,

    /// Sampling temperature. If None, the model default applies.
    pub temperature: Option<f32>,

    /// Output token cap. If None, the capability decides (effectively
    /// unlimited); a low cap truncates long books mid-page.
    pub max_output_tokens: Option<u32>,

    /// Local timeout for the generation call. Default: None.
    ///
    /// Without it a hung call is only abandoned by killing the process.
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives every state transition and generation event.
    pub observer: Option<ProgressCallback>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: DEFAULT_PROVIDER.to_string(),
            backend: None,
            api_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            credential: None,
            credential_env: None,
            instruction: None,
            temperature: None,
            max_output_tokens: None,
            api_timeout_secs: None,
            download_timeout_secs: 120,
            observer: None,
        }
    }
}

impl fmt::Debug for StoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoryConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("api_base_url", &self.api_base_url)
            .field("credential", &self.credential)
            .field("credential_env", &self.credential_var())
            .field("instruction", &self.instruction.as_ref().map(|_| "<custom>"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn PipelineObserver>"))
            .finish()
    }
}

impl StoryConfig {
    /// Create a new builder for `StoryConfig`.
    pub fn builder() -> StoryConfigBuilder {
        StoryConfigBuilder {
            config: Self::default(),
        }
    }

    /// Name of the environment variable the key is read from.
    pub fn credential_var(&self) -> String {
        self.credential_env
            .clone()
            .unwrap_or_else(|| default_credential_var(&self.provider_name).to_string())
    }

    /// The explicit credential, or the one found in the environment.
    ///
    /// May be empty; emptiness is reported by the generation client, not here.
    pub fn resolve_credential(&self) -> Credential {
        match self.credential {
            Some(ref c) => c.clone(),
            None => Credential::from_env(&self.credential_var()),
        }
    }

    /// The instruction text sent with every payload.
    pub fn instruction(&self) -> &str {
        self.instruction.as_deref().unwrap_or(INSTRUCTION_CONTRACT)
    }
}

/// Builder for [`StoryConfig`].
#[derive(Debug)]
pub struct StoryConfigBuilder {
    config: StoryConfig,
}

impl StoryConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.config.credential = Some(credential);
        self
    }

    pub fn credential_env(mut self, var: impl Into<String>) -> Self {
        self.config.credential_env = Some(var.into());
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn observer(mut self, observer: ProgressCallback) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StoryConfig, StoryError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(StoryError::InvalidConfig("model must not be empty".into()));
        }
        if c.provider_name.trim().is_empty() {
            return Err(StoryError::InvalidConfig("provider must not be empty".into()));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(StoryError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        if c.max_output_tokens == Some(0) {
            return Err(StoryError::InvalidConfig(
                "max output tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(StoryError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.instruction.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(StoryError::InvalidConfig("instruction must not be empty".into()));
        }
        Ok(self.config)
    }
}
