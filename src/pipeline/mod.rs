//! Pipeline stages for document-to-story generation.
//!
//! Each submodule implements exactly one step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ (gemini | edgequake provider)
//! (URL/path) (base64)  (one request, fallback on empty text)
//! ```
//!
//! 1. [`input`]: turn the user-supplied path or URL into an upload candidate
//! 2. [`encode`]: read the candidate's bytes and base64-wrap them
//! 3. [`llm`]: send instruction + payload once; the only stage with
//!    network I/O
//! 4. [`gemini`]: native `generateContent` backend used by default

pub mod encode;
pub mod gemini;
pub mod input;
pub mod llm;

use crate::config::StoryConfig;
use crate::error::StoryError;
use gemini::GeminiBackend;
use llm::{GenerationBackend, ProviderBackend};
use std::sync::Arc;
use tracing::info;

/// Pick the backend for `config`.
///
/// A pre-built backend wins. `gemini`/`google` use the native REST backend;
/// any other provider name goes through `edgequake_llm::ProviderFactory`.
pub fn resolve_backend(config: &StoryConfig) -> Result<Arc<dyn GenerationBackend>, StoryError> {
    if let Some(ref backend) = config.backend {
        info!("Using injected backend: {}", backend.name());
        return Ok(Arc::clone(backend));
    }

    let backend: Arc<dyn GenerationBackend> = match config.provider_name.to_ascii_lowercase().as_str() {
        "gemini" | "google" => Arc::new(
            GeminiBackend::new(&config.api_base_url, &config.model)?
                .with_temperature(config.temperature)
                .with_max_output_tokens(config.max_output_tokens),
        ),
        other => Arc::new(
            ProviderBackend::from_name(other, &config.model)?
                .with_temperature(config.temperature)
                .with_max_tokens(config.max_output_tokens),
        ),
    };
    info!("Using provider: {}", backend.name());
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_native_gemini() {
        let config = StoryConfig::default();
        let backend = resolve_backend(&config).unwrap();
        assert_eq!(backend.name(), "gemini/gemini-3-flash-preview");
    }

    #[test]
    fn google_alias_is_native_too() {
        let config = StoryConfig::builder()
            .provider_name("Google")
            .model("gemini-2.5-flash")
            .build()
            .unwrap();
        assert_eq!(resolve_backend(&config).unwrap().name(), "gemini/gemini-2.5-flash");
    }

    #[test]
    fn injected_backend_wins() {
        let injected: Arc<dyn GenerationBackend> =
            Arc::new(GeminiBackend::new("http://127.0.0.1:9", "injected").unwrap());
        let config = StoryConfig::builder()
            .provider_name("openai")
            .backend(injected)
            .build()
            .unwrap();
        assert_eq!(resolve_backend(&config).unwrap().name(), "gemini/injected");
    }
}
