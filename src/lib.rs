//! # kiddopdf
//!
//! Turn a PDF or picture into a complete, page-by-page story a 5-year-old can
//! follow, written in Hinglish by a generative model.
//!
//! The whole document goes to the model in a single request, together with a
//! fixed instruction that demands every page be covered in order. Nothing is
//! chunked, retried or checked locally: the story comes back verbatim, or the
//! one failure message is shown.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file / URL
//!  │
//!  ├─ 1. Select   describe the candidate (name, kind, size)      Idle → HasCandidate
//!  ├─ 2. Encode   read bytes, base64 + declared media type       HasCandidate → Processing
//!  ├─ 3. Generate one call: instruction + inline payload
//!  └─ 4. Resolve  story, fallback story or failure message       Processing → Resolved
//! ```
//!
//! [`Pipeline`] owns the state machine and rejects a second submission while
//! one is in flight. [`View`] maps each state to what a front-end shows.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kiddopdf::{simplify, StoryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key read from GEMINI_API_KEY
//!     let config = StoryConfig::default();
//!     let output = simplify("science-chapter.pdf", &config).await?;
//!     println!("{}", output.story);
//!     eprintln!("{} pages told", output.outline.sections.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `kiddopdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! kiddopdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod candidate;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod view;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use candidate::{CandidateSource, DocumentKind, UploadCandidate};
pub use config::{Credential, StoryConfig, StoryConfigBuilder};
pub use controller::{Pipeline, PipelineState, StateKind};
pub use convert::{simplify, simplify_bytes, simplify_sync, simplify_to_file};
pub use error::{BackendError, EncodingError, StoryError, TransitionError};
pub use output::{GenerationResult, PageSection, StoryOutline, StoryOutput, StoryStats};
pub use pipeline::encode::EncodedPayload;
pub use pipeline::gemini::GeminiBackend;
pub use pipeline::llm::{
    Generation, GenerationBackend, GenerationClient, GenerationRequest, ProviderBackend,
};
pub use progress::{NoopObserver, PipelineObserver, ProgressCallback};
pub use prompts::{FALLBACK_MESSAGE, INSTRUCTION_CONTRACT};
pub use view::{error_banner, export_story, View, ViewKind, PROCESSING_MESSAGE};
