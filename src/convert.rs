//! One-shot entry points: select, submit and unwrap in one call.
//!
//! Each call builds a fresh [`Pipeline`], runs exactly one cycle on it and
//! discards it. Use [`Pipeline`] directly when you need to observe the
//! intermediate states or retry the same candidate.

use crate::candidate::{DocumentKind, UploadCandidate};
use crate::config::StoryConfig;
use crate::controller::Pipeline;
use crate::error::StoryError;
use crate::output::{GenerationResult, StoryOutput, StoryStats};
use crate::pipeline::input;
use crate::view::export_story;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Turn a PDF or picture (local path or HTTP/HTTPS URL) into a story.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(StoryOutput)` when the submission resolved to a story, including the
/// degraded fallback story (check `output.stats.degraded`).
///
/// # Errors
/// - input could not be resolved (not found, unsupported type, download)
/// - the backend could not be set up
/// - [`StoryError::StoryFailed`] carrying the message a user would have seen
///
/// # Example
/// ```rust,no_run
/// use kiddopdf::{simplify, StoryConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StoryConfig::default(); // key from GEMINI_API_KEY
/// let output = simplify("lesson.pdf", &config).await?;
/// println!("{}", output.story);
/// # Ok(())
/// # }
/// ```
pub async fn simplify(
    input_str: impl AsRef<str>,
    config: &StoryConfig,
) -> Result<StoryOutput, StoryError> {
    let input_str = input_str.as_ref();
    info!("Starting story: {}", input_str);
    let candidate = input::resolve_input(input_str, config.download_timeout_secs).await?;
    run_once(candidate, config).await
}

/// Turn in-memory bytes into a story.
///
/// No temporary file is written; the bytes are encoded directly.
pub async fn simplify_bytes(
    name: impl Into<String>,
    bytes: impl Into<std::sync::Arc<[u8]>>,
    kind: DocumentKind,
    config: &StoryConfig,
) -> Result<StoryOutput, StoryError> {
    run_once(UploadCandidate::from_bytes(name, bytes, kind), config).await
}

/// Make a story and write it directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn simplify_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &StoryConfig,
) -> Result<StoryStats, StoryError> {
    let output = simplify(input_str, config).await?;
    export_story(&output.story, output_path).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`simplify`].
///
/// Creates a temporary tokio runtime internally.
pub fn simplify_sync(
    input_str: impl AsRef<str>,
    config: &StoryConfig,
) -> Result<StoryOutput, StoryError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StoryError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(simplify(input_str, config))
}

async fn run_once(candidate: UploadCandidate, config: &StoryConfig) -> Result<StoryOutput, StoryError> {
    let start = Instant::now();
    let pipeline = Pipeline::from_config(config)?;

    pipeline
        .select(candidate.clone())
        .map_err(|e| StoryError::Internal(e.to_string()))?;
    let result = pipeline
        .submit()
        .await
        .map_err(|e| StoryError::Internal(e.to_string()))?;

    let story = match result {
        GenerationResult::Success(text) => text,
        GenerationResult::Failure(message) => return Err(StoryError::StoryFailed { message }),
    };

    let output = StoryOutput::from_story(&candidate, story, start.elapsed());
    info!(
        "Story complete: {} chars from '{}' in {}ms",
        output.story.len(),
        output.stats.source_name,
        output.stats.duration_ms
    );
    Ok(output)
}
