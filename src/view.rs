//! Presentation adapter: one view per pipeline state.
//!
//! Front-ends never look at [`PipelineState`] directly; they render the
//! [`View`] derived from it. Story text is handed through verbatim for
//! Markdown rendering.

use crate::candidate::DocumentKind;
use crate::controller::PipelineState;
use crate::error::StoryError;
use crate::output::{GenerationResult, StoryOutline};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Headline shown while nothing is selected.
pub const IDLE_PROMPT: &str = "Drop a PDF or picture here to make it a story!";

/// Shown while a story is being generated.
pub const PROCESSING_MESSAGE: &str = "The magic is happening... 🪄";

/// The four screens a user can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    IdlePrompt,
    ConfirmCandidate,
    ProcessingIndicator,
    ResultOrError,
}

/// What to render for the current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    IdlePrompt,
    ConfirmCandidate {
        name: String,
        kind: DocumentKind,
        size_label: String,
    },
    Processing {
        name: String,
    },
    Story {
        markdown: String,
        outline: StoryOutline,
        degraded: bool,
    },
    Error {
        message: String,
    },
}

impl View {
    pub fn from_state(state: &PipelineState) -> Self {
        match state {
            PipelineState::Idle => View::IdlePrompt,
            PipelineState::HasCandidate(c) => View::ConfirmCandidate {
                name: c.name().to_string(),
                kind: c.kind(),
                size_label: c.size_label(),
            },
            PipelineState::Processing(c) => View::Processing {
                name: c.name().to_string(),
            },
            PipelineState::Resolved { result, .. } => match result {
                GenerationResult::Success(text) => View::Story {
                    outline: StoryOutline::parse(text),
                    degraded: result.is_degraded(),
                    markdown: text.clone(),
                },
                GenerationResult::Failure(message) => View::Error {
                    message: message.clone(),
                },
            },
        }
    }

    pub fn kind(&self) -> ViewKind {
        match self {
            View::IdlePrompt => ViewKind::IdlePrompt,
            View::ConfirmCandidate { .. } => ViewKind::ConfirmCandidate,
            View::Processing { .. } => ViewKind::ProcessingIndicator,
            View::Story { .. } | View::Error { .. } => ViewKind::ResultOrError,
        }
    }

    /// Print/export is offered only for a story.
    pub fn can_print(&self) -> bool {
        matches!(self, View::Story { .. })
    }

    /// Whether a "make the story" action makes sense here.
    pub fn can_submit(&self) -> bool {
        matches!(
            self,
            View::ConfirmCandidate { .. } | View::Story { .. } | View::Error { .. }
        )
    }

    /// Single-line plain-text rendering for terminals and logs.
    pub fn headline(&self) -> String {
        match self {
            View::IdlePrompt => IDLE_PROMPT.to_string(),
            View::ConfirmCandidate {
                name,
                kind,
                size_label,
            } => format!("{} {} ({}) is ready. Make it a story!", kind_icon(*kind), name, size_label),
            View::Processing { .. } => PROCESSING_MESSAGE.to_string(),
            View::Story { outline, .. } => match outline.sections.len() {
                0 => "Your story is ready! 🎉".to_string(),
                n => format!("Your story is ready! 🎉 ({n} pages)"),
            },
            View::Error { message } => error_banner(message),
        }
    }
}

/// Icon shown next to a candidate of this kind.
pub fn kind_icon(kind: DocumentKind) -> &'static str {
    if kind.is_image() {
        "🖼️"
    } else {
        "📄"
    }
}

/// Inline failure text: `Oops! <message>`.
pub fn error_banner(message: &str) -> String {
    format!("Oops! {message}")
}

/// Write the story to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn export_story(markdown: &str, path: impl AsRef<Path>) -> Result<(), StoryError> {
    let path = path.as_ref();
    let write_err = |e| StoryError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Exported {} bytes to {}", markdown.len(), path.display());
    Ok(())
}
