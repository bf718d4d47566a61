//! Result types: what a submission resolves to, and what the one-shot API
//! hands back.

use crate::candidate::{DocumentKind, UploadCandidate};
use crate::error::{user_message, StoryError};
use crate::prompts::{COMPLETION_PROOF_TITLE, FALLBACK_MESSAGE};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one generation.
///
/// A degraded success (the capability answered with nothing) is still
/// `Success`, carrying [`FALLBACK_MESSAGE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "lowercase")]
pub enum GenerationResult {
    /// Narrative Markdown, passed through verbatim.
    Success(String),
    /// The single inline message describing what went wrong.
    Failure(String),
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    /// True when the story is the fallback message.
    pub fn is_degraded(&self) -> bool {
        matches!(self, GenerationResult::Success(t) if t == FALLBACK_MESSAGE)
    }

    /// The story or the failure message.
    pub fn text(&self) -> &str {
        match self {
            GenerationResult::Success(t) | GenerationResult::Failure(t) => t,
        }
    }
}

impl From<Result<String, StoryError>> for GenerationResult {
    fn from(r: Result<String, StoryError>) -> Self {
        match r {
            Ok(text) => GenerationResult::Success(text),
            Err(e) => GenerationResult::Failure(user_message(&e)),
        }
    }
}

// ── Story outline ────────────────────────────────────────────────────────

/// Marker lines such as `--- PAGE 3 KI MAGIC KAHANI ---`, tolerating the
/// heading/bold decoration models like to add (`### **--- Page 3 ---**`).
static RE_PAGE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[ \t>#*_]*-{2,}[ \t*_]*PAGE[ \t]+\[?(\d+)\]?[^\n]*$")
        .expect("page marker regex is valid")
});

/// One page's part of the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSection {
    /// Page number as written in the marker.
    pub page: usize,
    /// The marker line itself.
    pub marker: String,
    /// Everything up to the next marker, trimmed.
    pub body: String,
}

/// The story split at its page markers.
///
/// Purely informational: nothing here checks the story for completeness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryOutline {
    /// Text before the first marker (the whole story when there are none).
    pub preamble: String,
    /// Sections in the order they appear.
    pub sections: Vec<PageSection>,
    /// Whether the closing completion-proof section is present.
    pub has_completion_proof: bool,
}

impl StoryOutline {
    pub fn parse(story: &str) -> Self {
        let markers: Vec<_> = RE_PAGE_MARKER.captures_iter(story).collect();
        let has_completion_proof = story
            .to_lowercase()
            .contains(&COMPLETION_PROOF_TITLE.to_lowercase());

        let Some(first) = markers.first().and_then(|c| c.get(0)) else {
            return Self {
                preamble: story.trim().to_string(),
                sections: Vec::new(),
                has_completion_proof,
            };
        };

        let mut sections = Vec::with_capacity(markers.len());
        for (i, caps) in markers.iter().enumerate() {
            let (Some(whole), Some(num)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = markers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(story.len());
            sections.push(PageSection {
                page: num.as_str().parse().unwrap_or(0),
                marker: whole.as_str().trim().to_string(),
                body: story[whole.end()..end].trim().to_string(),
            });
        }

        Self {
            preamble: story[..first.start()].trim().to_string(),
            sections,
            has_completion_proof,
        }
    }

    /// Page numbers in order of appearance.
    pub fn pages(&self) -> Vec<usize> {
        self.sections.iter().map(|s| s.page).collect()
    }
}

// ── One-shot output ──────────────────────────────────────────────────────

/// Figures about one completed conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryStats {
    pub source_name: String,
    pub kind: DocumentKind,
    pub source_bytes: u64,
    pub duration_ms: u64,
    /// The capability returned nothing and the fallback message was used.
    pub degraded: bool,
}

/// Returned by [`crate::convert::simplify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryOutput {
    /// The story Markdown, exactly as generated.
    pub story: String,
    pub outline: StoryOutline,
    pub stats: StoryStats,
}

impl StoryOutput {
    /// Package a finished story with its outline and the candidate's stats.
    pub fn from_story(candidate: &UploadCandidate, story: String, elapsed: Duration) -> Self {
        let stats = StoryStats {
            source_name: candidate.name().to_string(),
            kind: candidate.kind(),
            source_bytes: candidate.size_bytes(),
            duration_ms: elapsed.as_millis() as u64,
            degraded: story == FALLBACK_MESSAGE,
        };
        Self {
            outline: StoryOutline::parse(&story),
            story,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_splits_on_markers_in_order() {
        let story = "# Kahani Time 🌈\n\n\
            --- PAGE 1 KI MAGIC KAHANI ---\nEk chhota sa tiger tha 🐯\n\n\
            --- PAGE 2 KI MAGIC KAHANI ---\nTiger ne apple khaya 🍎\n\n\
            ## Magic Completion Proof ✅\nMaine content ka ek-ek word...";
        let o = StoryOutline::parse(story);

        assert_eq!(o.preamble, "# Kahani Time 🌈");
        assert_eq!(o.pages(), vec![1, 2]);
        assert_eq!(o.sections[0].body, "Ek chhota sa tiger tha 🐯");
        assert!(o.sections[1].body.starts_with("Tiger ne apple khaya"));
        assert!(o.sections[1].body.contains("Completion Proof"));
        assert!(o.has_completion_proof);
    }

    #[test]
    fn outline_tolerates_decorated_markers() {
        let story = "### **--- Page 4 KI MAGIC KAHANI ---**\nabc\n> --- PAGE [5] KI MAGIC KAHANI ---\ndef";
        let o = StoryOutline::parse(story);
        assert_eq!(o.pages(), vec![4, 5]);
        assert_eq!(o.sections[0].body, "abc");
        assert_eq!(o.sections[1].body, "def");
        assert!(!o.has_completion_proof);
    }

    #[test]
    fn outline_without_markers_is_all_preamble() {
        let o = StoryOutline::parse("  Ek photo mein ek billi hai 🐱  ");
        assert!(o.sections.is_empty());
        assert_eq!(o.preamble, "Ek photo mein ek billi hai 🐱");
    }

    #[test]
    fn result_from_error_uses_message() {
        let r: GenerationResult = Err(StoryError::StoryFailed {
            message: "timeout".into(),
        })
        .into();
        assert_eq!(r, GenerationResult::Failure("timeout".into()));
        assert_eq!(r.text(), "timeout");
        assert!(!r.is_success());
    }

    #[test]
    fn degraded_detection() {
        assert!(GenerationResult::Success(FALLBACK_MESSAGE.into()).is_degraded());
        assert!(!GenerationResult::Success("story".into()).is_degraded());
        assert!(!GenerationResult::Failure(FALLBACK_MESSAGE.into()).is_degraded());
    }

    #[test]
    fn result_serialises_tagged() {
        let json = serde_json::to_string(&GenerationResult::Success("hi".into())).unwrap();
        assert_eq!(json, r#"{"status":"success","text":"hi"}"#);
    }

    #[test]
    fn from_story_fills_stats_from_candidate() {
        let candidate = UploadCandidate::from_bytes("tiger.png", vec![0u8; 2048], DocumentKind::Png);
        let out = StoryOutput::from_story(
            &candidate,
            "--- PAGE 1 KI MAGIC KAHANI ---\nEk tiger 🐯".to_string(),
            Duration::from_millis(1500),
        );
        assert_eq!(out.stats.source_name, "tiger.png");
        assert_eq!(out.stats.kind, DocumentKind::Png);
        assert_eq!(out.stats.source_bytes, 2048);
        assert_eq!(out.stats.duration_ms, 1500);
        assert!(!out.stats.degraded);
        assert_eq!(out.outline.pages(), vec![1]);

        let fallback = StoryOutput::from_story(&candidate, FALLBACK_MESSAGE.to_string(), Duration::ZERO);
        assert!(fallback.stats.degraded);
    }
}
