//! Error types for the kiddopdf library.
//!
//! Four error types cover the four places something can go wrong:
//!
//! * [`StoryError`]: **Fatal** for one call of the convenience API or for
//!   one submission: bad input path, missing API key, failed download,
//!   failed export. Returned as `Err(StoryError)`.
//!
//! * [`EncodingError`]: the selected file could not be read or does not
//!   contain what its extension claims. Raised by
//!   [`crate::pipeline::encode::encode`] before any network traffic.
//!
//! * [`BackendError`]: the generation capability itself failed (timeout,
//!   rejected key, quota, unreadable response). Raised by a
//!   [`crate::pipeline::llm::GenerationBackend`].
//!
//! * [`TransitionError`]: the controller refused a transition, e.g. a
//!   second `submit()` while a story is still being generated.
//!
//! The controller never lets the first three escape: they are rendered to a
//! message and stored as `Resolved(Failure(..))` in the pipeline state.

use crate::candidate::DocumentKind;
use std::path::PathBuf;
use thiserror::Error;

/// Shown when a failure carries no description of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong while making the story.";

/// All fatal errors returned by the kiddopdf library.
#[derive(Debug, Error)]
pub enum StoryError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// The file is not a PDF, PNG or JPEG.
    #[error("Unsupported file '{name}': only PDF, PNG and JPG files can become stories")]
    UnsupportedFileType { name: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The candidate could not be turned into a payload.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    // ── Generation errors ─────────────────────────────────────────────────
    /// No API key was supplied. Raised before any network call.
    #[error("API key is missing. Please set {var} in your environment.")]
    MissingCredential { var: String },

    /// The generation call itself failed.
    #[error(transparent)]
    GenerationCall(#[from] BackendError),

    /// The configured provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A submission resolved to `Failure`; `message` is what the user saw.
    #[error("{message}")]
    StoryFailed { message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the exported story.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The candidate's bytes could not be read or do not match its declared type.
///
/// Encoding is atomic: when this is returned no payload exists.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The file disappeared between selection and submission.
    #[error("File not found: '{path}'. Was it moved or deleted?")]
    NotFound { path: PathBuf },

    /// The file exists but cannot be opened.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The read succeeded but produced zero bytes.
    #[error("'{name}' is empty, there is nothing to turn into a story")]
    Empty { name: String },

    /// Any other I/O failure while reading.
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes do not look like the declared file type.
    #[error("'{name}' was selected as {declared} but its content is not a valid {declared} file")]
    ContentMismatch { name: String, declared: DocumentKind },
}

/// Failure of the external generation capability.
///
/// `Display` is the description shown to the user, so [`BackendError::Timeout`]
/// renders as exactly `timeout`.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The request did not complete in time.
    #[error("timeout")]
    Timeout,

    /// The API rejected the credential (HTTP 401/403).
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Rate limit or quota exhausted (HTTP 429).
    #[error("quota exceeded: {message}")]
    Quota { message: String },

    /// Any other non-success HTTP status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Connection-level failure (DNS, TLS, reset).
    #[error("request failed: {0}")]
    Transport(String),

    /// Error reported by an edgequake-llm provider.
    #[error("{0}")]
    Provider(String),
}

/// A transition the state machine does not allow from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// A story is being generated; wait for it to finish.
    #[error("a story is already being made, please wait for it to finish")]
    Busy,

    /// `submit()` with nothing selected.
    #[error("no file selected")]
    NoCandidate,
}

/// Render an error as the single inline message the user sees.
pub fn user_message(err: &impl std::fmt::Display) -> String {
    let msg = err.to_string();
    if msg.trim().is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_is_bare() {
        assert_eq!(BackendError::Timeout.to_string(), "timeout");
        let e: StoryError = BackendError::Timeout.into();
        assert_eq!(e.to_string(), "timeout");
    }

    #[test]
    fn missing_credential_names_variable() {
        let e = StoryError::MissingCredential {
            var: "GEMINI_API_KEY".into(),
        };
        assert!(e.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn content_mismatch_display() {
        let e = EncodingError::ContentMismatch {
            name: "cat.png".into(),
            declared: DocumentKind::Png,
        };
        let msg = e.to_string();
        assert!(msg.contains("cat.png"), "got: {msg}");
        assert!(msg.contains("PNG"), "got: {msg}");
    }

    #[test]
    fn api_error_display() {
        let e = BackendError::Api {
            status: 500,
            message: "backend exploded".into(),
        };
        assert!(e.to_string().contains("500"));
        assert!(e.to_string().contains("backend exploded"));
    }

    #[test]
    fn empty_message_falls_back_to_generic() {
        let e = BackendError::Provider(String::new());
        assert_eq!(user_message(&e), GENERIC_FAILURE_MESSAGE);
        assert_eq!(user_message(&BackendError::Timeout), "timeout");
    }
}
