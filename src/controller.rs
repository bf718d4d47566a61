//! Pipeline controller: the select → submit → resolve state machine.
//!
//! ```text
//! Idle ──select──▶ HasCandidate ──submit──▶ Processing ──▶ Resolved(Success | Failure)
//!  ▲                 │  ▲  │select                            │ select / submit (retry)
//!  └──────clear──────┘  │  └────────────────────────┐         │ clear → Idle
//!                       └───────────────────────────┴─────────┘
//! ```
//!
//! All mutation goes through the transition methods, which take the state
//! lock only long enough to check and swap the variant. The lock is never
//! held across the generation call, so other tasks can read the state (and
//! see `Processing`) while a story is being made. A second `submit()` during
//! that time is rejected with [`TransitionError::Busy`] and does nothing:
//! that rejection is the single-flight guard.
//!
//! Every failure inside a submission (unreadable file, missing key, API
//! error) is caught here and stored as `Resolved(Failure(message))`.

use crate::candidate::UploadCandidate;
use crate::config::{Credential, StoryConfig};
use crate::error::{user_message, StoryError, TransitionError};
use crate::output::GenerationResult;
use crate::pipeline::{encode, llm::GenerationClient, resolve_backend};
use crate::progress::ProgressCallback;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Stored when an in-flight submission's future is dropped before it resolves.
pub const ABANDONED_MESSAGE: &str = "The story was stopped before it finished.";

/// The single active state of a pipeline.
#[derive(Debug, Clone)]
pub enum PipelineState {
    /// Nothing selected.
    Idle,
    /// A file is selected and ready to submit.
    HasCandidate(UploadCandidate),
    /// A story is being generated for this file.
    Processing(UploadCandidate),
    /// The last submission finished. The candidate is kept for a retry.
    Resolved {
        candidate: UploadCandidate,
        result: GenerationResult,
    },
}

/// Fieldless mirror of [`PipelineState`] for cheap comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Idle,
    HasCandidate,
    Processing,
    Resolved,
}

impl PipelineState {
    pub fn kind(&self) -> StateKind {
        match self {
            PipelineState::Idle => StateKind::Idle,
            PipelineState::HasCandidate(_) => StateKind::HasCandidate,
            PipelineState::Processing(_) => StateKind::Processing,
            PipelineState::Resolved { .. } => StateKind::Resolved,
        }
    }

    pub fn candidate(&self) -> Option<&UploadCandidate> {
        match self {
            PipelineState::Idle => None,
            PipelineState::HasCandidate(c) | PipelineState::Processing(c) => Some(c),
            PipelineState::Resolved { candidate, .. } => Some(candidate),
        }
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match self {
            PipelineState::Resolved { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, PipelineState::Processing(_))
    }
}

/// One pipeline instance. Instances share nothing with each other.
pub struct Pipeline {
    state: Mutex<PipelineState>,
    client: GenerationClient,
    credential: Credential,
    observer: Option<ProgressCallback>,
}

impl Pipeline {
    pub fn new(client: GenerationClient, credential: Credential) -> Self {
        Self {
            state: Mutex::new(PipelineState::Idle),
            client,
            credential,
            observer: None,
        }
    }

    /// Build a pipeline from configuration: backend, instruction, timeout,
    /// credential and observer.
    pub fn from_config(config: &StoryConfig) -> Result<Self, StoryError> {
        let backend = resolve_backend(config)?;
        let client = GenerationClient::new(backend, config.instruction())
            .with_credential_var(config.credential_var())
            .with_timeout(config.api_timeout_secs.map(Duration::from_secs));
        let mut pipeline = Self::new(client, config.resolve_credential());
        pipeline.observer = config.observer.clone();
        Ok(pipeline)
    }

    pub fn with_observer(mut self, observer: ProgressCallback) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PipelineState {
        self.lock().clone()
    }

    pub fn kind(&self) -> StateKind {
        self.lock().kind()
    }

    /// Select a file, replacing any previous candidate and discarding any
    /// previous result.
    pub fn select(&self, candidate: UploadCandidate) -> Result<(), TransitionError> {
        let next = {
            let mut state = self.lock();
            if state.is_processing() {
                debug!("select() rejected: generation in flight");
                return Err(TransitionError::Busy);
            }
            info!(
                "Selected {} '{}' ({})",
                candidate.kind(),
                candidate.name(),
                candidate.size_label()
            );
            *state = PipelineState::HasCandidate(candidate);
            state.clone()
        };
        self.notify(&next);
        Ok(())
    }

    /// Drop the candidate (and any result) and return to `Idle`.
    pub fn clear(&self) -> Result<(), TransitionError> {
        {
            let mut state = self.lock();
            match state.kind() {
                StateKind::Processing => return Err(TransitionError::Busy),
                StateKind::Idle => return Ok(()),
                StateKind::HasCandidate | StateKind::Resolved => {}
            }
            debug!("Clearing {:?}", state.kind());
            *state = PipelineState::Idle;
        }
        self.notify(&PipelineState::Idle);
        Ok(())
    }

    /// Encode the candidate, generate its story and resolve.
    ///
    /// From `Resolved`, this re-runs the retained candidate. Returns
    /// [`TransitionError::Busy`] without side effects while another
    /// submission is in flight, and [`TransitionError::NoCandidate`] from
    /// `Idle`.
    pub async fn submit(&self) -> Result<GenerationResult, TransitionError> {
        let candidate = {
            let mut state = self.lock();
            let candidate = match &*state {
                PipelineState::Idle => return Err(TransitionError::NoCandidate),
                PipelineState::Processing(_) => {
                    debug!("submit() rejected: generation in flight");
                    return Err(TransitionError::Busy);
                }
                PipelineState::HasCandidate(c) | PipelineState::Resolved { candidate: c, .. } => {
                    c.clone()
                }
            };
            *state = PipelineState::Processing(candidate.clone());
            candidate
        };
        self.notify(&PipelineState::Processing(candidate.clone()));

        let mut in_flight = InFlight {
            pipeline: self,
            candidate: Some(candidate.clone()),
        };
        let result = self.run(&candidate).await;
        in_flight.resolve(result.clone());
        Ok(result)
    }

    async fn run(&self, candidate: &UploadCandidate) -> GenerationResult {
        let start = Instant::now();
        info!("Making a story from '{}'", candidate.name());

        let payload = match encode::encode(candidate).await {
            Ok(p) => p,
            Err(e) => {
                warn!("Encoding '{}' failed: {}", candidate.name(), e);
                return GenerationResult::Failure(user_message(&e));
            }
        };

        if let Some(ref obs) = self.observer {
            obs.on_generation_start(candidate.name(), payload.mime_type(), payload.data().len());
        }
        let outcome = self
            .client
            .try_generate(&payload, self.credential.expose())
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if let Some(ref obs) = self.observer {
            obs.on_generation_complete(elapsed_ms, outcome.is_ok());
        }

        match outcome {
            Ok(story) => {
                info!("Story ready for '{}' in {}ms", candidate.name(), elapsed_ms);
                GenerationResult::Success(story)
            }
            Err(e) => {
                warn!("Story for '{}' failed: {}", candidate.name(), e);
                GenerationResult::Failure(user_message(&e))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, state: &PipelineState) {
        if let Some(ref obs) = self.observer {
            obs.on_state_change(state);
        }
    }
}

/// Owns the `Processing` state for one submission.
///
/// If the submitting future is dropped mid-flight, `Drop` resolves the
/// pipeline with [`ABANDONED_MESSAGE`] so it never stays stuck in
/// `Processing`.
struct InFlight<'a> {
    pipeline: &'a Pipeline,
    candidate: Option<UploadCandidate>,
}

impl InFlight<'_> {
    fn resolve(&mut self, result: GenerationResult) {
        let Some(candidate) = self.candidate.take() else {
            return;
        };
        let next = PipelineState::Resolved { candidate, result };
        *self.pipeline.lock() = next.clone();
        self.pipeline.notify(&next);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.candidate.is_some() {
            warn!("Submission dropped before it resolved");
            self.resolve(GenerationResult::Failure(ABANDONED_MESSAGE.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::DocumentKind;
    use crate::error::BackendError;
    use crate::pipeline::llm::{Generation, GenerationBackend, GenerationRequest};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl GenerationBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
            _credential: &str,
        ) -> Result<Generation, BackendError> {
            Ok(Generation::text(format!("story of {}", request.payload().mime_type())))
        }
    }

    fn pipeline(key: &str) -> Pipeline {
        let client = GenerationClient::new(Arc::new(Echo), "instr");
        Pipeline::new(client, Credential::new(key))
    }

    fn png(name: &str) -> UploadCandidate {
        UploadCandidate::from_bytes(name, b"\x89PNG\r\n\x1a\nrest".to_vec(), DocumentKind::Png)
    }

    #[test]
    fn starts_idle() {
        assert_eq!(pipeline("k").kind(), StateKind::Idle);
    }

    #[test]
    fn select_and_clear() {
        let p = pipeline("k");
        p.select(png("a.png")).unwrap();
        assert_eq!(p.kind(), StateKind::HasCandidate);
        p.select(png("b.png")).unwrap();
        assert_eq!(p.state().candidate().unwrap().name(), "b.png");
        p.clear().unwrap();
        assert_eq!(p.kind(), StateKind::Idle);
        p.clear().unwrap();
        assert_eq!(p.kind(), StateKind::Idle);
    }

    #[tokio::test]
    async fn submit_from_idle_is_rejected() {
        let p = pipeline("k");
        assert_eq!(p.submit().await, Err(TransitionError::NoCandidate));
        assert_eq!(p.kind(), StateKind::Idle);
    }

    #[tokio::test]
    async fn submit_resolves_success() {
        let p = pipeline("k");
        p.select(png("a.png")).unwrap();
        let r = p.submit().await.unwrap();
        assert_eq!(r, GenerationResult::Success("story of image/png".into()));
        assert_eq!(p.state().result(), Some(&r));
    }

    #[tokio::test]
    async fn encoding_error_resolves_failure() {
        let p = pipeline("k");
        p.select(UploadCandidate::from_bytes("e.pdf", Vec::<u8>::new(), DocumentKind::Pdf))
            .unwrap();
        let r = p.submit().await.unwrap();
        assert!(!r.is_success());
        assert!(r.text().contains("empty"), "got: {}", r.text());
        assert_eq!(p.kind(), StateKind::Resolved);
    }

    #[tokio::test]
    async fn missing_key_resolves_failure() {
        let p = pipeline("");
        p.select(png("a.png")).unwrap();
        let r = p.submit().await.unwrap();
        assert!(r.text().contains("GEMINI_API_KEY"), "got: {}", r.text());
    }

    #[tokio::test]
    async fn completed_submit_resolves_exactly_once() {
        struct Resolutions(std::sync::Mutex<Vec<GenerationResult>>);

        impl crate::progress::PipelineObserver for Resolutions {
            fn on_state_change(&self, state: &PipelineState) {
                if let Some(r) = state.result() {
                    self.0.lock().unwrap().push(r.clone());
                }
            }
        }

        let seen = Arc::new(Resolutions(std::sync::Mutex::new(Vec::new())));
        let p = pipeline("k").with_observer(seen.clone());
        p.select(png("a.png")).unwrap();
        let r = p.submit().await.unwrap();

        assert_eq!(*seen.0.lock().unwrap(), vec![r.clone()]);
        assert_ne!(r, GenerationResult::Failure(ABANDONED_MESSAGE.to_string()));
        assert_eq!(p.state().result(), Some(&r));
    }

    #[tokio::test]
    async fn resolved_can_retry_and_clear() {
        let p = pipeline("k");
        p.select(png("a.png")).unwrap();
        p.submit().await.unwrap();
        let again = p.submit().await.unwrap();
        assert!(again.is_success());
        p.clear().unwrap();
        assert_eq!(p.kind(), StateKind::Idle);
    }
}
