//! Observer trait for pipeline events.
//!
//! Inject an [`Arc<dyn PipelineObserver>`] via
//! [`crate::config::StoryConfigBuilder::observer`] (or
//! [`crate::controller::Pipeline::with_observer`]) to hear about every state
//! transition and about the generation call itself. The CLI uses this to
//! swap between its confirm line, its spinner and the final story.
//!
//! # Example
//!
//! ```rust
//! use kiddopdf::{PipelineObserver, PipelineState, StoryConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     transitions: AtomicUsize,
//! }
//!
//! impl PipelineObserver for CountingObserver {
//!     fn on_state_change(&self, _state: &PipelineState) {
//!         self.transitions.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let observer = Arc::new(CountingObserver { transitions: AtomicUsize::new(0) });
//!
//! let config = StoryConfig::builder()
//!     .observer(observer as Arc<dyn PipelineObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::controller::PipelineState;
use std::sync::Arc;

/// Called by the pipeline as a submission progresses.
///
/// All methods have default no-op implementations. Calls are made without
/// the pipeline's state lock held, so implementations may query the pipeline.
pub trait PipelineObserver: Send + Sync {
    /// Called after every successful transition with the new state.
    fn on_state_change(&self, state: &PipelineState) {
        let _ = state;
    }

    /// Called right before the request is sent.
    ///
    /// # Arguments
    /// * `name`       : display name of the candidate
    /// * `mime_type`  : declared media type of the payload
    /// * `payload_len`: length of the base64 payload in bytes
    fn on_generation_start(&self, name: &str, mime_type: &str, payload_len: usize) {
        let _ = (name, mime_type, payload_len);
    }

    /// Called when the request returns, whatever the outcome.
    fn on_generation_complete(&self, elapsed_ms: u64, success: bool) {
        let _ = (elapsed_ms, success);
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::StoryConfig`].
pub type ProgressCallback = Arc<dyn PipelineObserver>;
