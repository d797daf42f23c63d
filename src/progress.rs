//! Stage-observer trait for extraction lifecycle events.
//!
//! Inject an [`Arc<dyn StageObserver>`] via
//! [`crate::Extractor::with_observer`] to be told about every state
//! transition of a request:
//!
//! ```text
//! Start → TypeDetected → Rasterized | LoadedDirectly → Normalized → Extracted → Done
//!   └──────────────┴─────────────┴──────────────────┴────────────┴──▶ Errored
//! ```
//!
//! # Example
//!
//! ```rust
//! use doc2text::{Stage, StageObserver};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder(Mutex<Vec<Stage>>);
//!
//! impl StageObserver for Recorder {
//!     fn on_stage(&self, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let observer: Arc<dyn StageObserver> = Arc::new(Recorder::default());
//! observer.on_stage(Stage::Start);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of one extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    TypeDetected,
    /// A PDF page was rendered.
    Rasterized,
    /// Image bytes were decoded without rendering.
    LoadedDirectly,
    Normalized,
    Extracted,
    Done,
    /// Absorbing failure state.
    Errored,
}

impl Stage {
    /// `true` for `Done` and `Errored`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Errored)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Start => "starting",
            Stage::TypeDetected => "type detected",
            Stage::Rasterized => "rasterised",
            Stage::LoadedDirectly => "image loaded",
            Stage::Normalized => "normalised",
            Stage::Extracted => "text extracted",
            Stage::Done => "done",
            Stage::Errored => "failed",
        };
        f.write_str(label)
    }
}

/// Called by the extractor as a request moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. One extractor may serve several threads at once,
/// hence `Send + Sync`.
pub trait StageObserver: Send + Sync {
    /// Called on entry to every stage, including `Done` and `Errored`.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once when a request fails.
    ///
    /// # Arguments
    /// * `last_stage` — the last stage reached before the failure
    /// * `reason`     — the user-facing failure message
    fn on_failure(&self, last_stage: Stage, reason: &str) {
        let _ = (last_stage, reason);
    }

    /// Called once when a request succeeds.
    ///
    /// # Arguments
    /// * `char_count` — number of characters in the recognised text
    fn on_success(&self, char_count: usize) {
        let _ = char_count;
    }
}

/// A no-op implementation, used when no observer is configured.
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// Convenience alias for the type stored in [`crate::Extractor`].
pub type SharedObserver = Arc<dyn StageObserver>;
