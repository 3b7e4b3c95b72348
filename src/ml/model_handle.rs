//! Lazily initialized model handle
//!
//! A `ModelHandle` owns a loader and runs it at most once; the outcome
//! (model or load error) is cached for every later request. Handles are
//! passed to the engine explicitly; `ModelHandle::shared()` is the
//! process-wide handle for the bundled model.

use super::sequence_model::{ChordSequenceModel, HmmChordModel};
use crate::error::AnalysisError;
use crate::features::chords::RawChordCandidate;
use crate::features::chroma::ChromaFrame;
use crossbeam_channel::RecvTimeoutError;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

type LoadResult = Result<Arc<dyn ChordSequenceModel>, AnalysisError>;
type Loader = Box<dyn Fn() -> LoadResult + Send + Sync>;

/// Load-once handle to a chord sequence model
pub struct ModelHandle {
    loader: Loader,
    model: OnceLock<LoadResult>,
}

impl ModelHandle {
    /// Handle around an arbitrary loader
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> LoadResult + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            model: OnceLock::new(),
        }
    }

    /// Handle for the bundled HMM model
    pub fn pretrained() -> Self {
        Self::new(|| Ok(Arc::new(HmmChordModel::pretrained()) as Arc<dyn ChordSequenceModel>))
    }

    /// Handle that loads HMM weights from a JSON file on first use
    pub fn from_weights_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(move || {
            HmmChordModel::from_json_file(&path).map(|m| Arc::new(m) as Arc<dyn ChordSequenceModel>)
        })
    }

    /// Handle around an already constructed model
    pub fn from_model(model: Arc<dyn ChordSequenceModel>) -> Self {
        Self::new(move || Ok(Arc::clone(&model)))
    }

    /// Process-wide handle for the bundled model
    pub fn shared() -> Arc<ModelHandle> {
        static SHARED: OnceLock<Arc<ModelHandle>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(ModelHandle::pretrained())))
    }

    /// The model, loading it on first call
    ///
    /// # Errors
    ///
    /// Returns the cached load error on every call once loading failed
    pub fn get(&self) -> LoadResult {
        self.model
            .get_or_init(|| {
                log::debug!("Initializing chord sequence model");
                let result = (self.loader)();
                if let Err(e) = &result {
                    log::warn!("Chord sequence model failed to load: {}", e);
                }
                result
            })
            .clone()
    }

    /// Whether the loader has already run
    pub fn is_initialized(&self) -> bool {
        self.model.get().is_some()
    }

    /// Load the model if needed and label `frames`, bounded by `timeout`
    pub fn label_frames(
        &self,
        frames: &[ChromaFrame],
        timeout: Option<Duration>,
    ) -> Result<Vec<RawChordCandidate>, AnalysisError> {
        let model = self.get()?;
        run_with_timeout(model, frames, timeout)
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.model.get() {
            None => "uninitialized".to_string(),
            Some(Ok(model)) => format!("loaded({})", model.name()),
            Some(Err(e)) => format!("failed({})", e),
        };
        f.debug_struct("ModelHandle").field("state", &state).finish()
    }
}

/// Run a model, giving up after `timeout`
///
/// Without a timeout the model runs on the calling thread. With one it runs
/// on a worker thread; on timeout the worker is detached and its result is
/// discarded.
///
/// # Errors
///
/// Returns `AnalysisError::ModelUnavailable` on timeout or if the worker
/// exits without a result, and passes through the model's own errors
pub fn run_with_timeout(
    model: Arc<dyn ChordSequenceModel>,
    frames: &[ChromaFrame],
    timeout: Option<Duration>,
) -> Result<Vec<RawChordCandidate>, AnalysisError> {
    let timeout = match timeout {
        Some(t) => t,
        None => return model.label_frames(frames),
    };

    let name = model.name().to_string();
    let (tx, rx) = crossbeam_channel::bounded(1);
    let frames = frames.to_vec();

    std::thread::Builder::new()
        .name("chord-model".to_string())
        .spawn(move || {
            // Receiver may be gone after a timeout
            let _ = tx.send(model.label_frames(&frames));
        })
        .map_err(|e| AnalysisError::ModelUnavailable(format!("failed to spawn model worker: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(AnalysisError::ModelUnavailable(format!(
            "{} timed out after {} ms",
            name,
            timeout.as_millis()
        ))),
        Err(RecvTimeoutError::Disconnected) => Err(AnalysisError::ModelUnavailable(format!(
            "{} worker exited without a result",
            name
        ))),
    }
}
