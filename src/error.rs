//! Error types for the chord analysis engine

use thiserror::Error;

/// Errors that can occur during chord analysis
///
/// Only [`AnalysisError::InvalidAudio`], [`AnalysisError::InvalidInput`] and
/// [`AnalysisError::ProcessingError`] ever escape [`crate::ChordEngine::analyze`].
/// Tempo and model failures are recovered inside the pipeline and reported
/// through the progression metadata instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The input signal cannot be analyzed (empty, shorter than one window, non-finite)
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    /// Invalid parameters supplied by the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No usable periodicity in the signal
    #[error("Tempo estimation failed: {0}")]
    TempoEstimation(String),

    /// The pretrained sequence model failed to load, failed, or timed out
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Internal processing error (e.g. a malformed timeline caught by validation)
    #[error("Processing error: {0}")]
    ProcessingError(String),

    /// Audio container decoding error
    #[error("Decoding error: {0}")]
    DecodingError(String),
}

impl AnalysisError {
    /// True for errors the pipeline recovers from locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::TempoEstimation(_) | AnalysisError::ModelUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AnalysisError::InvalidAudio("empty signal".to_string());
        assert_eq!(err.to_string(), "Invalid audio: empty signal");

        let err = AnalysisError::ModelUnavailable("timed out".to_string());
        assert_eq!(err.to_string(), "Model unavailable: timed out");
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(AnalysisError::TempoEstimation("flat".into()).is_recoverable());
        assert!(AnalysisError::ModelUnavailable("load".into()).is_recoverable());
        assert!(!AnalysisError::InvalidAudio("empty".into()).is_recoverable());
        assert!(!AnalysisError::ProcessingError("gap".into()).is_recoverable());
    }
}
