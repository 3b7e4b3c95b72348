//! Chord detection modules
//!
//! - Template bank (one binary pitch-class mask per root and quality)
//! - Correlation detector (cosine similarity against the bank)

pub mod correlation;
pub mod templates;

pub use correlation::CorrelationDetector;
pub use templates::{ChordTemplate, TemplateBank};

use crate::analysis::chord::ChordLabel;
use serde::{Deserialize, Serialize};

/// Which detector produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateSource {
    /// Template correlation
    Correlation,
    /// Pretrained sequence model
    Model,
}

/// A per-frame chord hypothesis from one detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawChordCandidate {
    /// Frame time in seconds
    pub frame_time: f32,
    /// Hypothesized label (may be `NoChord`)
    pub label: ChordLabel,
    /// Detector score in [0, 1]
    pub score: f32,
    /// Producing detector
    pub source: CandidateSource,
}

impl RawChordCandidate {
    /// Create a candidate, clamping the score to [0, 1]
    pub fn new(frame_time: f32, label: ChordLabel, score: f32, source: CandidateSource) -> Self {
        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            frame_time,
            label,
            score,
            source,
        }
    }
}
