//! Ensemble selection between chord detectors
//!
//! Each detector reports a `DetectorOutput`. Per frame, the selector resolves
//! the two candidate streams with these rules, in order:
//!
//! 1. Only one detector available: use it
//! 2. Same label: keep it with the higher confidence
//! 3. A no-chord candidate displaces a chord only when its confidence exceeds
//!    the acceptance threshold and it also wins rule 4
//! 4. Otherwise the higher confidence wins; ties go to the model
//!
//! Model candidates may sit on a different frame grid; each chroma frame
//! takes the model candidate nearest in time.

use super::chord::ChordLabel;
use crate::error::AnalysisError;
use crate::features::chords::{CandidateSource, RawChordCandidate};
use serde::{Deserialize, Serialize};

/// Output of one detector
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorOutput {
    /// Template correlation candidates
    Correlation(Vec<RawChordCandidate>),
    /// Pretrained model candidates
    PretrainedModel(Vec<RawChordCandidate>),
    /// Detector disabled, failed or timed out
    Unavailable {
        /// Which detector
        source: CandidateSource,
        /// Why
        reason: String,
    },
}

impl DetectorOutput {
    /// Candidates, or `None` when unavailable or empty
    pub fn candidates(&self) -> Option<&[RawChordCandidate]> {
        match self {
            DetectorOutput::Correlation(c) | DetectorOutput::PretrainedModel(c) if !c.is_empty() => {
                Some(c.as_slice())
            }
            _ => None,
        }
    }

    /// Whether the detector contributed candidates
    pub fn is_available(&self) -> bool {
        self.candidates().is_some()
    }

    /// Short name for metadata
    pub fn method_name(&self) -> &'static str {
        match self {
            DetectorOutput::Correlation(_) => "template-correlation",
            DetectorOutput::PretrainedModel(_) => "pretrained-model",
            DetectorOutput::Unavailable { source, .. } => match source {
                CandidateSource::Correlation => "template-correlation",
                CandidateSource::Model => "pretrained-model",
            },
        }
    }
}

/// Canonical label for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameLabel {
    /// Frame time in seconds
    pub time: f32,
    /// Selected label
    pub label: ChordLabel,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

/// Per-frame arbitration between the correlation detector and the model
#[derive(Debug, Clone, Copy)]
pub struct EnsembleSelector {
    acceptance_threshold: f32,
}

impl EnsembleSelector {
    /// Create a selector
    pub fn new(acceptance_threshold: f32) -> Self {
        Self {
            acceptance_threshold,
        }
    }

    /// Resolve one frame
    ///
    /// Returns `None` only when neither candidate is present.
    pub fn arbitrate(
        &self,
        correlation: Option<&RawChordCandidate>,
        model: Option<&RawChordCandidate>,
    ) -> Option<(ChordLabel, f32)> {
        let (c, m) = match (correlation, model) {
            (None, None) => return None,
            (Some(only), None) | (None, Some(only)) => return Some((only.label, only.score)),
            (Some(c), Some(m)) => (c, m),
        };

        if c.label == m.label {
            return Some((c.label, c.score.max(m.score)));
        }

        // Higher confidence wins, ties go to the model
        let model_wins = m.score >= c.score;
        let (winner, loser) = if model_wins { (m, c) } else { (c, m) };

        if winner.label.is_no_chord() && winner.score <= self.acceptance_threshold {
            return Some((loser.label, loser.score));
        }
        Some((winner.label, winner.score))
    }

    /// Select one label per chroma frame
    ///
    /// # Arguments
    ///
    /// * `frame_times` - Chroma frame times in seconds, ascending
    /// * `correlation` - Correlation detector output
    /// * `model` - Model output
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ProcessingError` if neither detector produced
    /// candidates for a non-empty frame sequence
    pub fn select(
        &self,
        frame_times: &[f32],
        correlation: &DetectorOutput,
        model: &DetectorOutput,
    ) -> Result<Vec<FrameLabel>, AnalysisError> {
        if frame_times.is_empty() {
            return Ok(Vec::new());
        }

        let corr = correlation.candidates().map(|c| align_to_frames(c, frame_times));
        let modl = model.candidates().map(|c| align_to_frames(c, frame_times));

        match (&corr, &modl) {
            (None, None) => {
                return Err(AnalysisError::ProcessingError(
                    "No chord detector produced candidates".to_string(),
                ))
            }
            (Some(_), None) | (None, Some(_)) => {
                log::debug!("Ensemble running in single-detector mode");
            }
            _ => {}
        }

        let mut disagreements = 0usize;
        let labels: Vec<FrameLabel> = frame_times
            .iter()
            .enumerate()
            .map(|(i, &time)| {
                let c = corr.as_ref().and_then(|v| v[i]);
                let m = modl.as_ref().and_then(|v| v[i]);
                if let (Some(c), Some(m)) = (c, m) {
                    if c.label != m.label {
                        disagreements += 1;
                    }
                }
                let (label, confidence) = self
                    .arbitrate(c, m)
                    .unwrap_or((ChordLabel::NoChord, 0.0));
                FrameLabel {
                    time,
                    label,
                    confidence: confidence.clamp(0.0, 1.0),
                }
            })
            .collect();

        log::debug!(
            "Ensemble selected {} frame labels ({} disagreements)",
            frame_times.len(),
            disagreements
        );
        Ok(labels)
    }
}

/// For each frame time, the candidate nearest in time
///
/// `frame_times` must be ascending. Candidates may arrive in any order; they
/// are sorted by time first, keeping their order on equal times. Returns all
/// `None` for an empty candidate list.
pub fn align_to_frames<'a>(
    candidates: &'a [RawChordCandidate],
    frame_times: &[f32],
) -> Vec<Option<&'a RawChordCandidate>> {
    if candidates.is_empty() {
        return vec![None; frame_times.len()];
    }
    let mut sorted: Vec<&'a RawChordCandidate> = candidates.iter().collect();
    sorted.sort_by(|a, b| {
        a.frame_time
            .partial_cmp(&b.frame_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut j = 0usize;
    frame_times
        .iter()
        .map(|&t| {
            while j + 1 < sorted.len()
                && (sorted[j + 1].frame_time - t).abs() <= (sorted[j].frame_time - t).abs()
            {
                j += 1;
            }
            Some(sorted[j])
        })
        .collect()
}
