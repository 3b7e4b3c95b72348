//! Pretrained chord sequence model
//!
//! `ChordSequenceModel` is the seam for any learned back-end that labels a
//! chroma sequence. The bundled implementation is an HMM over the template
//! bank plus a no-chord state, decoded with Viterbi:
//!
//! - emission: softmax of template cosine scores at a fixed temperature, with
//!   the no-chord state scoring a constant
//! - transition: a single self-transition probability, the rest spread
//!   uniformly over the other states
//!
//! The per-frame score reported is the emission posterior of the decoded
//! state, so a frame forced onto a chord by the transition prior carries a
//! low score.

use crate::analysis::chord::{ChordLabel, ChordQuality};
use crate::error::AnalysisError;
use crate::features::chords::correlation::CorrelationDetector;
use crate::features::chords::templates::TemplateBank;
use crate::features::chords::{CandidateSource, RawChordCandidate};
use crate::features::chroma::ChromaFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A detector that labels a whole chroma sequence at once
pub trait ChordSequenceModel: Send + Sync {
    /// Short identifier for logs and metadata
    fn name(&self) -> &str;

    /// Label every frame
    ///
    /// Implementations return candidates stamped with `frame_time` and with
    /// `source` set to `CandidateSource::Model`. Order and grid are free; each
    /// chroma frame takes the candidate nearest in time.
    fn label_frames(&self, frames: &[ChromaFrame]) -> Result<Vec<RawChordCandidate>, AnalysisError>;
}

/// HMM parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmmWeights {
    /// Probability of staying in the same state between frames
    pub self_transition: f32,

    /// Softmax temperature applied to cosine scores
    pub temperature: f32,

    /// Score of the no-chord state
    pub no_chord_score: f32,

    /// Chord qualities in the state space
    pub qualities: Vec<ChordQuality>,
}

impl Default for HmmWeights {
    fn default() -> Self {
        Self {
            self_transition: 0.99,
            temperature: 0.05,
            no_chord_score: 0.5,
            qualities: ChordQuality::ALL.to_vec(),
        }
    }
}

impl HmmWeights {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.self_transition > 0.0 && self.self_transition < 1.0) {
            return Err(AnalysisError::ModelUnavailable(format!(
                "self_transition must be in (0, 1), got {}",
                self.self_transition
            )));
        }
        if !(self.temperature > 0.0) {
            return Err(AnalysisError::ModelUnavailable(format!(
                "temperature must be > 0, got {}",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.no_chord_score) {
            return Err(AnalysisError::ModelUnavailable(format!(
                "no_chord_score must be in [0, 1], got {}",
                self.no_chord_score
            )));
        }
        if self.qualities.is_empty() {
            return Err(AnalysisError::ModelUnavailable(
                "model needs at least one chord quality".to_string(),
            ));
        }
        Ok(())
    }
}

/// Viterbi-decoded HMM chord model
#[derive(Debug, Clone)]
pub struct HmmChordModel {
    weights: HmmWeights,
    bank: TemplateBank,
}

impl HmmChordModel {
    /// Build a model from weights
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ModelUnavailable` if the weights are out of range
    pub fn new(weights: HmmWeights) -> Result<Self, AnalysisError> {
        weights.validate()?;
        let bank = TemplateBank::with_qualities(&weights.qualities);
        Ok(Self { weights, bank })
    }

    /// Model with the bundled weights
    pub fn pretrained() -> Self {
        let weights = HmmWeights::default();
        let bank = TemplateBank::with_qualities(&weights.qualities);
        Self { weights, bank }
    }

    /// Load weights from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, AnalysisError> {
        let weights: HmmWeights = serde_json::from_str(json)
            .map_err(|e| AnalysisError::ModelUnavailable(format!("invalid model weights: {}", e)))?;
        Self::new(weights)
    }

    /// Load weights from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        log::debug!("Loading chord model weights from {}", path.display());
        let text = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::ModelUnavailable(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Model parameters
    pub fn weights(&self) -> &HmmWeights {
        &self.weights
    }

    /// Number of hidden states (templates plus no-chord)
    pub fn state_count(&self) -> usize {
        self.bank.len() + 1
    }

    fn state_label(&self, state: usize) -> ChordLabel {
        self.bank
            .templates()
            .get(state)
            .map(|t| t.label)
            .unwrap_or(ChordLabel::NoChord)
    }

    /// Normalized log emission probabilities for one frame
    fn log_emissions(&self, detector: &CorrelationDetector<'_>, frame: &ChromaFrame) -> Vec<f32> {
        let inv_t = 1.0 / self.weights.temperature;
        let mut logits: Vec<f32> = detector
            .score_all(&frame.energies)
            .into_iter()
            .map(|s| s * inv_t)
            .collect();
        logits.push(self.weights.no_chord_score * inv_t);

        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let log_sum = max + logits.iter().map(|&l| (l - max).exp()).sum::<f32>().ln();
        for l in logits.iter_mut() {
            *l -= log_sum;
        }
        logits
    }
}

impl ChordSequenceModel for HmmChordModel {
    fn name(&self) -> &str {
        "hmm-viterbi"
    }

    fn label_frames(&self, frames: &[ChromaFrame]) -> Result<Vec<RawChordCandidate>, AnalysisError> {
        if frames.is_empty() {
            return Ok(Vec::new());
        }

        let n_states = self.state_count();
        log::debug!(
            "Viterbi decoding {} frames over {} states",
            frames.len(),
            n_states
        );

        let detector = CorrelationDetector::new(&self.bank, 0.0);
        let emissions: Vec<Vec<f32>> = frames
            .iter()
            .map(|f| self.log_emissions(&detector, f))
            .collect();

        let log_stay = self.weights.self_transition.ln();
        let log_switch = ((1.0 - self.weights.self_transition) / (n_states - 1).max(1) as f32).ln();

        let mut delta = emissions[0].clone();
        let mut backpointers: Vec<u32> = vec![0; frames.len() * n_states];
        let mut next = vec![0.0f32; n_states];

        for t in 1..frames.len() {
            // Best and runner-up predecessors; switching into the best state
            // has to come from the runner-up
            let (mut best, mut second) = (0usize, usize::MAX);
            for j in 1..n_states {
                if delta[j] > delta[best] {
                    second = best;
                    best = j;
                } else if second == usize::MAX || delta[j] > delta[second] {
                    second = j;
                }
            }

            let row = &mut backpointers[t * n_states..(t + 1) * n_states];
            for j in 0..n_states {
                let from = if j == best { second } else { best };
                let stay = delta[j] + log_stay;
                let (score, prev) = match delta.get(from) {
                    Some(&d) if d + log_switch > stay => (d + log_switch, from),
                    _ => (stay, j),
                };
                next[j] = score + emissions[t][j];
                row[j] = prev as u32;
            }
            std::mem::swap(&mut delta, &mut next);
        }

        let mut state = delta
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(n_states - 1);

        let mut path = vec![0usize; frames.len()];
        for t in (0..frames.len()).rev() {
            path[t] = state;
            state = backpointers[t * n_states + state] as usize;
        }

        Ok(frames
            .iter()
            .zip(path.iter())
            .zip(emissions.iter())
            .map(|((frame, &s), emission)| {
                RawChordCandidate::new(
                    frame.time,
                    self.state_label(s),
                    emission[s].exp(),
                    CandidateSource::Model,
                )
            })
            .collect())
    }
}
