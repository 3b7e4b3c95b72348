//! Template-correlation chord detector
//!
//! Scores each chroma frame against every template by cosine similarity and
//! keeps the best. Scores below the acceptance threshold become `NoChord`,
//! carrying the top score as confidence.

use super::templates::{ChordTemplate, TemplateBank};
use super::{CandidateSource, RawChordCandidate};
use crate::analysis::chord::ChordLabel;
use crate::features::chroma::normalization::l2_norm;
use crate::features::chroma::ChromaFrame;

/// Scores within this margin count as tied
pub const SCORE_TIE_EPSILON: f32 = 1e-6;

/// Correlation detector over a template bank
#[derive(Debug, Clone, Copy)]
pub struct CorrelationDetector<'a> {
    bank: &'a TemplateBank,
    acceptance_threshold: f32,
}

impl<'a> CorrelationDetector<'a> {
    /// Create a detector
    ///
    /// # Arguments
    ///
    /// * `bank` - Templates to score against
    /// * `acceptance_threshold` - Minimum score for a chord label (default 0.6)
    pub fn new(bank: &'a TemplateBank, acceptance_threshold: f32) -> Self {
        Self {
            bank,
            acceptance_threshold,
        }
    }

    /// Cosine similarity of a chroma vector with every template, in bank order
    pub fn score_all(&self, chroma: &[f32; 12]) -> Vec<f32> {
        let norm = l2_norm(chroma);
        if norm <= 1e-9 {
            return vec![0.0; self.bank.len()];
        }
        self.bank
            .templates()
            .iter()
            .map(|t| (t.dot(chroma) / norm).clamp(-1.0, 1.0))
            .collect()
    }

    /// Best-scoring template and its score
    ///
    /// Ties within `SCORE_TIE_EPSILON` go to the earlier template (lower
    /// complexity rank, then lower root). Returns `None` for silent input.
    pub fn best_match(&self, chroma: &[f32; 12]) -> Option<(&'a ChordTemplate, f32)> {
        let norm = l2_norm(chroma);
        if norm <= 1e-9 {
            return None;
        }

        let mut best: Option<(&'a ChordTemplate, f32)> = None;
        for template in self.bank.templates() {
            let score = (template.dot(chroma) / norm).clamp(-1.0, 1.0);
            match best {
                Some((_, best_score)) if score <= best_score + SCORE_TIE_EPSILON => {}
                _ => best = Some((template, score)),
            }
        }
        best
    }

    /// Classify a single frame
    pub fn detect_frame(&self, frame: &ChromaFrame) -> RawChordCandidate {
        match self.best_match(&frame.energies) {
            Some((template, score)) if score >= self.acceptance_threshold => RawChordCandidate::new(
                frame.time,
                template.label,
                score,
                CandidateSource::Correlation,
            ),
            Some((_, score)) => RawChordCandidate::new(
                frame.time,
                ChordLabel::NoChord,
                score,
                CandidateSource::Correlation,
            ),
            None => RawChordCandidate::new(
                frame.time,
                ChordLabel::NoChord,
                0.0,
                CandidateSource::Correlation,
            ),
        }
    }

    /// Classify every frame
    pub fn detect(&self, frames: &[ChromaFrame]) -> Vec<RawChordCandidate> {
        log::debug!(
            "Correlating {} frames against {} templates (threshold {:.2})",
            frames.len(),
            self.bank.len(),
            self.acceptance_threshold
        );
        let candidates: Vec<RawChordCandidate> = frames.iter().map(|f| self.detect_frame(f)).collect();
        let no_chord = candidates.iter().filter(|c| c.label.is_no_chord()).count();
        log::debug!("Correlation: {}/{} frames below threshold", no_chord, candidates.len());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::chord::{ChordQuality, PitchClass};

    fn chroma(bins: &[(usize, f32)]) -> [f32; 12] {
        let mut c = [0.0f32; 12];
        for &(b, v) in bins {
            c[b] = v;
        }
        c
    }

    #[test]
    fn test_pure_triads() {
        let detector = CorrelationDetector::new(TemplateBank::shared(), 0.6);

        let c = detector.detect_frame(&ChromaFrame::new(0.0, chroma(&[(0, 1.0), (4, 1.0), (7, 1.0)])));
        assert_eq!(c.label.to_string(), "C");
        assert!((c.score - 1.0).abs() < 1e-5);

        let am = detector.detect_frame(&ChromaFrame::new(0.0, chroma(&[(9, 1.0), (0, 1.0), (4, 1.0)])));
        assert_eq!(am.label.to_string(), "Am");
    }

    #[test]
    fn test_seventh_chord() {
        let detector = CorrelationDetector::new(TemplateBank::shared(), 0.6);
        let g7 = detector.detect_frame(&ChromaFrame::new(
            0.0,
            chroma(&[(7, 1.0), (11, 1.0), (2, 1.0), (5, 1.0)]),
        ));
        assert_eq!(g7.label, ChordLabel::chord(PitchClass::new(7), ChordQuality::Dominant7));
    }

    #[test]
    fn test_tie_prefers_simpler_quality() {
        // C, E, G, A matches both C6 and Am7 exactly
        let detector = CorrelationDetector::new(TemplateBank::shared(), 0.6);
        let frame = ChromaFrame::new(0.0, chroma(&[(0, 1.0), (4, 1.0), (7, 1.0), (9, 1.0)]));
        let candidate = detector.detect_frame(&frame);
        assert_eq!(
            candidate.label,
            ChordLabel::chord(PitchClass::new(9), ChordQuality::Minor7)
        );
    }

    #[test]
    fn test_tie_prefers_lower_root() {
        // Augmented triads are symmetric: C, E and G# aug share one mask
        let detector = CorrelationDetector::new(TemplateBank::shared(), 0.6);
        let frame = ChromaFrame::new(0.0, chroma(&[(0, 1.0), (4, 1.0), (8, 1.0)]));
        let candidate = detector.detect_frame(&frame);
        assert_eq!(
            candidate.label,
            ChordLabel::chord(PitchClass::new(0), ChordQuality::Augmented)
        );
    }

    #[test]
    fn test_below_threshold_is_no_chord() {
        let detector = CorrelationDetector::new(TemplateBank::shared(), 0.6);
        let flat = ChromaFrame::new(0.0, [1.0; 12]);
        let candidate = detector.detect_frame(&flat);
        assert!(candidate.label.is_no_chord());
        assert!(candidate.score > 0.0 && candidate.score < 0.6);
    }

    #[test]
    fn test_silent_frame_scores_zero() {
        let detector = CorrelationDetector::new(TemplateBank::shared(), 0.6);
        let candidate = detector.detect_frame(&ChromaFrame::silent(1.5));
        assert!(candidate.label.is_no_chord());
        assert_eq!(candidate.score, 0.0);
        assert_eq!(candidate.frame_time, 1.5);
        assert_eq!(candidate.source, CandidateSource::Correlation);
    }

    #[test]
    fn test_score_all_matches_bank() {
        let detector = CorrelationDetector::new(TemplateBank::shared(), 0.6);
        let scores = detector.score_all(&chroma(&[(0, 1.0), (4, 1.0), (7, 1.0)]));
        assert_eq!(scores.len(), TemplateBank::shared().len());
        assert!((scores[0] - 1.0).abs() < 1e-5);
    }
}
