//! Confidence scoring module
//!
//! Summarizes how far a `Progression` can be trusted.
//!
//! # Confidence Components
//!
//! 1. **Chord Confidence**: Duration-weighted mean confidence of the chord segments
//! 2. **Harmonic Coverage**: Share of the track carrying a chord (1 - no-chord ratio)
//! 3. **Tempo Confidence**: 1.0 for an override, detection strength otherwise, 0.0 for the default
//! 4. **Overall Confidence**: Weighted combination of all components
//!
//! # Example
//!
//! ```no_run
//! use stratum_chords::{analyze_chords, AnalysisConfig};
//! use stratum_chords::analysis::confidence::compute_confidence;
//!
//! let samples = vec![0.0f32; 44100 * 30];
//! let progression = analyze_chords(&samples, 44100, &AnalysisConfig::default())?;
//! let confidence = compute_confidence(&progression);
//!
//! println!("Overall confidence: {:.2}", confidence.overall_confidence);
//! # Ok::<(), stratum_chords::AnalysisError>(())
//! ```

use super::result::{AnalysisFlag, Progression, TempoSource};
use serde::{Deserialize, Serialize};

/// No-chord share above which harmony is flagged as weak
pub const WEAK_HARMONY_RATIO: f32 = 0.5;

/// Chord confidence below which the progression is flagged
pub const LOW_CONFIDENCE: f32 = 0.5;

/// Progression confidence scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionConfidence {
    /// Duration-weighted mean confidence of chord segments (0.0-1.0)
    ///
    /// No-chord segments are excluded; 0.0 when there is no chord.
    pub chord_confidence: f32,

    /// Fraction of the track labeled no-chord (0.0-1.0)
    pub no_chord_ratio: f32,

    /// Tempo confidence (0.0-1.0)
    pub tempo_confidence: f32,

    /// Overall confidence (weighted average)
    ///
    /// - Chord confidence: 60% weight
    /// - Harmonic coverage: 25% weight
    /// - Tempo: 15% weight
    pub overall_confidence: f32,

    /// Flags from the analysis plus confidence-based ones
    pub flags: Vec<AnalysisFlag>,
}

/// Compute confidence scores for a progression
///
/// # Arguments
///
/// * `progression` - Result of `analyze_chords()`
///
/// # Returns
///
/// `ProgressionConfidence` with individual and overall scores. An empty
/// progression scores 0 overall.
pub fn compute_confidence(progression: &Progression) -> ProgressionConfidence {
    log::debug!(
        "Computing confidence for {} segments",
        progression.segments.len()
    );

    let total: f32 = progression
        .segments
        .iter()
        .map(|s| s.duration().max(0.0))
        .sum();

    let (chord_time, weighted) = progression
        .segments
        .iter()
        .filter(|s| !s.is_no_chord)
        .fold((0.0f32, 0.0f32), |(time, sum), s| {
            let d = s.duration().max(0.0);
            (time + d, sum + s.confidence * d)
        });

    let chord_confidence = if chord_time > 0.0 {
        (weighted / chord_time).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let no_chord_ratio = if total > 0.0 {
        (1.0 - chord_time / total).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let tempo_confidence = progression.tempo_confidence.clamp(0.0, 1.0);

    let overall_confidence = if progression.is_empty() {
        0.0
    } else {
        (chord_confidence * 0.6 + (1.0 - no_chord_ratio) * 0.25 + tempo_confidence * 0.15)
            .clamp(0.0, 1.0)
    };

    let mut flags = progression.metadata.flags.clone();
    let mut add = |flag: AnalysisFlag| {
        if !flags.contains(&flag) {
            flags.push(flag);
        }
    };
    if progression.metadata.tempo_source == TempoSource::Default {
        add(AnalysisFlag::TempoFallback);
    }
    if no_chord_ratio > WEAK_HARMONY_RATIO {
        add(AnalysisFlag::WeakHarmony);
    }
    if chord_confidence < LOW_CONFIDENCE {
        add(AnalysisFlag::LowConfidence);
    }

    log::debug!(
        "Confidence scores: chords={:.3}, no-chord={:.3}, tempo={:.3}, overall={:.3}",
        chord_confidence,
        no_chord_ratio,
        tempo_confidence,
        overall_confidence
    );

    ProgressionConfidence {
        chord_confidence,
        no_chord_ratio,
        tempo_confidence,
        overall_confidence,
        flags,
    }
}

impl ProgressionConfidence {
    /// Check if overall confidence is high (>= 0.7)
    pub fn is_high_confidence(&self) -> bool {
        self.overall_confidence >= 0.7
    }

    /// Check if overall confidence is low (< 0.5)
    pub fn is_low_confidence(&self) -> bool {
        self.overall_confidence < 0.5
    }

    /// Human-readable confidence level: "High", "Medium", or "Low"
    pub fn confidence_level(&self) -> &'static str {
        if self.is_high_confidence() {
            "High"
        } else if self.is_low_confidence() {
            "Low"
        } else {
            "Medium"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::assembler::assemble_progression;
    use crate::analysis::chord::ChordLabel;
    use crate::analysis::metadata::AnalysisMetadata;
    use crate::analysis::result::{ChordSegment, TimeSignature};
    use crate::features::period::TempoEstimate;

    fn progression(parts: &[(f32, f32, &str, f32)], tempo: TempoEstimate) -> Progression {
        let segments = parts
            .iter()
            .map(|&(start, end, name, conf)| {
                let label: ChordLabel = name.parse().unwrap();
                ChordSegment::new(start, end, label, conf, tempo.bpm)
            })
            .collect();
        let duration = parts.last().map(|p| p.1).unwrap_or(0.0);
        assemble_progression(
            segments,
            &tempo,
            TimeSignature::default(),
            duration,
            AnalysisMetadata::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_confident_progression() {
        let p = progression(
            &[(0.0, 2.0, "C", 0.9), (2.0, 4.0, "G", 0.7)],
            TempoEstimate::from_override(120.0),
        );
        let confidence = compute_confidence(&p);

        assert!((confidence.chord_confidence - 0.8).abs() < 1e-5);
        assert_eq!(confidence.no_chord_ratio, 0.0);
        assert_eq!(confidence.tempo_confidence, 1.0);
        // 0.8*0.6 + 1.0*0.25 + 1.0*0.15 = 0.88
        assert!((confidence.overall_confidence - 0.88).abs() < 1e-4);
        assert!(confidence.is_high_confidence());
        assert!(confidence.flags.is_empty());
    }

    #[test]
    fn test_duration_weighting_excludes_no_chord() {
        let p = progression(
            &[(0.0, 3.0, "C", 0.9), (3.0, 4.0, "Am", 0.5), (4.0, 8.0, "N", 0.1)],
            TempoEstimate::from_override(120.0),
        );
        let confidence = compute_confidence(&p);

        assert!((confidence.chord_confidence - 0.8).abs() < 1e-5);
        assert!((confidence.no_chord_ratio - 0.5).abs() < 1e-6);
        assert!(!confidence.flags.contains(&AnalysisFlag::WeakHarmony));
    }

    #[test]
    fn test_empty_progression_flags() {
        let p = progression(&[(0.0, 5.0, "N", 0.0)], TempoEstimate::fallback(120.0));
        let confidence = compute_confidence(&p);

        assert_eq!(confidence.overall_confidence, 0.0);
        assert_eq!(confidence.no_chord_ratio, 1.0);
        assert_eq!(confidence.confidence_level(), "Low");
        assert!(confidence.flags.contains(&AnalysisFlag::TempoFallback));
        assert!(confidence.flags.contains(&AnalysisFlag::WeakHarmony));
        assert!(confidence.flags.contains(&AnalysisFlag::LowConfidence));
    }

    #[test]
    fn test_keeps_metadata_flags_once() {
        let mut p = progression(&[(0.0, 2.0, "C", 0.4)], TempoEstimate::fallback(120.0));
        p.metadata.flag(AnalysisFlag::SingleDetector);
        p.metadata.flag(AnalysisFlag::TempoFallback);

        let confidence = compute_confidence(&p);
        let fallback_count = confidence
            .flags
            .iter()
            .filter(|&&f| f == AnalysisFlag::TempoFallback)
            .count();
        assert_eq!(fallback_count, 1);
        assert!(confidence.flags.contains(&AnalysisFlag::SingleDetector));
        assert!(confidence.flags.contains(&AnalysisFlag::LowConfidence));
    }
}
