//! Segment building and rhythm-aware smoothing
//!
//! 1. Raw segmentation: each maximal run of identical frame labels becomes a
//!    segment whose confidence is the mean of its frames
//! 2. Thresholds from the simplicity preference `s`:
//!    `very_short = 0.5 + 0.4 s` beats, `short = 1.0 + 0.8 s` beats
//! 3. Filtering: a segment under `very_short` is dropped and its span goes to
//!    its left neighbor (right neighbor for the first segment)
//! 4. Merging: a segment with the same label as its neighbor is joined to
//!    it, confidence weighted by duration. Raw runs are maximal, so this only
//!    happens where a filtered segment left two equal neighbors touching
//! 5. Steps 3-4 repeat, one segment at a time, shortest first, until no
//!    segment is under `very_short`
//!
//! A chord that differs from both neighbors is never merged away, however
//! short, unless it falls under `very_short`.
//!
//! The removal order depends only on the segments, never on `s`; `s` only
//! decides where it stops. A higher simplicity therefore never yields more
//! segments, and smoothing an already smoothed list changes nothing.
//!
//! No-chord segments are treated like any other label. Zero or one segment is
//! returned untouched.

use super::ensemble::FrameLabel;
use super::result::ChordSegment;
use serde::{Deserialize, Serialize};

/// Beat-duration thresholds derived from the simplicity preference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingThresholds {
    /// Segments shorter than this are dropped
    pub very_short_beats: f32,
    /// Segments shorter than this are merged into neighbors with the same label
    pub short_beats: f32,
}

impl SmoothingThresholds {
    /// Derive thresholds; `simplicity` is clamped to [0, 1]
    pub fn from_simplicity(simplicity: f32) -> Self {
        let s = if simplicity.is_finite() {
            simplicity.clamp(0.0, 1.0)
        } else {
            0.5
        };
        Self {
            very_short_beats: 0.5 + s * 0.4,
            short_beats: 1.0 + s * 0.8,
        }
    }
}

/// Build raw segments from per-frame labels
///
/// # Arguments
///
/// * `frames` - Canonical frame labels, ascending in time
/// * `duration` - Track duration in seconds; the last segment ends here
/// * `bpm` - Tempo for beat counts
///
/// # Returns
///
/// Contiguous segments covering `[0, duration)`; empty for no frames
pub fn build_segments(frames: &[FrameLabel], duration: f32, bpm: f32) -> Vec<ChordSegment> {
    let mut segments: Vec<ChordSegment> = Vec::new();
    let mut run_start = 0usize;

    for i in 1..=frames.len() {
        let boundary = i == frames.len() || frames[i].label != frames[run_start].label;
        if !boundary {
            continue;
        }
        let run = &frames[run_start..i];
        let start = if segments.is_empty() { 0.0 } else { run[0].time };
        let end = if i == frames.len() {
            duration.max(run[0].time)
        } else {
            frames[i].time
        };
        let confidence = run.iter().map(|f| f.confidence).sum::<f32>() / run.len() as f32;
        segments.push(ChordSegment::new(
            start,
            end,
            run[0].label,
            confidence.clamp(0.0, 1.0),
            bpm,
        ));
        run_start = i;
    }

    log::debug!(
        "Built {} raw segments from {} frames",
        segments.len(),
        frames.len()
    );
    segments
}

/// Smooth segments to the filter/merge fixed point
///
/// # Arguments
///
/// * `segments` - Contiguous segments in time order
/// * `bpm` - Tempo for beat counts
/// * `simplicity` - Simplicity preference in [0, 1]
pub fn smooth_segments(segments: Vec<ChordSegment>, bpm: f32, simplicity: f32) -> Vec<ChordSegment> {
    let thresholds = SmoothingThresholds::from_simplicity(simplicity);
    let mut segments = segments;
    if segments.len() <= 1 {
        return segments;
    }

    let initial = segments.len();
    coalesce(&mut segments, bpm);

    let mut removed = 0usize;
    while segments.len() > 1 {
        let (index, beats) = shortest_segment(&segments);
        if beats >= thresholds.very_short_beats {
            break;
        }
        remove_segment(&mut segments, index, bpm);
        removed += 1;
    }

    log::debug!(
        "Smoothing (very_short={:.2}, short={:.2} beats): {} -> {} segments, {} removals",
        thresholds.very_short_beats,
        thresholds.short_beats,
        initial,
        segments.len(),
        removed
    );
    segments
}

/// Whether `smooth_segments` would leave these segments unchanged
pub fn is_fixed_point(segments: &[ChordSegment], bpm: f32, simplicity: f32) -> bool {
    smooth_segments(segments.to_vec(), bpm, simplicity).as_slice() == segments
}

/// Shortest segment in beats, earliest on ties
fn shortest_segment(segments: &[ChordSegment]) -> (usize, f32) {
    let mut best = (0usize, segments[0].beat_count);
    for (i, segment) in segments.iter().enumerate().skip(1) {
        if segment.beat_count < best.1 {
            best = (i, segment.beat_count);
        }
    }
    best
}

/// Remove segment `i`, keeping the timeline contiguous and runs maximal
///
/// The segment is absorbed by its left neighbor, or by its right neighbor
/// when it is first; the absorbing segment keeps its confidence. Neighbors
/// that end up with the same label are then joined.
fn remove_segment(segments: &mut Vec<ChordSegment>, i: usize, bpm: f32) {
    if i > 0 {
        let end = segments[i].end_time;
        segments[i - 1].end_time = end;
        segments[i - 1].update_beat_count(bpm);
        segments.remove(i);
        if i < segments.len() && segments[i - 1].label == segments[i].label {
            let confidence = weighted_confidence(&segments[i - 1..=i]);
            let end = segments[i].end_time;
            let left = &mut segments[i - 1];
            left.confidence = confidence;
            left.end_time = end;
            left.update_beat_count(bpm);
            segments.remove(i);
        }
    } else {
        let start = segments[0].start_time;
        segments[1].start_time = start;
        segments[1].update_beat_count(bpm);
        segments.remove(0);
    }
}

/// Duration-weighted mean confidence
fn weighted_confidence(parts: &[ChordSegment]) -> f32 {
    let total: f32 = parts.iter().map(|s| s.duration().max(0.0)).sum();
    if total > 0.0 {
        parts
            .iter()
            .map(|s| s.confidence * s.duration().max(0.0))
            .sum::<f32>()
            / total
    } else {
        parts.iter().map(|s| s.confidence).fold(0.0, f32::max)
    }
}

/// Merge runs of adjacent segments with the same label
fn coalesce(segments: &mut Vec<ChordSegment>, bpm: f32) {
    let mut out: Vec<ChordSegment> = Vec::with_capacity(segments.len());
    for segment in segments.drain(..) {
        match out.last_mut() {
            Some(prev) if prev.label == segment.label => {
                prev.confidence = weighted_confidence(&[prev.clone(), segment.clone()]);
                prev.end_time = segment.end_time;
                prev.update_beat_count(bpm);
            }
            _ => out.push(segment),
        }
    }
    *segments = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::chord::ChordLabel;

    const BPM: f32 = 120.0;

    fn chord(name: &str) -> ChordLabel {
        name.parse().unwrap()
    }

    fn labels(segments: &[ChordSegment]) -> Vec<ChordLabel> {
        segments.iter().map(|s| s.label).collect()
    }

    fn seg(start: f32, end: f32, name: &str, confidence: f32) -> ChordSegment {
        ChordSegment::new(start, end, chord(name), confidence, BPM)
    }

    fn frames(runs: &[(&str, f32)], step: f32) -> Vec<FrameLabel> {
        let mut t = 0.0;
        let mut out = Vec::new();
        for &(name, conf) in runs {
            out.push(FrameLabel {
                time: t,
                label: chord(name),
                confidence: conf,
            });
            t += step;
        }
        out
    }

    fn assert_contiguous(segments: &[ChordSegment], duration: f32) {
        assert_eq!(segments[0].start_time, 0.0);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
        assert_eq!(segments.last().unwrap().end_time, duration);
    }

    #[test]
    fn test_thresholds() {
        let t = SmoothingThresholds::from_simplicity(0.5);
        assert!((t.very_short_beats - 0.7).abs() < 1e-6);
        assert!((t.short_beats - 1.4).abs() < 1e-6);
        let t = SmoothingThresholds::from_simplicity(0.0);
        assert_eq!((t.very_short_beats, t.short_beats), (0.5, 1.0));
        let t = SmoothingThresholds::from_simplicity(3.0);
        assert!((t.very_short_beats - 0.9).abs() < 1e-6);
        assert!((t.short_beats - 1.8).abs() < 1e-6);
    }

    #[test]
    fn test_raw_segmentation() {
        let f = frames(&[("C", 0.8), ("C", 0.6), ("G", 0.9), ("N", 0.3)], 0.5);
        let segments = build_segments(&f, 2.0, BPM);
        assert_eq!(labels(&segments), vec![chord("C"), chord("G"), ChordLabel::NoChord]);
        assert!((segments[0].confidence - 0.7).abs() < 1e-6);
        assert!((segments[0].beat_count - 2.0).abs() < 1e-6);
        assert!(segments[2].is_no_chord);
        assert_contiguous(&segments, 2.0);
        assert!(build_segments(&[], 1.0, BPM).is_empty());
    }

    #[test]
    fn test_transient_filtered_and_merged() {
        // C for 2 s, G for 0.03 s (0.06 beats), C for 2 s
        let segments = vec![
            seg(0.0, 2.0, "C", 0.9),
            seg(2.0, 2.03, "G", 0.8),
            seg(2.03, 4.03, "C", 0.7),
        ];
        let smoothed = smooth_segments(segments, BPM, 0.5);
        assert_eq!(smoothed.len(), 1);
        assert_eq!(smoothed[0].label, chord("C"));
        assert_eq!(smoothed[0].start_time, 0.0);
        assert_eq!(smoothed[0].end_time, 4.03);
    }

    #[test]
    fn test_two_beat_chord_survives_at_zero_simplicity() {
        let segments = vec![
            seg(0.0, 2.0, "C", 0.9),
            seg(2.0, 3.0, "G", 0.8),
            seg(3.0, 5.0, "C", 0.7),
        ];
        let smoothed = smooth_segments(segments, BPM, 0.0);
        assert_eq!(labels(&smoothed), vec![chord("C"), chord("G"), chord("C")]);
    }

    #[test]
    fn test_short_distinct_chord_between_equal_neighbors_kept() {
        // G is 1.2 beats: above very_short (0.7), below short (1.4)
        let segments = vec![
            seg(0.0, 2.0, "C", 0.9),
            seg(2.0, 2.6, "G", 0.8),
            seg(2.6, 4.0, "C", 0.7),
        ];
        let smoothed = smooth_segments(segments.clone(), BPM, 0.5);
        assert_eq!(smoothed, segments);
        assert!(is_fixed_point(&smoothed, BPM, 1.0));

        // Still removed once it falls under very_short
        let segments = vec![
            seg(0.0, 2.0, "C", 0.9),
            seg(2.0, 2.2, "G", 0.8),
            seg(2.2, 4.0, "C", 0.7),
        ];
        let smoothed = smooth_segments(segments, BPM, 0.5);
        assert_eq!(labels(&smoothed), vec![chord("C")]);
        assert_contiguous(&smoothed, 4.0);
    }

    #[test]
    fn test_filtered_gap_joins_equal_neighbors() {
        let segments = vec![
            seg(0.0, 3.0, "C", 0.9),
            seg(3.0, 3.1, "N", 0.2),
            seg(3.1, 4.0, "C", 0.5),
        ];
        let smoothed = smooth_segments(segments, BPM, 0.5);
        assert_eq!(smoothed.len(), 1);
        // C absorbs N keeping 0.9 over 3.1 s, then joins the 0.9 s C at 0.5
        let expected = (0.9 * 3.1 + 0.5 * 0.9) / 4.0;
        assert!((smoothed[0].confidence - expected).abs() < 1e-5);
        assert!((smoothed[0].beat_count - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_leading_short_segment_absorbed_forward() {
        let segments = vec![seg(0.0, 0.1, "N", 0.1), seg(0.1, 3.0, "C", 0.9)];
        let smoothed = smooth_segments(segments, BPM, 0.5);
        assert_eq!(smoothed.len(), 1);
        assert_eq!(smoothed[0].start_time, 0.0);
        assert_eq!(smoothed[0].label, chord("C"));
        assert!((smoothed[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_all_short_keeps_longest() {
        let segments = vec![
            seg(0.0, 0.1, "C", 0.9),
            seg(0.1, 0.3, "G", 0.8),
            seg(0.3, 0.35, "Am", 0.7),
        ];
        let smoothed = smooth_segments(segments, BPM, 1.0);
        assert_eq!(smoothed.len(), 1);
        assert_eq!(smoothed[0].label, chord("G"));
        assert_contiguous(&smoothed, 0.35);
    }

    #[test]
    fn test_single_segment_untouched() {
        let segments = vec![seg(0.0, 0.2, "C", 0.5)];
        assert_eq!(smooth_segments(segments.clone(), BPM, 1.0), segments);
    }

    #[test]
    fn test_coalesce_weights_confidence_by_duration() {
        let mut segments = vec![seg(0.0, 3.0, "C", 0.9), seg(3.0, 4.0, "C", 0.5)];
        coalesce(&mut segments, BPM);
        assert_eq!(segments.len(), 1);
        assert!((segments[0].confidence - 0.8).abs() < 1e-6);
        assert!((segments[0].beat_count - 8.0).abs() < 1e-5);
    }

    #[test]
    fn test_no_chord_gaps_filtered() {
        let segments = vec![
            seg(0.0, 2.0, "Am", 0.9),
            seg(2.0, 2.1, "N", 0.2),
            seg(2.1, 4.0, "Am", 0.8),
        ];
        let smoothed = smooth_segments(segments, BPM, 0.5);
        assert_eq!(labels(&smoothed), vec![chord("Am")]);
    }

    fn pseudo_random_segments(seed: u32, n: usize) -> Vec<ChordSegment> {
        let names = ["C", "G", "Am", "F", "N"];
        let mut state = seed.wrapping_mul(2654435761).wrapping_add(1);
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };
        let mut t = 0.0f32;
        let mut out: Vec<ChordSegment> = Vec::new();
        for _ in 0..n {
            let len = 0.05 + (next() % 200) as f32 / 100.0;
            let mut name = names[(next() % names.len() as u32) as usize];
            if out.last().map(|s: &ChordSegment| s.label.to_string()) == Some(name.to_string()) {
                name = if name == "C" { "G" } else { "C" };
            }
            out.push(seg(t, t + len, name, (next() % 100) as f32 / 100.0));
            t += len;
        }
        out
    }

    #[test]
    fn test_fixed_point_is_idempotent() {
        for seed in 0..20 {
            let raw = pseudo_random_segments(seed, 40);
            for &s in &[0.0, 0.25, 0.5, 0.75, 1.0] {
                let smoothed = smooth_segments(raw.clone(), BPM, s);
                assert!(is_fixed_point(&smoothed, BPM, s), "seed {} s {}", seed, s);
            }
        }
    }

    #[test]
    fn test_simplicity_is_monotonic() {
        for seed in 0..20 {
            let raw = pseudo_random_segments(seed, 40);
            let mut previous = usize::MAX;
            for step in 0..=10 {
                let s = step as f32 / 10.0;
                let count = smooth_segments(raw.clone(), BPM, s).len();
                assert!(count <= previous, "seed {} s {}: {} > {}", seed, s, count, previous);
                previous = count;
            }
        }
    }

    #[test]
    fn test_smoothing_preserves_contiguity_and_bounds() {
        for seed in 0..20 {
            let raw = pseudo_random_segments(seed, 30);
            let end = raw.last().unwrap().end_time;
            let smoothed = smooth_segments(raw, BPM, 0.5);
            assert_contiguous(&smoothed, end);
            for s in &smoothed {
                assert!((0.0..=1.0).contains(&s.confidence));
                assert!(s.end_time > s.start_time);
            }
        }
    }
}
