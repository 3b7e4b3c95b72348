//! Output assembly
//!
//! Turns smoothed segments into the final `Progression`. The timeline is
//! checked before anything is attached to it: it must start at 0, be
//! contiguous and ordered, and end at the track duration. Small float drift
//! (below `TIMELINE_TOLERANCE`) is snapped; anything larger is an internal
//! error, never a silently repaired result.
//!
//! Each segment then gets its output rhythm fields:
//! - `beats`: `max(1, round(beat_count))`
//! - `measures`: downbeats inside the segment
//! - `beat_position`: position of the segment start within its measure
//! - `role`: harmonic rhythm class

use super::metadata::AnalysisMetadata;
use super::result::{BeatGrid, ChordSegment, HarmonicRole, Progression, TimeSignature};
use crate::error::AnalysisError;
use crate::features::period::TempoEstimate;

/// Largest boundary mismatch (seconds) snapped instead of rejected
pub const TIMELINE_TOLERANCE: f32 = 1e-4;

/// Assemble the final progression
///
/// # Arguments
///
/// * `segments` - Smoothed segments in time order
/// * `tempo` - Resolved tempo; its phase anchors the beat grid, and a detected
///   meter matching `time_signature` places the downbeats
/// * `time_signature` - Meter for downbeats and beat positions
/// * `duration` - Track duration in seconds
/// * `metadata` - Metadata collected so far; chord counts are filled in here
///
/// # Errors
///
/// Returns `AnalysisError::ProcessingError` if there are no segments or the
/// timeline has a gap, overlap or reversed segment
pub fn assemble_progression(
    segments: Vec<ChordSegment>,
    tempo: &TempoEstimate,
    time_signature: TimeSignature,
    duration: f32,
    metadata: AnalysisMetadata,
) -> Result<Progression, AnalysisError> {
    log::debug!(
        "Assembling {} segments over {:.3}s at {:.2} BPM",
        segments.len(),
        duration,
        tempo.bpm
    );

    let mut segments = segments;
    validate_timeline(&mut segments, duration)?;

    let downbeat_offset = tempo
        .meter
        .filter(|m| m.time_signature == time_signature)
        .map_or(0, |m| m.downbeat_offset);
    let beat_grid = BeatGrid::isochronous_with_downbeat(
        duration,
        tempo.bpm,
        tempo.phase,
        time_signature,
        downbeat_offset,
    );
    for segment in segments.iter_mut() {
        segment.update_beat_count(tempo.bpm);
        segment.is_no_chord = segment.label.is_no_chord();
        segment.confidence = segment.confidence.clamp(0.0, 1.0);
        segment.beats = whole_beats(segment.beat_count);
        segment.measures = beat_grid.downbeats_in(segment.start_time, segment.end_time) as u32;
        segment.beat_position = beat_grid.beat_position(segment.start_time, time_signature);
        segment.role = HarmonicRole::classify(segment.duration(), segment.beats);
    }

    let mut progression = Progression {
        segments,
        bpm: tempo.bpm,
        tempo_confidence: tempo.confidence,
        time_signature,
        beat_grid,
        duration_seconds: duration,
        metadata,
    };
    progression.metadata.duration_seconds = duration;
    progression.metadata.tempo_source = tempo.source;
    progression.metadata.total_chords = progression.chord_count();
    progression.metadata.unique_chords = progression.unique_chords().len();

    Ok(progression)
}

/// Whole beats for output, never 0
pub fn whole_beats(beat_count: f32) -> u32 {
    if beat_count.is_finite() {
        (beat_count.round() as u32).max(1)
    } else {
        1
    }
}

/// Check the timeline and snap boundaries within tolerance
fn validate_timeline(segments: &mut [ChordSegment], duration: f32) -> Result<(), AnalysisError> {
    let n = segments.len();
    if n == 0 {
        return Err(AnalysisError::ProcessingError(
            "No segments to assemble".to_string(),
        ));
    }

    if segments[0].start_time.abs() > TIMELINE_TOLERANCE {
        return Err(AnalysisError::ProcessingError(format!(
            "Timeline starts at {:.6}s instead of 0",
            segments[0].start_time
        )));
    }
    segments[0].start_time = 0.0;

    for i in 1..n {
        let gap = segments[i].start_time - segments[i - 1].end_time;
        if gap.abs() > TIMELINE_TOLERANCE {
            return Err(AnalysisError::ProcessingError(format!(
                "{} of {:.6}s between segments {} and {}",
                if gap > 0.0 { "Gap" } else { "Overlap" },
                gap.abs(),
                i - 1,
                i
            )));
        }
        segments[i].start_time = segments[i - 1].end_time;
    }

    let last = &mut segments[n - 1];
    if (last.end_time - duration).abs() > TIMELINE_TOLERANCE && last.end_time < duration {
        return Err(AnalysisError::ProcessingError(format!(
            "Timeline ends at {:.6}s, before the track end {:.6}s",
            last.end_time, duration
        )));
    }
    if last.start_time < duration {
        last.end_time = duration;
    }

    if let Some((i, s)) = segments
        .iter()
        .enumerate()
        .find(|(_, s)| !(s.end_time >= s.start_time))
    {
        return Err(AnalysisError::ProcessingError(format!(
            "Segment {} ends before it starts ({:.6}s > {:.6}s)",
            i, s.start_time, s.end_time
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::chord::ChordLabel;
    use crate::analysis::result::TempoSource;
    use crate::features::period::MeterEstimate;

    fn seg(start: f32, end: f32, name: &str) -> ChordSegment {
        ChordSegment::new(start, end, name.parse().unwrap(), 0.8, 120.0)
    }

    fn tempo(bpm: f32) -> TempoEstimate {
        TempoEstimate::from_override(bpm)
    }

    #[test]
    fn test_rhythm_fields() {
        let segments = vec![seg(0.0, 2.0, "C"), seg(2.0, 3.0, "G"), seg(3.0, 3.2, "N")];
        let progression = assemble_progression(
            segments,
            &tempo(120.0),
            TimeSignature::default(),
            3.2,
            AnalysisMetadata::default(),
        )
        .unwrap();

        let c = &progression.segments[0];
        assert_eq!(c.beats, 4);
        assert_eq!(c.measures, 1);
        assert_eq!(c.beat_position, 1);
        assert_eq!(c.role, HarmonicRole::Standard);

        let g = &progression.segments[1];
        assert_eq!(g.beats, 2);
        assert_eq!(g.measures, 1);
        assert_eq!(g.beat_position, 1);
        assert_eq!(g.role, HarmonicRole::Brief);

        let n = &progression.segments[2];
        assert!(n.is_no_chord);
        assert_eq!(n.beats, 1);
        assert_eq!(n.beat_position, 3);
        assert_eq!(n.role, HarmonicRole::Passing);

        assert_eq!(progression.metadata.total_chords, 2);
        assert_eq!(progression.metadata.unique_chords, 2);
        assert_eq!(progression.metadata.tempo_source, TempoSource::Override);
        assert_eq!(progression.bpm, 120.0);
    }

    #[test]
    fn test_minimum_one_beat() {
        // 0.3 s at 90 BPM is 0.45 beats
        let progression = assemble_progression(
            vec![seg(0.0, 0.3, "C")],
            &tempo(90.0),
            TimeSignature::default(),
            0.3,
            AnalysisMetadata::default(),
        )
        .unwrap();
        assert_eq!(progression.segments[0].beats, 1);
        assert!((progression.segments[0].beat_count - 0.45).abs() < 1e-5);
        assert_eq!(whole_beats(0.0), 1);
        assert_eq!(whole_beats(f32::NAN), 1);
        assert_eq!(whole_beats(2.6), 3);
    }

    #[test]
    fn test_snaps_small_drift_and_clamps_end() {
        let segments = vec![seg(0.00005, 1.0, "C"), seg(1.00003, 2.5, "G")];
        let progression = assemble_progression(
            segments,
            &tempo(120.0),
            TimeSignature::default(),
            2.0,
            AnalysisMetadata::default(),
        )
        .unwrap();
        assert_eq!(progression.segments[0].start_time, 0.0);
        assert_eq!(progression.segments[1].start_time, 1.0);
        assert_eq!(progression.segments[1].end_time, 2.0);
    }

    #[test]
    fn test_rejects_gap_and_overlap() {
        let config = (tempo(120.0), TimeSignature::default());
        for segments in [
            vec![seg(0.0, 1.0, "C"), seg(1.1, 2.0, "G")],
            vec![seg(0.0, 1.0, "C"), seg(0.9, 2.0, "G")],
            vec![seg(0.2, 2.0, "C")],
            vec![seg(0.0, 1.5, "C")],
        ] {
            let result = assemble_progression(
                segments,
                &config.0,
                config.1,
                2.0,
                AnalysisMetadata::default(),
            );
            assert!(matches!(result, Err(AnalysisError::ProcessingError(_))));
        }
    }

    #[test]
    fn test_detected_meter_places_downbeats() {
        let waltz = TimeSignature::new(3, 4);
        let mut detected = tempo(60.0);
        detected.meter = Some(MeterEstimate {
            time_signature: waltz,
            downbeat_offset: 1,
            confidence: 0.5,
        });
        let segments = vec![seg(0.0, 1.0, "C"), seg(1.0, 4.0, "F"), seg(4.0, 6.0, "G")];

        let progression = assemble_progression(
            segments.clone(),
            &detected,
            waltz,
            6.0,
            AnalysisMetadata::default(),
        )
        .unwrap();
        assert_eq!(progression.beat_grid.downbeats, vec![1.0, 4.0]);
        let positions: Vec<u32> = progression.segments.iter().map(|s| s.beat_position).collect();
        assert_eq!(positions, vec![3, 1, 1]);
        assert_eq!(progression.segments[1].measures, 1);

        // A different meter ignores the detected downbeat
        let progression = assemble_progression(
            segments,
            &detected,
            TimeSignature::default(),
            6.0,
            AnalysisMetadata::default(),
        )
        .unwrap();
        assert_eq!(progression.beat_grid.downbeats, vec![0.0, 4.0]);
    }

    #[test]
    fn test_rejects_empty() {
        let result = assemble_progression(
            Vec::new(),
            &tempo(120.0),
            TimeSignature::default(),
            1.0,
            AnalysisMetadata::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_all_no_chord_is_valid_and_empty() {
        let segment = ChordSegment::new(0.0, 2.0, ChordLabel::NoChord, 0.0, 120.0);
        let progression = assemble_progression(
            vec![segment],
            &TempoEstimate::fallback(120.0),
            TimeSignature::default(),
            2.0,
            AnalysisMetadata::default(),
        )
        .unwrap();
        assert!(progression.is_empty());
        assert_eq!(progression.segments.len(), 1);
        assert_eq!(progression.metadata.total_chords, 0);
    }
}
