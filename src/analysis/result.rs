//! Analysis result types

use super::chord::ChordLabel;
use super::metadata::AnalysisMetadata;
use serde::{Deserialize, Serialize};

/// Time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Beats per measure (numerator)
    pub beats_per_measure: u32,
    /// Beat unit (denominator)
    pub beat_unit: u32,
}

impl TimeSignature {
    /// Create a time signature
    pub fn new(beats_per_measure: u32, beat_unit: u32) -> Self {
        Self {
            beats_per_measure,
            beat_unit,
        }
    }

    /// Whether both parts are non-zero
    pub fn is_valid(&self) -> bool {
        self.beats_per_measure > 0 && self.beat_unit > 0
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.beats_per_measure, self.beat_unit)
    }
}

/// Where the tempo came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempoSource {
    /// Caller-supplied BPM, used verbatim
    Override,
    /// Estimated from the audio
    Detected,
    /// Detection failed or was impossible; the configured default was used
    Default,
}

/// Beat grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    /// Beat positions in seconds
    pub beats: Vec<f32>,

    /// Downbeat positions in seconds (first beat of each measure)
    pub downbeats: Vec<f32>,
}

impl BeatGrid {
    /// Build an isochronous grid with downbeats on beats 0, m, 2m, ...
    ///
    /// # Arguments
    ///
    /// * `duration` - Track duration in seconds
    /// * `bpm` - Tempo (must be > 0)
    /// * `phase` - Time of the first beat in seconds, reduced modulo the period
    /// * `time_signature` - Downbeats fall every `beats_per_measure` beats
    pub fn isochronous(duration: f32, bpm: f32, phase: f32, time_signature: TimeSignature) -> Self {
        Self::isochronous_with_downbeat(duration, bpm, phase, time_signature, 0)
    }

    /// Build an isochronous grid whose first downbeat is beat `downbeat_offset`
    ///
    /// The offset is taken modulo `beats_per_measure`; beats before the first
    /// downbeat form a pickup measure.
    pub fn isochronous_with_downbeat(
        duration: f32,
        bpm: f32,
        phase: f32,
        time_signature: TimeSignature,
        downbeat_offset: u32,
    ) -> Self {
        if !(bpm > 0.0) || !(duration > 0.0) {
            return Self::default();
        }
        let period = 60.0 / bpm;
        let phase = if phase.is_finite() { phase.rem_euclid(period) } else { 0.0 };
        let per_measure = time_signature.beats_per_measure.max(1) as usize;
        let offset = downbeat_offset as usize % per_measure;

        let mut beats = Vec::new();
        let mut downbeats = Vec::new();
        let mut k = 0usize;
        loop {
            let t = phase + k as f32 * period;
            if t >= duration {
                break;
            }
            if k % per_measure == offset {
                downbeats.push(t);
            }
            beats.push(t);
            k += 1;
        }

        Self { beats, downbeats }
    }

    /// Number of downbeats in `[start, end)`
    pub fn downbeats_in(&self, start: f32, end: f32) -> usize {
        self.downbeats.iter().filter(|&&t| t >= start && t < end).count()
    }

    /// 1-based position within the measure of the beat at or before `time`
    ///
    /// Beats of a pickup measure count back from the first downbeat. Times
    /// before the first beat are at position 1.
    pub fn beat_position(&self, time: f32, time_signature: TimeSignature) -> u32 {
        const TOLERANCE: f32 = 1e-3;
        let per_measure = time_signature.beats_per_measure.max(1) as isize;
        let passed = self.beats.iter().take_while(|&&b| b <= time + TOLERANCE).count();
        if passed == 0 {
            return 1;
        }
        let first_downbeat = self
            .downbeats
            .first()
            .and_then(|d| self.beats.iter().position(|b| b == d))
            .unwrap_or(0) as isize;
        ((passed as isize - 1 - first_downbeat).rem_euclid(per_measure)) as u32 + 1
    }
}

/// Harmonic rhythm role of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarmonicRole {
    /// Shorter than half a second
    Passing,
    /// One beat
    Accent,
    /// Two beats
    Brief,
    /// Three or four beats
    Standard,
    /// More than four beats
    Sustained,
}

impl HarmonicRole {
    /// Classify from duration and rounded beat count
    pub fn classify(duration: f32, beats: u32) -> Self {
        if duration < 0.5 {
            HarmonicRole::Passing
        } else {
            match beats {
                0 | 1 => HarmonicRole::Accent,
                2 => HarmonicRole::Brief,
                3 | 4 => HarmonicRole::Standard,
                _ => HarmonicRole::Sustained,
            }
        }
    }
}

/// A maximal run of one chord label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSegment {
    /// Start time in seconds
    pub start_time: f32,
    /// End time in seconds (exclusive)
    pub end_time: f32,
    /// Chord label
    pub label: ChordLabel,
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// Duration in beats, `duration * bpm / 60`
    pub beat_count: f32,
    /// Whole beats for output, `max(1, round(beat_count))`
    pub beats: u32,
    /// Whether this is a no-chord segment
    pub is_no_chord: bool,
    /// Downbeats inside the segment
    pub measures: u32,
    /// Position within the measure where the segment starts (1-based)
    pub beat_position: u32,
    /// Harmonic rhythm role
    pub role: HarmonicRole,
}

impl ChordSegment {
    /// Create a segment with its beat count derived from `bpm`
    ///
    /// Rhythm fields are placeholders until the progression is assembled.
    pub fn new(start_time: f32, end_time: f32, label: ChordLabel, confidence: f32, bpm: f32) -> Self {
        let mut segment = Self {
            start_time,
            end_time,
            label,
            confidence,
            beat_count: 0.0,
            beats: 1,
            is_no_chord: label.is_no_chord(),
            measures: 0,
            beat_position: 1,
            role: HarmonicRole::Passing,
        };
        segment.update_beat_count(bpm);
        segment
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        self.end_time - self.start_time
    }

    /// Recompute `beat_count` after the boundaries changed
    pub fn update_beat_count(&mut self, bpm: f32) {
        self.beat_count = self.duration().max(0.0) * bpm / 60.0;
    }

    /// Display name of the chord (`"N"` for no-chord)
    pub fn chord_name(&self) -> String {
        self.label.to_string()
    }
}

/// Flat output record for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    /// Start time in seconds
    pub time: f32,
    /// Display chord name, `"N"` for no-chord
    pub chord: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// Duration in seconds
    pub duration: f32,
    /// Whole beats, at least 1
    pub beats: u32,
}

/// Analysis flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisFlag {
    /// Tempo detection failed, default BPM used
    TempoFallback,
    /// Only one detector contributed
    SingleDetector,
    /// Most of the track was labeled no-chord
    WeakHarmony,
    /// Mean segment confidence is low
    LowConfidence,
}

/// Chord progression: the analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progression {
    /// Ordered, contiguous segments covering `[0, duration_seconds)`
    pub segments: Vec<ChordSegment>,

    /// Tempo used for beat measurement
    pub bpm: f32,

    /// Tempo confidence (1.0 for an override, 0.0 for the default)
    pub tempo_confidence: f32,

    /// Time signature
    pub time_signature: TimeSignature,

    /// Beat grid
    pub beat_grid: BeatGrid,

    /// Track duration in seconds
    pub duration_seconds: f32,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}

impl Progression {
    /// Number of segments carrying a chord (no-chord segments excluded)
    pub fn chord_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.is_no_chord).count()
    }

    /// True when no chord was detected anywhere in the track
    pub fn is_empty(&self) -> bool {
        self.chord_count() == 0
    }

    /// Distinct chord labels in order of first appearance
    pub fn unique_chords(&self) -> Vec<ChordLabel> {
        let mut seen: Vec<ChordLabel> = Vec::new();
        for segment in self.segments.iter().filter(|s| !s.is_no_chord) {
            if !seen.contains(&segment.label) {
                seen.push(segment.label);
            }
        }
        seen
    }

    /// Segments as flat events
    pub fn to_events(&self) -> Vec<ChordEvent> {
        self.segments
            .iter()
            .map(|s| ChordEvent {
                time: s.start_time,
                chord: s.chord_name(),
                confidence: s.confidence,
                duration: s.duration(),
                beats: s.beats,
            })
            .collect()
    }

    /// Segment active at `time`, if any
    pub fn segment_at(&self, time: f32) -> Option<&ChordSegment> {
        self.segments
            .iter()
            .find(|s| time >= s.start_time && time < s.end_time)
    }
}
