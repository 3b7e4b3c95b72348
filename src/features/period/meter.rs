//! Beat accent analysis
//!
//! Samples the onset envelope on the beat grid of a detected tempo to catch
//! octave errors and to score the meter.
//!
//! # Algorithm
//!
//! 1. Take the envelope maximum around every beat, and around every point
//!    halfway between beats
//! 2. Double-time check: if every other beat is much weaker than the rest
//!    and the strong beats are even, the weak ones are subdivisions and the
//!    tempo is halved
//! 3. Half-time check: if the halfway points carry about as much onset
//!    strength as the beats, the pulse is twice as fast and the tempo is
//!    doubled
//! 4. Meter: for 4 and then 3 beats per measure, and every downbeat position,
//!    score the accent contrast between that position and the other beats.
//!    The best contrast above `MIN_ACCENT_CONTRAST` gives the meter
//!
//! Fewer than `MIN_BEATS` beats leave the tempo unchanged and the meter
//! undetected.

use crate::analysis::result::TimeSignature;
use serde::{Deserialize, Serialize};

/// Beats needed before accents are trusted
pub const MIN_BEATS: usize = 8;

/// Weak-to-strong ratio of alternate beats below which the weak ones are subdivisions
pub const HALF_TIME_RATIO: f32 = 0.5;

/// Largest coefficient of variation of the strong beats that still allows halving
pub const MAX_STRONG_BEAT_CV: f32 = 0.3;

/// Halfway-to-beat strength ratio above which the pulse is twice as fast
pub const DOUBLE_TIME_RATIO: f32 = 0.8;

/// Minimum accent contrast for a meter to count as detected
pub const MIN_ACCENT_CONTRAST: f32 = 0.15;

const EPSILON: f32 = 1e-10;

/// Maps onset envelope frames to seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeClock {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Samples between envelope frames
    pub hop_size: usize,
    /// Samples per envelope frame
    pub frame_size: usize,
}

impl EnvelopeClock {
    /// Time at which an onset makes the flux of `frame` rise
    ///
    /// The flux rises when an onset enters the trailing hop of a frame.
    pub fn time_of(&self, frame: f32) -> f32 {
        (frame * self.hop_size as f32 + self.frame_size as f32 - self.hop_size as f32 / 2.0)
            / self.sample_rate as f32
    }

    /// Envelope frame whose flux responds to an onset at `time`
    pub fn frame_at(&self, time: f32) -> f32 {
        (time * self.sample_rate as f32 - self.frame_size as f32 + self.hop_size as f32 / 2.0)
            / self.hop_size as f32
    }

    /// Envelope frames per second
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }
}

/// Onset strength at one beat of the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatStrength {
    /// Grid index, counted from the first beat
    pub index: usize,
    /// Envelope maximum around the beat
    pub strength: f32,
}

/// What to do with a detected tempo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OctaveCorrection {
    /// The tempo stands
    Keep,
    /// Halve the tempo; beats with this index parity are the real beats
    Halve {
        /// 0 for even grid indices, 1 for odd
        parity: usize,
    },
    /// Double the tempo
    Double,
}

/// Detected meter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeterEstimate {
    /// Beats per measure over a quarter-note beat
    pub time_signature: TimeSignature,
    /// Grid index of the first downbeat, in `[0, beats_per_measure)`
    pub downbeat_offset: u32,
    /// Accent contrast in [0, 1]
    pub confidence: f32,
}

/// Sample onset strength at `first_beat + (k + shift) * period` for k = 0, 1, ...
///
/// # Arguments
///
/// * `envelope` - Onset strength per frame
/// * `clock` - Frame timing of `envelope`
/// * `first_beat` - Time of grid beat 0 in seconds
/// * `period` - Beat period in seconds
/// * `shift` - Offset in beats; 0.5 samples the halfway points
///
/// # Returns
///
/// One strength per grid point inside the envelope. Each takes the envelope
/// maximum within an eighth of a period; points before the first frame are
/// skipped, so indices may start above 0.
pub fn sample_beats(
    envelope: &[f32],
    clock: &EnvelopeClock,
    first_beat: f32,
    period: f32,
    shift: f32,
) -> Vec<BeatStrength> {
    if envelope.is_empty()
        || clock.sample_rate == 0
        || clock.hop_size == 0
        || !(period > 0.0)
        || !first_beat.is_finite()
    {
        return Vec::new();
    }

    let radius = (period * clock.frame_rate() / 8.0).round().max(1.0) as isize;
    let last = envelope.len() as isize - 1;
    let mut beats = Vec::new();
    for index in 0usize.. {
        let center = clock
            .frame_at(first_beat + (index as f32 + shift) * period)
            .round() as isize;
        if center > last {
            break;
        }
        if center < 0 {
            continue;
        }
        let lo = (center - radius).max(0) as usize;
        let hi = (center + radius).min(last) as usize;
        let strength = envelope[lo..=hi].iter().copied().fold(0.0f32, f32::max);
        beats.push(BeatStrength { index, strength });
    }
    beats
}

/// Check a detected tempo for double-time and half-time errors
///
/// # Arguments
///
/// * `on_beats` - Strengths at the beats (`shift` 0)
/// * `halfway` - Strengths halfway between beats (`shift` 0.5)
/// * `bpm` - Detected tempo
/// * `min_bpm`, `max_bpm` - A correction never leaves this range
pub fn check_octave_error(
    on_beats: &[BeatStrength],
    halfway: &[BeatStrength],
    bpm: f32,
    min_bpm: f32,
    max_bpm: f32,
) -> OctaveCorrection {
    if on_beats.len() < MIN_BEATS {
        return OctaveCorrection::Keep;
    }

    let by_parity: [Vec<f32>; 2] = [0usize, 1].map(|parity| {
        on_beats
            .iter()
            .filter(|b| b.index % 2 == parity)
            .map(|b| b.strength)
            .collect()
    });
    let means = [mean(&by_parity[0]), mean(&by_parity[1])];
    let strong = if means[1] > means[0] { 1 } else { 0 };
    let weak = 1 - strong;

    if bpm / 2.0 >= min_bpm
        && means[strong] > EPSILON
        && by_parity[weak].len() >= MIN_BEATS / 2
        && by_parity[strong].len() >= MIN_BEATS / 2
        && means[weak] < HALF_TIME_RATIO * means[strong]
        && coefficient_of_variation(&by_parity[strong]) < MAX_STRONG_BEAT_CV
    {
        log::debug!(
            "Alternate beats weak ({:.4} vs {:.4}): {:.1} BPM is double time",
            means[weak],
            means[strong],
            bpm
        );
        return OctaveCorrection::Halve { parity: strong };
    }

    let on: Vec<f32> = on_beats.iter().map(|b| b.strength).collect();
    let off: Vec<f32> = halfway.iter().map(|b| b.strength).collect();
    let on_mean = mean(&on);
    let off_mean = mean(&off);
    if bpm * 2.0 <= max_bpm
        && on_mean > EPSILON
        && off.len() >= MIN_BEATS
        && off_mean >= DOUBLE_TIME_RATIO * on_mean
    {
        log::debug!(
            "Halfway points as strong as beats ({:.4} vs {:.4}): {:.1} BPM is half time",
            off_mean,
            on_mean,
            bpm
        );
        return OctaveCorrection::Double;
    }

    OctaveCorrection::Keep
}

/// Score 4 and 3 beats per measure by accent contrast
///
/// # Returns
///
/// The best meter with its downbeat position, or `None` when there are too
/// few beats or no position stands out by `MIN_ACCENT_CONTRAST`. Ties go to
/// 4/4 and then to the earlier downbeat.
pub fn detect_meter(beats: &[BeatStrength]) -> Option<MeterEstimate> {
    if beats.len() < MIN_BEATS {
        return None;
    }

    let mut best: Option<MeterEstimate> = None;
    for beats_per_measure in [4usize, 3] {
        for offset in 0..beats_per_measure {
            let contrast = accent_contrast(beats, beats_per_measure, offset);
            let floor = best.map_or(MIN_ACCENT_CONTRAST, |b| b.confidence);
            if contrast > floor {
                best = Some(MeterEstimate {
                    time_signature: TimeSignature::new(beats_per_measure as u32, 4),
                    downbeat_offset: offset as u32,
                    confidence: contrast.min(1.0),
                });
            }
        }
    }

    match best {
        Some(m) => log::debug!(
            "Meter {} (downbeat at grid beat {}, contrast {:.3})",
            m.time_signature,
            m.downbeat_offset,
            m.confidence
        ),
        None => log::debug!("No accent pattern across {} beats", beats.len()),
    }
    best
}

/// `(accented - rest) / (accented + rest)` for one downbeat position
fn accent_contrast(beats: &[BeatStrength], beats_per_measure: usize, offset: usize) -> f32 {
    let (accented, rest): (Vec<&BeatStrength>, Vec<&BeatStrength>) = beats
        .iter()
        .partition(|b| b.index % beats_per_measure == offset);
    if accented.len() < 2 || rest.len() < 2 {
        return 0.0;
    }
    let a = accented.iter().map(|b| b.strength).sum::<f32>() / accented.len() as f32;
    let r = rest.iter().map(|b| b.strength).sum::<f32>() / rest.len() as f32;
    if a + r <= EPSILON {
        return 0.0;
    }
    (a - r) / (a + r)
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

fn coefficient_of_variation(values: &[f32]) -> f32 {
    let m = mean(values);
    if m <= EPSILON {
        return f32::INFINITY;
    }
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32;
    variance.sqrt() / m
}
