//! Tempo resolution
//!
//! A caller override inside `[MIN_OVERRIDE_BPM, MAX_OVERRIDE_BPM]` is used
//! verbatim. Otherwise the tempo is estimated from the energy flux envelope
//! by autocorrelation, checked for double-time and half-time errors, and the
//! meter is scored from the beat accents. When there is no audio or no
//! detectable periodicity the configured default BPM is used, so resolution
//! itself never fails.

use super::autocorrelation::estimate_bpm_from_envelope;
use super::meter::{
    check_octave_error, detect_meter, sample_beats, EnvelopeClock, MeterEstimate, OctaveCorrection,
};
use crate::analysis::result::TempoSource;
use crate::config::{AnalysisConfig, MAX_OVERRIDE_BPM, MIN_OVERRIDE_BPM};
use crate::error::AnalysisError;
use crate::features::onset::energy_flux::energy_flux_envelope;
use crate::preprocessing::normalization::rms;
use serde::{Deserialize, Serialize};

/// Minimum normalized autocorrelation for a tempo to count as detected
pub const MIN_PERIODICITY: f32 = 0.1;

/// Minimum peak flux relative to the signal RMS for onsets to exist
pub const MIN_FLUX_RATIO: f32 = 0.05;

/// Resolved tempo
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEstimate {
    /// Beats per minute
    pub bpm: f32,
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// Where the value came from
    pub source: TempoSource,
    /// Time of the first beat in seconds
    pub phase: f32,
    /// Meter scored from the beat accents; `None` unless detected
    pub meter: Option<MeterEstimate>,
}

impl TempoEstimate {
    /// Caller-supplied tempo
    pub fn from_override(bpm: f32) -> Self {
        Self {
            bpm,
            confidence: 1.0,
            source: TempoSource::Override,
            phase: 0.0,
            meter: None,
        }
    }

    /// Fallback tempo
    pub fn fallback(bpm: f32) -> Self {
        Self {
            bpm,
            confidence: 0.0,
            source: TempoSource::Default,
            phase: 0.0,
            meter: None,
        }
    }

    /// Seconds per beat
    pub fn beat_period(&self) -> f32 {
        60.0 / self.bpm
    }

    /// Beats spanned by `duration` seconds
    pub fn beats_in(&self, duration: f32) -> f32 {
        duration * self.bpm / 60.0
    }
}

/// Tempo plus the non-fatal problems met while resolving it
#[derive(Debug, Clone, PartialEq)]
pub struct TempoResolution {
    /// Tempo to use
    pub estimate: TempoEstimate,
    /// Recovered problems (invalid override, failed detection)
    pub warnings: Vec<String>,
}

/// Whether an override is inside the accepted range
pub fn is_valid_override(bpm: f32) -> bool {
    bpm.is_finite() && (MIN_OVERRIDE_BPM..=MAX_OVERRIDE_BPM).contains(&bpm)
}

/// Estimate tempo from audio
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Frame geometry and BPM search range
///
/// # Returns
///
/// Detected tempo with beat phase and, when the accents show one, the meter
///
/// # Errors
///
/// Returns `AnalysisError::TempoEstimation` when the signal has no periodic
/// onset structure within `[min_bpm, max_bpm]`
pub fn detect_tempo(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<TempoEstimate, AnalysisError> {
    let hop_size = config.hop_size.max(1);
    let env_frame = (config.frame_size / 2).max(hop_size);

    log::debug!(
        "Detecting tempo: {} samples at {} Hz, range [{:.0}, {:.0}] BPM",
        samples.len(),
        sample_rate,
        config.min_bpm,
        config.max_bpm
    );

    let envelope = energy_flux_envelope(samples, env_frame, hop_size)
        .map_err(|e| AnalysisError::TempoEstimation(e.to_string()))?;

    // Sustained material only has window ripple in its flux, which is periodic
    // but says nothing about the beat
    let max_flux = envelope.iter().copied().fold(0.0f32, f32::max);
    let level = rms(samples);
    if max_flux <= 1e-6 || max_flux < MIN_FLUX_RATIO * level {
        return Err(AnalysisError::TempoEstimation(format!(
            "No onsets above noise floor (max flux {:.5}, level {:.5})",
            max_flux, level
        )));
    }

    let candidates =
        estimate_bpm_from_envelope(&envelope, sample_rate, hop_size, config.min_bpm, config.max_bpm)
            .map_err(|e| AnalysisError::TempoEstimation(e.to_string()))?;

    let best = candidates
        .first()
        .ok_or_else(|| AnalysisError::TempoEstimation("No periodicity in onset envelope".to_string()))?;

    if best.confidence < MIN_PERIODICITY {
        return Err(AnalysisError::TempoEstimation(format!(
            "Periodicity too weak: {:.3} < {:.3}",
            best.confidence, MIN_PERIODICITY
        )));
    }

    let clock = EnvelopeClock {
        sample_rate,
        hop_size,
        frame_size: env_frame,
    };
    let mut bpm = best.bpm;
    let mut period = 60.0 / bpm;
    let mut phase = clock
        .time_of(estimate_beat_phase(&envelope, best.lag))
        .rem_euclid(period);

    let on_beats = sample_beats(&envelope, &clock, phase, period, 0.0);
    let halfway = sample_beats(&envelope, &clock, phase, period, 0.5);
    match check_octave_error(&on_beats, &halfway, bpm, config.min_bpm, config.max_bpm) {
        OctaveCorrection::Keep => {}
        OctaveCorrection::Halve { parity } => {
            log::info!("Correcting double-time tempo {:.2} -> {:.2} BPM", bpm, bpm / 2.0);
            phase += parity as f32 * period;
            bpm /= 2.0;
        }
        OctaveCorrection::Double => {
            log::info!("Correcting half-time tempo {:.2} -> {:.2} BPM", bpm, bpm * 2.0);
            bpm *= 2.0;
        }
    }
    period = 60.0 / bpm;
    phase = phase.rem_euclid(period);

    let meter = detect_meter(&sample_beats(&envelope, &clock, phase, period, 0.0));

    log::debug!(
        "Detected tempo {:.2} BPM (confidence {:.3}, phase {:.3}s, meter {})",
        bpm,
        best.confidence,
        phase,
        meter.map_or_else(|| "undetected".to_string(), |m| m.time_signature.to_string())
    );

    Ok(TempoEstimate {
        bpm,
        confidence: best.confidence,
        source: TempoSource::Detected,
        phase,
        meter,
    })
}

/// Beat phase in envelope frames
///
/// Returns the offset in `[0, period)` whose comb of beats at
/// `offset + k * period` collects the most onset strength.
pub fn estimate_beat_phase(envelope: &[f32], period_frames: f32) -> f32 {
    if envelope.is_empty() || !(period_frames >= 1.0) {
        return 0.0;
    }
    let steps = period_frames.ceil() as usize;

    let mut best_offset = 0usize;
    let mut best_score = f32::MIN;
    for offset in 0..steps {
        let mut score = 0.0f32;
        let mut t = offset as f32;
        while (t.round() as usize) < envelope.len() {
            score += envelope[t.round() as usize];
            t += period_frames;
        }
        if score > best_score {
            best_score = score;
            best_offset = offset;
        }
    }
    best_offset as f32
}

/// Resolve the tempo for an analysis run
///
/// `samples` is `None` when analyzing precomputed chroma; detection is then
/// impossible and a missing or invalid override falls back to the default.
pub fn resolve_tempo(
    samples: Option<&[f32]>,
    sample_rate: u32,
    config: &AnalysisConfig,
) -> TempoResolution {
    let mut warnings = Vec::new();

    match config.bpm_override {
        Some(bpm) if is_valid_override(bpm) => {
            log::debug!("Using BPM override {:.2}", bpm);
            return TempoResolution {
                estimate: TempoEstimate::from_override(bpm),
                warnings,
            };
        }
        Some(bpm) => warnings.push(format!(
            "BPM override {} outside [{}, {}], ignored",
            bpm, MIN_OVERRIDE_BPM, MAX_OVERRIDE_BPM
        )),
        None => {}
    }

    let detected = match samples {
        Some(samples) => detect_tempo(samples, sample_rate, config),
        None => Err(AnalysisError::TempoEstimation(
            "No audio available for tempo detection".to_string(),
        )),
    };

    let estimate = match detected {
        Ok(estimate) => estimate,
        Err(e) => {
            warnings.push(format!("{}; using default {} BPM", e, config.default_bpm));
            TempoEstimate::fallback(config.default_bpm)
        }
    };

    for w in &warnings {
        log::warn!("{}", w);
    }

    TempoResolution { estimate, warnings }
}
