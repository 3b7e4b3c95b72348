//! Peak normalization
//!
//! Brings recordings of different levels to a common peak so that the
//! silence floor used by chroma extraction means the same thing for every
//! input. Gain is capped so that hiss in a near-silent recording is not
//! blown up into something that looks like harmonic content.
//!
//! # Example
//!
//! ```
//! use stratum_chords::preprocessing::normalization::{normalize_peak, NormalizationConfig};
//!
//! let mut samples = vec![0.25f32; 1024];
//! let metadata = normalize_peak(&mut samples, &NormalizationConfig::default());
//! assert!(metadata.gain_db > 0.0);
//! ```

/// Normalization configuration
#[derive(Debug, Clone)]
pub struct NormalizationConfig {
    /// Headroom below 0 dBFS for the normalized peak (default: 1.0)
    pub max_headroom_db: f32,

    /// Maximum gain applied in dB (default: 30.0)
    pub max_gain_db: f32,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            max_headroom_db: 1.0,
            max_gain_db: 30.0,
        }
    }
}

/// Level measurements taken during normalization
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessMetadata {
    /// Peak level in dB (before normalization)
    pub peak_db: f32,
    /// RMS level in dB (before normalization)
    pub rms_db: f32,
    /// Gain applied in dB
    pub gain_db: f32,
}

impl Default for LoudnessMetadata {
    fn default() -> Self {
        Self {
            peak_db: f32::NEG_INFINITY,
            rms_db: f32::NEG_INFINITY,
            gain_db: 0.0,
        }
    }
}

/// Numerical stability epsilon for divisions
const EPSILON: f32 = 1e-10;

/// Convert a linear amplitude to dBFS, `-inf` for silence
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude > EPSILON {
        20.0 * amplitude.log10()
    } else {
        f32::NEG_INFINITY
    }
}

/// Root mean square of a block of samples
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Scale samples in place so the peak sits `max_headroom_db` below full scale
///
/// Silent input is left untouched (gain 0 dB).
pub fn normalize_peak(samples: &mut [f32], config: &NormalizationConfig) -> LoudnessMetadata {
    let peak = samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);
    let rms_db = amplitude_to_db(rms(samples));

    if peak <= EPSILON {
        log::debug!("Audio is digitally silent, skipping normalization");
        return LoudnessMetadata::default();
    }

    let peak_db = amplitude_to_db(peak);
    let target_peak_db = -config.max_headroom_db;
    let gain_db = (target_peak_db - peak_db).min(config.max_gain_db);
    let gain_linear = 10.0_f32.powf(gain_db / 20.0);

    for sample in samples.iter_mut() {
        *sample *= gain_linear;
    }

    log::debug!(
        "Peak normalization: peak={:.2} dB, rms={:.2} dB, gain={:.2} dB",
        peak_db,
        rms_db,
        gain_db
    );

    LoudnessMetadata {
        peak_db,
        rms_db,
        gain_db,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(length: usize, amplitude: f32) -> Vec<f32> {
        (0..length)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn test_peak_normalization() {
        let mut samples = sine(44100, 0.5);
        let metadata = normalize_peak(&mut samples, &NormalizationConfig::default());

        let new_peak = samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);
        let target_peak = 10.0_f32.powf(-1.0 / 20.0);
        assert!(
            (new_peak - target_peak).abs() < 0.01,
            "expected ~{:.3}, got {:.3}",
            target_peak,
            new_peak
        );
        assert!((metadata.peak_db - amplitude_to_db(0.5)).abs() < 0.1);
        assert!(metadata.gain_db > 0.0);
    }

    #[test]
    fn test_gain_is_capped() {
        let mut samples = sine(4410, 1e-4);
        let metadata = normalize_peak(&mut samples, &NormalizationConfig::default());
        assert!((metadata.gain_db - 30.0).abs() < 1e-4);

        let new_peak = samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);
        assert!(new_peak < 0.01);
    }

    #[test]
    fn test_silent_audio_untouched() {
        let mut samples = vec![0.0f32; 1000];
        let metadata = normalize_peak(&mut samples, &NormalizationConfig::default());
        assert_eq!(metadata.gain_db, 0.0);
        assert!(metadata.peak_db.is_infinite());
        assert!(samples.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_rms_and_db() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[1.0, -1.0, 1.0, -1.0]) - 1.0).abs() < 1e-6);
        assert!((amplitude_to_db(1.0)).abs() < 1e-6);
        assert!(amplitude_to_db(0.0).is_infinite());
    }
}
