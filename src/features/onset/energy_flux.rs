//! Energy flux onset envelope
//!
//! Frame-by-frame energy derivative, the input to tempo estimation.
//!
//! Algorithm:
//! 1. Divide audio into overlapping frames (frame_size, hop_size)
//! 2. Compute RMS energy per frame
//! 3. Half-wave rectified derivative: `E_flux[n] = max(0, E[n] - E[n-1])`
//! 4. Optionally peak-pick above a threshold relative to the maximum flux
//!
//! # Example
//!
//! ```no_run
//! use stratum_chords::features::onset::energy_flux::energy_flux_envelope;
//!
//! let samples = vec![0.0f32; 44100 * 30];
//! let envelope = energy_flux_envelope(&samples, 2048, 512)?;
//! println!("{} envelope frames", envelope.len());
//! # Ok::<(), stratum_chords::AnalysisError>(())
//! ```

use crate::error::AnalysisError;
use crate::preprocessing::normalization::rms;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Compute the energy flux envelope
///
/// # Reference
///
/// Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
/// A Tutorial on Onset Detection in Music Signals.
/// *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.
///
/// # Arguments
///
/// * `samples` - Audio samples (mono)
/// * `frame_size` - Frame size for RMS analysis
/// * `hop_size` - Hop size between frames
///
/// # Returns
///
/// One flux value per full frame; the first value is 0. Empty if the signal
/// is shorter than one frame.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `frame_size` or `hop_size` is 0
pub fn energy_flux_envelope(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> Result<Vec<f32>, AnalysisError> {
    if frame_size == 0 {
        return Err(AnalysisError::InvalidInput("Frame size must be > 0".to_string()));
    }
    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput("Hop size must be > 0".to_string()));
    }
    if samples.len() < frame_size {
        return Ok(Vec::new());
    }

    let num_frames = (samples.len() - frame_size) / hop_size + 1;
    log::debug!(
        "Computing energy flux: {} samples, {} frames (frame={}, hop={})",
        samples.len(),
        num_frames,
        frame_size,
        hop_size
    );

    let energies: Vec<f32> = (0..num_frames)
        .map(|i| {
            let start = i * hop_size;
            rms(&samples[start..start + frame_size])
        })
        .collect();

    let mut flux = Vec::with_capacity(num_frames);
    flux.push(0.0);
    flux.extend(energies.windows(2).map(|w| (w[1] - w[0]).max(0.0)));
    Ok(flux)
}

/// Pick onset frames from a flux envelope
///
/// A frame is an onset when it is a local maximum (strictly greater than its
/// left neighbor, at least its right one) and lies within `threshold_db` of
/// the envelope maximum.
///
/// # Returns
///
/// Onset frame indices in ascending order
pub fn pick_onsets(envelope: &[f32], threshold_db: f32) -> Vec<usize> {
    let max_flux = envelope.iter().copied().fold(0.0f32, f32::max);
    if max_flux <= EPSILON {
        return Vec::new();
    }
    let threshold = max_flux * 10f32.powf(threshold_db / 20.0);

    (0..envelope.len())
        .filter(|&i| {
            let v = envelope[i];
            let left = if i > 0 { envelope[i - 1] } else { 0.0 };
            let right = envelope.get(i + 1).copied().unwrap_or(0.0);
            v >= threshold && v > left && v >= right
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_track(sample_rate: usize, interval: usize, seconds: usize) -> Vec<f32> {
        let mut samples = vec![0.0f32; sample_rate * seconds];
        for start in (0..samples.len()).step_by(interval) {
            for j in 0..200.min(samples.len() - start) {
                samples[start + j] = 0.8 * (1.0 - j as f32 / 200.0);
            }
        }
        samples
    }

    #[test]
    fn test_envelope_length() {
        let samples = vec![0.1f32; 44100];
        let env = energy_flux_envelope(&samples, 2048, 512).unwrap();
        assert_eq!(env.len(), (44100 - 2048) / 512 + 1);
        assert_eq!(env[0], 0.0);
        assert!(env.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_steady_tone_has_no_flux() {
        let samples: Vec<f32> = (0..44100).map(|i| 0.5 * (i as f32 * 0.05).sin()).collect();
        let env = energy_flux_envelope(&samples, 2048, 512).unwrap();
        let max = env.iter().copied().fold(0.0f32, f32::max);
        assert!(max < 0.01);
    }

    #[test]
    fn test_clicks_produce_onsets() {
        let samples = click_track(44100, 22050, 4);
        let env = energy_flux_envelope(&samples, 1024, 512).unwrap();
        let onsets = pick_onsets(&env, -6.0);
        assert!(onsets.len() >= 6, "found {} onsets", onsets.len());
        for pair in onsets.windows(2) {
            let gap = pair[1] - pair[0];
            assert!((42..=45).contains(&gap), "gap {}", gap);
        }
    }

    #[test]
    fn test_short_and_invalid() {
        assert!(energy_flux_envelope(&[0.0; 100], 2048, 512).unwrap().is_empty());
        assert!(energy_flux_envelope(&[0.0; 4096], 0, 512).is_err());
        assert!(energy_flux_envelope(&[0.0; 4096], 2048, 0).is_err());
        assert!(pick_onsets(&[0.0; 10], -6.0).is_empty());
    }
}
