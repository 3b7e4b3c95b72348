//! Autocorrelation-based BPM estimation
//!
//! Finds periodicity in the onset envelope using FFT-accelerated
//! autocorrelation.
//!
//! # Algorithm
//!
//! 1. Remove the envelope mean
//! 2. `ACF = IFFT(|FFT(signal)|²)` with zero padding
//! 3. Find ACF peaks inside the lag range implied by `[min_bpm, max_bpm]`
//! 4. Refine each peak lag by parabolic interpolation
//! 5. `BPM = 60 * sample_rate / (lag * hop_size)`, confidence `ACF[lag] / ACF[0]`
//!
//! # Reference
//!
//! Ellis, D. P. W., & Pikrakis, A. (2006). Real-time Beat Induction.
//! *Proceedings of the International Conference on Music Information Retrieval*.

use super::peak_picking::{local_maxima, parabolic_interpolation};
use super::BpmCandidate;
use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

const EPSILON: f32 = 1e-10;

/// Estimate BPM candidates from an onset envelope
///
/// # Arguments
///
/// * `envelope` - Onset strength per frame
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Samples per envelope frame
/// * `min_bpm` - Minimum BPM to consider
/// * `max_bpm` - Maximum BPM to consider
///
/// # Returns
///
/// BPM candidates ranked by confidence (highest first). Empty when the
/// envelope has no periodic structure in range.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or hop size
/// or an empty BPM range
pub fn estimate_bpm_from_envelope(
    envelope: &[f32],
    sample_rate: u32,
    hop_size: usize,
    min_bpm: f32,
    max_bpm: f32,
) -> Result<Vec<BpmCandidate>, AnalysisError> {
    log::debug!(
        "Estimating BPM from autocorrelation: {} frames, {} Hz, hop={}, range=[{:.1}, {:.1}] BPM",
        envelope.len(),
        sample_rate,
        hop_size,
        min_bpm,
        max_bpm
    );

    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
    }
    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput("Invalid hop size: 0".to_string()));
    }
    if min_bpm <= 0.0 || max_bpm <= 0.0 || min_bpm >= max_bpm {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid BPM range: [{:.1}, {:.1}]",
            min_bpm, max_bpm
        )));
    }

    let frames_per_minute = 60.0 * sample_rate as f32 / hop_size as f32;
    let lag_min = (frames_per_minute / max_bpm).ceil() as usize;
    let lag_max = (frames_per_minute / min_bpm).floor() as usize;

    // Need at least two periods at the shortest lag
    if envelope.len() < 2 * lag_min.max(1) + 1 {
        log::warn!(
            "Envelope too short for autocorrelation: {} frames, need {}",
            envelope.len(),
            2 * lag_min + 1
        );
        return Ok(Vec::new());
    }

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f32> = envelope.iter().map(|&x| x - mean).collect();
    let acf = compute_autocorrelation(&centered);

    if acf[0] <= EPSILON {
        log::debug!("Envelope has no energy variation");
        return Ok(Vec::new());
    }

    let peaks = local_maxima(&acf, lag_min, lag_max, 0.0);

    let mut candidates: Vec<BpmCandidate> = peaks
        .into_iter()
        .filter_map(|(lag, value)| {
            let refined_lag = parabolic_interpolation(&acf, lag);
            if refined_lag <= 0.0 {
                return None;
            }
            let bpm = frames_per_minute / refined_lag;
            if bpm < min_bpm || bpm > max_bpm {
                return None;
            }
            Some(BpmCandidate {
                bpm,
                confidence: (value / acf[0]).clamp(0.0, 1.0),
                lag: refined_lag,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    log::debug!("Autocorrelation found {} BPM candidates", candidates.len());
    Ok(candidates)
}

/// Autocorrelation using FFT acceleration
///
/// Uses the identity `ACF = IFFT(|FFT(signal)|²)` with zero padding to
/// `2n`, so the result is the linear (biased) autocorrelation, same length
/// as the input.
pub fn compute_autocorrelation(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let fft_size = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(fft_size).process(&mut buffer);
    for x in buffer.iter_mut() {
        *x = Complex::new(x.norm_sqr(), 0.0);
    }
    planner.plan_fft_inverse(fft_size).process(&mut buffer);

    let scale = 1.0 / fft_size as f32;
    buffer[..n].iter().map(|x| x.re * scale).collect()
}
