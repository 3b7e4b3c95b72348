//! Chroma vector extraction
//!
//! Converts the STFT power spectrum to 12-element chroma vectors.
//!
//! # Algorithm
//!
//! 1. Frame the signal (`frame_size`, `hop_size`), apply a Hann window
//! 2. Power spectrum via `rustfft`
//! 3. Map each bin inside `[min_frequency, max_frequency]` to a pitch class:
//!    `semitone = 69 + 12 * log2(f / center_frequency)`
//! 4. Soft mapping spreads a bin over its two nearest semitones with a
//!    Gaussian weight; hard mapping assigns it to the nearest one
//! 5. Frames below the silence threshold are zeroed
//! 6. L2-normalize, optional sharpening, median smoothing over time

use super::normalization::{l2_normalize, sharpen_chroma};
use super::smoothing::smooth_chroma;
use super::ChromaFrame;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::preprocessing::silence::SilenceDetector;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Contribution of one FFT bin to one pitch class
#[derive(Debug, Clone, Copy)]
struct BinWeight {
    bin: usize,
    pitch_class: usize,
    weight: f32,
}

/// Precomputed bin to pitch-class mapping for one frame size and sample rate
struct ChromaMapper {
    weights: Vec<BinWeight>,
}

impl ChromaMapper {
    fn new(frame_size: usize, sample_rate: u32, config: &AnalysisConfig) -> Self {
        let bin_hz = sample_rate as f32 / frame_size as f32;
        let nyquist = sample_rate as f32 / 2.0;
        let max_freq = config.max_frequency.min(nyquist);
        let sigma = config.soft_mapping_sigma.max(1e-3);

        let mut weights = Vec::new();
        for bin in 1..=frame_size / 2 {
            let freq = bin as f32 * bin_hz;
            if freq < config.min_frequency || freq > max_freq {
                continue;
            }
            let semitone = 69.0 + 12.0 * (freq / config.center_frequency).log2();

            if config.soft_chroma_mapping {
                let lower = semitone.floor();
                let upper = lower + 1.0;
                let w_lower = (-(semitone - lower).powi(2) / (2.0 * sigma * sigma)).exp();
                let w_upper = (-(upper - semitone).powi(2) / (2.0 * sigma * sigma)).exp();
                let total = w_lower + w_upper;
                if total <= 0.0 {
                    continue;
                }
                weights.push(BinWeight {
                    bin,
                    pitch_class: pitch_class_of(lower),
                    weight: w_lower / total,
                });
                weights.push(BinWeight {
                    bin,
                    pitch_class: pitch_class_of(upper),
                    weight: w_upper / total,
                });
            } else {
                weights.push(BinWeight {
                    bin,
                    pitch_class: pitch_class_of(semitone.round()),
                    weight: 1.0,
                });
            }
        }

        Self { weights }
    }

    fn project(&self, power: &[f32]) -> [f32; 12] {
        let mut chroma = [0.0f32; 12];
        for w in &self.weights {
            chroma[w.pitch_class] += power[w.bin] * w.weight;
        }
        chroma
    }
}

fn pitch_class_of(semitone: f32) -> usize {
    (semitone as i64).rem_euclid(12) as usize
}

/// Number of full frames that fit in `len` samples
pub fn frame_count(len: usize, frame_size: usize, hop_size: usize) -> usize {
    if hop_size == 0 || len < frame_size {
        0
    } else {
        (len - frame_size) / hop_size + 1
    }
}

/// Extract chroma frames from audio samples
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Frame geometry, frequency range, mapping and smoothing options
///
/// # Returns
///
/// One `ChromaFrame` per full frame, time = `index * hop_size / sample_rate`
///
/// # Errors
///
/// Returns `AnalysisError::InvalidAudio` if the signal is empty, the sample
/// rate is 0, or the signal is shorter than one frame.
pub fn extract_chroma(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<Vec<ChromaFrame>, AnalysisError> {
    let frame_size = config.frame_size;
    let hop_size = config.hop_size;

    if samples.is_empty() {
        return Err(AnalysisError::InvalidAudio("Empty audio samples".to_string()));
    }
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidAudio("Invalid sample rate: 0".to_string()));
    }
    if frame_size == 0 || hop_size == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid frame geometry: frame={}, hop={}",
            frame_size, hop_size
        )));
    }
    if samples.len() < frame_size {
        return Err(AnalysisError::InvalidAudio(format!(
            "Audio too short for analysis: {} samples, need at least {}",
            samples.len(),
            frame_size
        )));
    }

    let n_frames = frame_count(samples.len(), frame_size, hop_size);
    log::debug!(
        "Extracting chroma: {} samples at {} Hz, {} frames (frame={}, hop={})",
        samples.len(),
        sample_rate,
        n_frames,
        frame_size,
        hop_size
    );

    let mapper = ChromaMapper::new(frame_size, sample_rate, config);
    let silence = SilenceDetector {
        threshold_db: config.silence_threshold_db,
        frame_size,
        hop_size,
    };

    let window: Vec<f32> = (0..frame_size)
        .map(|i| {
            0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (frame_size - 1).max(1) as f32).cos()
        })
        .collect();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(frame_size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); frame_size];
    let mut power = vec![0.0f32; frame_size / 2 + 1];

    let mut frames = Vec::with_capacity(n_frames);
    let mut silent_frames = 0usize;

    for i in 0..n_frames {
        let start = i * hop_size;
        let frame = &samples[start..start + frame_size];
        let time = start as f32 / sample_rate as f32;

        if silence.is_silent(frame) {
            silent_frames += 1;
            frames.push(ChromaFrame::silent(time));
            continue;
        }

        for (slot, (&s, &w)) in buffer.iter_mut().zip(frame.iter().zip(window.iter())) {
            *slot = Complex::new(s * w, 0.0);
        }
        fft.process(&mut buffer);
        for (p, c) in power.iter_mut().zip(buffer.iter()) {
            *p = c.norm_sqr();
        }

        let mut energies = mapper.project(&power);
        l2_normalize(&mut energies);
        if (config.chroma_sharpening_power - 1.0).abs() > f32::EPSILON {
            energies = sharpen_chroma(&energies, config.chroma_sharpening_power);
        }
        frames.push(ChromaFrame::new(time, energies));
    }

    if silent_frames > 0 {
        log::debug!("{} of {} frames below silence threshold", silent_frames, n_frames);
    }

    Ok(smooth_chroma(&frames, config.chroma_smoothing_window))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freqs: &[f32], sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                freqs
                    .iter()
                    .map(|f| (2.0 * std::f32::consts::PI * f * t).sin())
                    .sum::<f32>()
                    / freqs.len() as f32
                    * 0.5
            })
            .collect()
    }

    #[test]
    fn test_a440_maps_to_a() {
        let samples = tone(&[440.0], 44100, 0.5);
        let frames = extract_chroma(&samples, 44100, &AnalysisConfig::default()).unwrap();
        assert!(!frames.is_empty());
        for frame in &frames {
            assert_eq!(frame.dominant_pitch_class(), Some(9));
        }
    }

    #[test]
    fn test_c_major_triad_energy() {
        // C4, E4, G4
        let samples = tone(&[261.63, 329.63, 392.0], 44100, 0.5);
        let frames = extract_chroma(&samples, 44100, &AnalysisConfig::default()).unwrap();
        let mid = &frames[frames.len() / 2];
        let chord_energy = mid.energies[0] + mid.energies[4] + mid.energies[7];
        let other: f32 = mid
            .energies
            .iter()
            .enumerate()
            .filter(|(i, _)| ![0, 4, 7].contains(i))
            .map(|(_, e)| e)
            .sum();
        assert!(chord_energy > other);
    }

    #[test]
    fn test_frame_times_and_count() {
        let samples = tone(&[440.0], 44100, 1.0);
        let config = AnalysisConfig::default();
        let frames = extract_chroma(&samples, 44100, &config).unwrap();
        assert_eq!(frames.len(), frame_count(44100, 2048, 512));
        assert_eq!(frames[0].time, 0.0);
        assert!((frames[1].time - 512.0 / 44100.0).abs() < 1e-6);
    }

    #[test]
    fn test_silent_input_yields_silent_frames() {
        let samples = vec![0.0f32; 44100];
        let frames = extract_chroma(&samples, 44100, &AnalysisConfig::default()).unwrap();
        assert!(frames.iter().all(|f| f.is_silent()));
    }

    #[test]
    fn test_invalid_inputs() {
        let config = AnalysisConfig::default();
        assert!(matches!(
            extract_chroma(&[], 44100, &config),
            Err(AnalysisError::InvalidAudio(_))
        ));
        assert!(matches!(
            extract_chroma(&[0.1; 4096], 0, &config),
            Err(AnalysisError::InvalidAudio(_))
        ));
        assert!(matches!(
            extract_chroma(&[0.1; 100], 44100, &config),
            Err(AnalysisError::InvalidAudio(_))
        ));
    }

    #[test]
    fn test_hard_mapping() {
        let samples = tone(&[440.0], 44100, 0.5);
        let config = AnalysisConfig {
            soft_chroma_mapping: false,
            ..AnalysisConfig::default()
        };
        let frames = extract_chroma(&samples, 44100, &config).unwrap();
        assert_eq!(frames[frames.len() / 2].dominant_pitch_class(), Some(9));
    }
}
