//! Silence detection
//!
//! Frame-level RMS gating. Silence is valid audio: silent frames are kept in
//! the timeline (they become no-chord frames), they are just never fed to the
//! template correlation with amplified noise.

use super::normalization::{amplitude_to_db, rms};

/// Silence detection configuration
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    /// Threshold in dBFS (default: -60.0)
    pub threshold_db: f32,

    /// Frame size for analysis (default: 2048)
    pub frame_size: usize,

    /// Hop between frames (default: 512)
    pub hop_size: usize,
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self {
            threshold_db: -60.0,
            frame_size: 2048,
            hop_size: 512,
        }
    }
}

impl SilenceDetector {
    /// True if a block of samples is below the silence threshold
    pub fn is_silent(&self, block: &[f32]) -> bool {
        amplitude_to_db(rms(block)) < self.threshold_db
    }

    /// Per-frame silence mask using the detector's framing
    ///
    /// Frame `i` covers `[i * hop_size, i * hop_size + frame_size)`; only full
    /// frames are produced.
    pub fn silence_mask(&self, samples: &[f32]) -> Vec<bool> {
        if self.frame_size == 0 || self.hop_size == 0 || samples.len() < self.frame_size {
            return Vec::new();
        }
        let n_frames = (samples.len() - self.frame_size) / self.hop_size + 1;
        (0..n_frames)
            .map(|i| {
                let start = i * self.hop_size;
                self.is_silent(&samples[start..start + self.frame_size])
            })
            .collect()
    }

    /// Fraction of frames that are silent (0.0 when there are no frames)
    pub fn silence_ratio(&self, samples: &[f32]) -> f32 {
        let mask = self.silence_mask(samples);
        if mask.is_empty() {
            return 0.0;
        }
        let silent = mask.iter().filter(|&&s| s).count();
        log::debug!("Silence: {}/{} frames below {:.1} dB", silent, mask.len(), self.threshold_db);
        silent as f32 / mask.len() as f32
    }
}
