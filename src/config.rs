//! Configuration parameters for chord analysis

use crate::analysis::result::TimeSignature;
use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Lowest BPM accepted as a caller override
pub const MIN_OVERRIDE_BPM: f32 = 40.0;

/// Highest BPM accepted as a caller override
pub const MAX_OVERRIDE_BPM: f32 = 220.0;

/// Analysis configuration parameters
///
/// Every field has a documented default; deserializing a partial JSON object
/// fills the rest from [`AnalysisConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // STFT parameters
    /// Frame size for STFT (default: 2048)
    pub frame_size: usize,

    /// Hop size for STFT (default: 512)
    pub hop_size: usize,

    // Chroma extraction
    /// Lowest frequency folded into chroma (default: 55.0 Hz, A1)
    pub min_frequency: f32,

    /// Highest frequency folded into chroma (default: 5000.0 Hz)
    pub max_frequency: f32,

    /// Tuning reference (default: 440.0 Hz, A4)
    pub center_frequency: f32,

    /// Enable soft chroma mapping (default: true)
    /// Soft mapping spreads frequency bins to neighboring semitones for robustness
    pub soft_chroma_mapping: bool,

    /// Soft mapping standard deviation in semitones (default: 0.5)
    pub soft_mapping_sigma: f32,

    /// Chroma sharpening power (default: 1.0 = no sharpening)
    pub chroma_sharpening_power: f32,

    /// Temporal median filter width in frames (default: 5, 1 disables)
    pub chroma_smoothing_window: usize,

    /// Frames with RMS below this level are treated as silent (default: -60.0 dBFS)
    pub silence_threshold_db: f32,

    // Chord detection
    /// Correlation score below which a frame is labeled no-chord (default: 0.6)
    pub acceptance_threshold: f32,

    /// 0 = preserve maximal harmonic detail, 1 = maximal simplification (default: 0.5)
    pub simplicity_preference: f32,

    // Tempo
    /// Caller-supplied tempo, used verbatim when within 40-220 BPM
    pub bpm_override: Option<f32>,

    /// Minimum BPM considered by detection (default: 60.0)
    pub min_bpm: f32,

    /// Maximum BPM considered by detection (default: 200.0)
    pub max_bpm: f32,

    /// Tempo used when no periodicity is found (default: 120.0)
    pub default_bpm: f32,

    /// Pinned meter; `None` detects it from the beat accents and falls back
    /// to 4/4 (default: `None`)
    pub time_signature: Option<TimeSignature>,

    // Sequence model
    /// Run the pretrained sequence model alongside the correlation detector (default: true)
    pub enable_model: bool,

    /// Inference deadline in milliseconds; `None` waits indefinitely
    pub model_timeout_ms: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            min_frequency: 55.0,
            max_frequency: 5000.0,
            center_frequency: 440.0,
            soft_chroma_mapping: true,
            soft_mapping_sigma: 0.5,
            chroma_sharpening_power: 1.0,
            chroma_smoothing_window: 5,
            silence_threshold_db: -60.0,
            acceptance_threshold: 0.6,
            simplicity_preference: 0.5,
            bpm_override: None,
            min_bpm: 60.0,
            max_bpm: 200.0,
            default_bpm: 120.0,
            time_signature: None,
            enable_model: true,
            model_timeout_ms: None,
        }
    }
}

impl AnalysisConfig {
    /// Builder-style setter for the simplicity preference
    pub fn with_simplicity(mut self, simplicity_preference: f32) -> Self {
        self.simplicity_preference = simplicity_preference;
        self
    }

    /// Builder-style setter for the tempo override
    pub fn with_bpm_override(mut self, bpm: f32) -> Self {
        self.bpm_override = Some(bpm);
        self
    }

    /// Builder-style setter pinning the meter
    pub fn with_time_signature(mut self, time_signature: TimeSignature) -> Self {
        self.time_signature = Some(time_signature);
        self
    }

    /// Simplicity preference clamped to [0, 1]
    ///
    /// Non-finite values fall back to the default of 0.5.
    pub fn effective_simplicity(&self) -> f32 {
        let s = self.simplicity_preference;
        if !s.is_finite() {
            log::warn!("Non-finite simplicity preference, using 0.5");
            return 0.5;
        }
        if !(0.0..=1.0).contains(&s) {
            log::warn!("Simplicity preference {:.3} outside [0, 1], clamping", s);
        }
        s.clamp(0.0, 1.0)
    }

    /// Check parameters that would make analysis meaningless
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.frame_size < 16 {
            return Err(AnalysisError::InvalidInput(format!(
                "Frame size must be >= 16, got {}",
                self.frame_size
            )));
        }
        if self.hop_size == 0 || self.hop_size > self.frame_size {
            return Err(AnalysisError::InvalidInput(format!(
                "Hop size must be in [1, {}], got {}",
                self.frame_size, self.hop_size
            )));
        }
        if !(self.min_frequency > 0.0 && self.min_frequency < self.max_frequency) {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid chroma frequency range: [{:.1}, {:.1}]",
                self.min_frequency, self.max_frequency
            )));
        }
        if self.center_frequency <= 0.0 {
            return Err(AnalysisError::InvalidInput(
                "Center frequency must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.acceptance_threshold) {
            return Err(AnalysisError::InvalidInput(format!(
                "Acceptance threshold must be in [0, 1], got {}",
                self.acceptance_threshold
            )));
        }
        if self.min_bpm <= 0.0 || self.min_bpm >= self.max_bpm {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid BPM range: [{:.1}, {:.1}]",
                self.min_bpm, self.max_bpm
            )));
        }
        if !(MIN_OVERRIDE_BPM..=MAX_OVERRIDE_BPM).contains(&self.default_bpm) {
            return Err(AnalysisError::InvalidInput(format!(
                "Default BPM {:.1} outside [{}, {}]",
                self.default_bpm, MIN_OVERRIDE_BPM, MAX_OVERRIDE_BPM
            )));
        }
        if self.time_signature.map_or(false, |ts| !ts.is_valid()) {
            return Err(AnalysisError::InvalidInput(
                "Time signature components must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
