//! Period estimation modules
//!
//! Convert the onset envelope to a tempo:
//! - Autocorrelation
//! - Peak picking
//! - Beat accents (octave-error correction, meter)
//! - Tempo resolution (override, detection, default) and beat phase

pub mod autocorrelation;
pub mod meter;
pub mod peak_picking;
pub mod tempo;

pub use meter::MeterEstimate;
pub use tempo::{resolve_tempo, TempoEstimate, TempoResolution};

/// BPM candidate with confidence
#[derive(Debug, Clone, PartialEq)]
pub struct BpmCandidate {
    /// BPM estimate
    pub bpm: f32,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,

    /// Beat period in envelope frames (fractional)
    pub lag: f32,
}
