//! Chroma extraction modules
//!
//! Extract pitch-class distribution (12 semitones) from audio:
//! - Chroma vector computation
//! - Normalization strategies
//! - Temporal smoothing

pub mod extractor;
pub mod normalization;
pub mod smoothing;

pub use extractor::extract_chroma;

use serde::{Deserialize, Serialize};

/// One analysis frame of pitch-class energy
///
/// `energies[0]` is C, `energies[11]` is B. Frames produced by the extractor
/// are L2-normalized; silent frames are all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChromaFrame {
    /// Frame start time in seconds
    pub time: f32,
    /// Pitch-class energies
    pub energies: [f32; 12],
}

impl ChromaFrame {
    /// Create a frame from raw energies
    pub fn new(time: f32, energies: [f32; 12]) -> Self {
        Self { time, energies }
    }

    /// Frame with no pitched energy
    pub fn silent(time: f32) -> Self {
        Self {
            time,
            energies: [0.0; 12],
        }
    }

    /// Whether the frame carries no pitched energy
    pub fn is_silent(&self) -> bool {
        normalization::l2_norm(&self.energies) <= 1e-9
    }

    /// Index of the strongest pitch class, `None` for silent frames
    pub fn dominant_pitch_class(&self) -> Option<usize> {
        if self.is_silent() {
            return None;
        }
        self.energies
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }
}
