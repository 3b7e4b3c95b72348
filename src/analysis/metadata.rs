//! Analysis metadata structures

use super::result::{AnalysisFlag, TempoSource};
use serde::{Deserialize, Serialize};

/// Analysis metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Duration in seconds
    pub duration_seconds: f32,

    /// Sample rate in Hz (0 when analyzing precomputed chroma)
    pub sample_rate: u32,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Simplicity preference actually applied, after clamping
    pub simplicity: f32,

    /// Where the tempo came from
    pub tempo_source: TempoSource,

    /// Detectors that contributed labels
    pub methods_used: Vec<String>,

    /// Segments carrying a chord
    pub total_chords: usize,

    /// Distinct chord labels
    pub unique_chords: usize,

    /// Analysis flags
    pub flags: Vec<AnalysisFlag>,

    /// Non-fatal problems encountered along the way
    pub warnings: Vec<String>,
}

impl AnalysisMetadata {
    /// Record a non-fatal problem
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Add a flag once
    pub fn flag(&mut self, flag: AnalysisFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }
}

impl Default for AnalysisMetadata {
    fn default() -> Self {
        Self {
            duration_seconds: 0.0,
            sample_rate: 0,
            processing_time_ms: 0.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            simplicity: 0.5,
            tempo_source: TempoSource::Default,
            methods_used: vec![],
            total_chords: 0,
            unique_chords: 0,
            flags: vec![],
            warnings: vec![],
        }
    }
}
