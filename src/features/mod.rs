//! Feature extraction modules
//!
//! This module contains all feature extraction algorithms:
//! - Chroma extraction
//! - Chord templates and correlation detection
//! - Onset strength (energy flux)
//! - Period estimation (BPM detection)

pub mod chords;
pub mod chroma;
pub mod onset;
pub mod period;
