//! Analysis and result aggregation modules
//!
//! Turns per-frame detector output into the final progression:
//! - Canonical chord labels
//! - Ensemble selection between detectors
//! - Segment building and smoothing
//! - Output assembly, result types and metadata
//! - Confidence scoring

pub mod assembler;
pub mod chord;
pub mod confidence;
pub mod ensemble;
pub mod metadata;
pub mod result;
pub mod segments;
