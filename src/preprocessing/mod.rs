//! Audio preprocessing modules
//!
//! This module contains utilities for preparing audio for analysis:
//! - Peak normalization
//! - Silence detection
//! - Channel mixing (stereo/interleaved to mono)

pub mod channel_mixer;
pub mod normalization;
pub mod silence;
