//! Channel mixing utilities (multi-channel to mono conversion)

use crate::error::AnalysisError;

/// Channel mixing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMixMode {
    /// Simple average of all channels
    Mono,
    /// Keep the louder of left/right per sample (stereo only, average otherwise)
    Dominant,
}

/// Convert stereo to mono
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the channels differ in length.
pub fn stereo_to_mono(
    left: &[f32],
    right: &[f32],
    mode: ChannelMixMode,
) -> Result<Vec<f32>, AnalysisError> {
    if left.len() != right.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "Channel length mismatch: left={}, right={}",
            left.len(),
            right.len()
        )));
    }

    log::debug!("Converting {} stereo frames to mono using {:?}", left.len(), mode);

    let mono = match mode {
        ChannelMixMode::Mono => left
            .iter()
            .zip(right.iter())
            .map(|(&l, &r)| (l + r) * 0.5)
            .collect(),
        ChannelMixMode::Dominant => left
            .iter()
            .zip(right.iter())
            .map(|(&l, &r)| if l.abs() >= r.abs() { l } else { r })
            .collect(),
    };
    Ok(mono)
}

/// Downmix interleaved samples with `channels` channels to mono by averaging
///
/// A trailing partial frame is ignored.
pub fn downmix_interleaved(samples: &[f32], channels: usize) -> Result<Vec<f32>, AnalysisError> {
    if channels == 0 {
        return Err(AnalysisError::InvalidInput(
            "Channel count must be > 0".to_string(),
        ));
    }
    if channels == 1 {
        return Ok(samples.to_vec());
    }
    let scale = 1.0 / channels as f32;
    Ok(samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect())
}
