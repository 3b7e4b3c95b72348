//! Audio decoding using Symphonia
//!
//! The engine consumes mono PCM; this is the upstream helper that turns an
//! audio container into that form for the demo, tests and callers that do
//! not bring their own decoder.

use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::downmix_interleaved;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded mono audio
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the source before downmixing
    pub source_channels: usize,
}

impl DecodedAudio {
    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode an audio file to mono f32 samples
///
/// # Errors
///
/// Returns `AnalysisError::DecodingError` if the file cannot be opened, has no
/// decodable audio track, or yields no samples.
pub fn decode_audio<P: AsRef<Path>>(path: P) -> Result<DecodedAudio, AnalysisError> {
    let path = path.as_ref();
    log::debug!("Decoding audio file: {}", path.display());

    let src = File::open(path)
        .map_err(|e| AnalysisError::DecodingError(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AnalysisError::DecodingError(format!("Unsupported format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::DecodingError("No supported audio tracks found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.ok_or_else(|| {
        AnalysisError::DecodingError("Track does not declare a sample rate".to_string())
    })?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::DecodingError(format!("No decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut source_channels = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AnalysisError::DecodingError(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count();
                source_channels = channels;

                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend(downmix_interleaved(buf.samples(), channels)?);
            }
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(AnalysisError::DecodingError(e.to_string())),
        }
    }

    if samples.is_empty() {
        return Err(AnalysisError::DecodingError(format!(
            "{} contains no audio samples",
            path.display()
        )));
    }

    log::debug!(
        "Decoded {} mono samples at {} Hz from {} channel(s)",
        samples.len(),
        sample_rate,
        source_channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        source_channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let result = decode_audio("/nonexistent/definitely_missing.wav");
        assert!(matches!(result, Err(AnalysisError::DecodingError(_))));
    }

    #[test]
    fn test_duration() {
        let audio = DecodedAudio {
            samples: vec![0.0; 22050],
            sample_rate: 44100,
            source_channels: 1,
        };
        assert!((audio.duration_seconds() - 0.5).abs() < 1e-6);
    }
}
