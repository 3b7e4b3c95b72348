//! # Stratum Chords
//!
//! A chord progression detection engine: turns a mono audio signal into a
//! time-stamped, tempo-aware chord timeline with confidence scores.
//!
//! ## Features
//!
//! - **Chroma Extraction**: STFT pitch-class energy with soft semitone mapping and median smoothing
//! - **Template Correlation**: 13 chord qualities x 12 roots scored by cosine similarity
//! - **Sequence Model**: Viterbi HMM labeler behind a pluggable, lazily loaded handle
//! - **Ensemble Selection**: Per-frame arbitration between both detectors
//! - **Rhythm-Aware Smoothing**: Beat thresholds tuned by a simplicity preference
//!
//! ## Quick Start
//!
//! ```no_run
//! use stratum_chords::{analyze_chords, AnalysisConfig};
//!
//! // Load audio samples (mono, f32)
//! let samples: Vec<f32> = vec![0.0; 44100 * 10];
//! let sample_rate = 44100;
//!
//! let config = AnalysisConfig::default().with_simplicity(0.7);
//! let progression = analyze_chords(&samples, sample_rate, &config)?;
//!
//! for event in progression.to_events() {
//!     println!("{:>7.2}s {:<6} {} beats", event.time, event.chord, event.beats);
//! }
//! # Ok::<(), stratum_chords::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Audio → Chroma → Correlation + Sequence Model → Ensemble → Segments → Smoothing → Progression
//!                 ↘ Tempo ───────────────────────────────────────────↗
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod ml;
pub mod preprocessing;

// Re-export main types
pub use analysis::chord::{ChordLabel, ChordQuality, PitchClass};
pub use analysis::confidence::{compute_confidence, ProgressionConfidence};
pub use analysis::metadata::AnalysisMetadata;
pub use analysis::result::{
    AnalysisFlag, BeatGrid, ChordEvent, ChordSegment, HarmonicRole, Progression, TempoSource,
    TimeSignature,
};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use features::chroma::ChromaFrame;
pub use ml::{ChordSequenceModel, ModelHandle};

use analysis::assembler::assemble_progression;
use analysis::ensemble::{DetectorOutput, EnsembleSelector};
use analysis::segments::{build_segments, smooth_segments};
use features::chords::{CandidateSource, CorrelationDetector, TemplateBank};
use features::chroma::extract_chroma;
use features::period::{resolve_tempo, TempoResolution};
use preprocessing::normalization::{normalize_peak, NormalizationConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Chord analysis engine
///
/// Holds the read-only shared state of an analysis: the template bank and,
/// optionally, a handle to the sequence model. Cloning is cheap and an
/// engine can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct ChordEngine {
    templates: &'static TemplateBank,
    model: Option<Arc<ModelHandle>>,
}

impl Default for ChordEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ChordEngine {
    /// Engine with the process-wide bundled model
    pub fn new() -> Self {
        Self::with_model(ModelHandle::shared())
    }

    /// Engine with a caller-supplied model handle
    pub fn with_model(model: Arc<ModelHandle>) -> Self {
        Self {
            templates: TemplateBank::shared(),
            model: Some(model),
        }
    }

    /// Engine using only the correlation detector
    pub fn correlation_only() -> Self {
        Self {
            templates: TemplateBank::shared(),
            model: None,
        }
    }

    /// Template bank used by the correlation detector
    pub fn templates(&self) -> &'static TemplateBank {
        self.templates
    }

    /// Analyze audio samples
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono audio samples in [-1.0, 1.0]
    /// * `sample_rate` - Sample rate in Hz
    /// * `config` - Analysis configuration
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidAudio` for empty, non-finite or too
    /// short signals and `AnalysisError::InvalidInput` for a bad
    /// configuration. Tempo and model failures are not errors; they are
    /// reported in the progression metadata.
    pub fn analyze(
        &self,
        samples: &[f32],
        sample_rate: u32,
        config: &AnalysisConfig,
    ) -> Result<Progression, AnalysisError> {
        self.analyze_with_progress(samples, sample_rate, config, &mut |_, _| {})
    }

    /// Analyze audio samples, reporting progress
    ///
    /// `progress` receives increasing fractions in [0, 1] with a stage name;
    /// the last call is always `1.0`.
    pub fn analyze_with_progress(
        &self,
        samples: &[f32],
        sample_rate: u32,
        config: &AnalysisConfig,
        progress: &mut dyn FnMut(f32, &str),
    ) -> Result<Progression, AnalysisError> {
        let start_time = Instant::now();
        config.validate()?;

        log::debug!(
            "Starting chord analysis: {} samples at {} Hz",
            samples.len(),
            sample_rate
        );

        if samples.is_empty() {
            return Err(AnalysisError::InvalidAudio("Empty audio samples".to_string()));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidAudio("Invalid sample rate: 0".to_string()));
        }
        if let Some(i) = samples.iter().position(|s| !s.is_finite()) {
            return Err(AnalysisError::InvalidAudio(format!(
                "Non-finite sample at index {}",
                i
            )));
        }

        progress(0.0, "Preprocessing");
        let mut processed = samples.to_vec();
        let loudness = normalize_peak(&mut processed, &NormalizationConfig::default());
        log::debug!(
            "Normalized: peak {:.1} dB, rms {:.1} dB, gain {:.1} dB",
            loudness.peak_db,
            loudness.rms_db,
            loudness.gain_db
        );

        progress(0.1, "Extracting chroma");
        let frames = extract_chroma(&processed, sample_rate, config)?;

        progress(0.3, "Estimating tempo");
        let tempo = resolve_tempo(Some(&processed), sample_rate, config);

        let duration = samples.len() as f32 / sample_rate as f32;
        self.run(&frames, duration, sample_rate, tempo, config, progress, start_time)
    }

    /// Analyze precomputed chroma frames
    ///
    /// Tempo cannot be detected without audio: the BPM override is used if
    /// valid, otherwise the default BPM.
    ///
    /// # Arguments
    ///
    /// * `frames` - Chroma frames with ascending times in `[0, duration)`
    /// * `duration` - Track duration in seconds
    /// * `config` - Analysis configuration
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidAudio` for an empty frame sequence and
    /// `AnalysisError::InvalidInput` for unordered frames or a bad duration
    pub fn analyze_chroma(
        &self,
        frames: &[ChromaFrame],
        duration: f32,
        config: &AnalysisConfig,
    ) -> Result<Progression, AnalysisError> {
        let start_time = Instant::now();
        config.validate()?;

        if frames.is_empty() {
            return Err(AnalysisError::InvalidAudio("No chroma frames".to_string()));
        }
        if !(duration.is_finite() && duration > 0.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "Duration must be positive, got {}",
                duration
            )));
        }
        if frames[0].time < 0.0 || frames.windows(2).any(|w| !(w[1].time > w[0].time)) {
            return Err(AnalysisError::InvalidInput(
                "Chroma frame times must be non-negative and strictly increasing".to_string(),
            ));
        }
        if frames.iter().any(|f| f.time >= duration) {
            return Err(AnalysisError::InvalidInput(format!(
                "Chroma frames extend past the duration {:.3}s",
                duration
            )));
        }

        let tempo = resolve_tempo(None, 0, config);
        self.run(frames, duration, 0, tempo, config, &mut |_, _| {}, start_time)
    }

    /// Detection, ensemble, smoothing and assembly
    #[allow(clippy::too_many_arguments)]
    fn run(
        &self,
        frames: &[ChromaFrame],
        duration: f32,
        sample_rate: u32,
        tempo: TempoResolution,
        config: &AnalysisConfig,
        progress: &mut dyn FnMut(f32, &str),
        start_time: Instant,
    ) -> Result<Progression, AnalysisError> {
        let simplicity = config.effective_simplicity();
        let mut metadata = AnalysisMetadata {
            sample_rate,
            simplicity,
            ..Default::default()
        };
        metadata.warnings.extend(tempo.warnings);
        let tempo = tempo.estimate;
        if tempo.source == TempoSource::Default {
            metadata.flag(AnalysisFlag::TempoFallback);
        }

        progress(0.45, "Running correlation detector");
        let detector = CorrelationDetector::new(self.templates, config.acceptance_threshold);
        let correlation = DetectorOutput::Correlation(detector.detect(frames));

        progress(0.6, "Running sequence model");
        let model = self.run_model(frames, config, &mut metadata);
        if !model.is_available() {
            metadata.flag(AnalysisFlag::SingleDetector);
        }
        for output in [&correlation, &model] {
            if output.is_available() {
                metadata.methods_used.push(output.method_name().to_string());
            }
        }

        let frame_times: Vec<f32> = frames.iter().map(|f| f.time).collect();
        let labels = EnsembleSelector::new(config.acceptance_threshold).select(
            &frame_times,
            &correlation,
            &model,
        )?;

        progress(0.85, "Smoothing");
        let raw = build_segments(&labels, duration, tempo.bpm);
        let smoothed = smooth_segments(raw, tempo.bpm, simplicity);

        progress(0.95, "Finalizing");
        let time_signature = config
            .time_signature
            .or_else(|| tempo.meter.map(|m| m.time_signature))
            .unwrap_or_default();
        let mut progression =
            assemble_progression(smoothed, &tempo, time_signature, duration, metadata)?;
        progression.metadata.processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

        log::info!(
            "Chord analysis complete: {} segments, {} chords ({} unique), {:.1} BPM ({:?}), {:.1} ms",
            progression.segments.len(),
            progression.metadata.total_chords,
            progression.metadata.unique_chords,
            progression.bpm,
            progression.metadata.tempo_source,
            progression.metadata.processing_time_ms
        );
        progress(1.0, "Complete");

        Ok(progression)
    }

    /// Run the sequence model, degrading to `Unavailable` on any failure
    fn run_model(
        &self,
        frames: &[ChromaFrame],
        config: &AnalysisConfig,
        metadata: &mut AnalysisMetadata,
    ) -> DetectorOutput {
        let handle = match (&self.model, config.enable_model) {
            (Some(handle), true) => handle,
            _ => {
                log::debug!("Sequence model disabled, correlation detector only");
                return DetectorOutput::Unavailable {
                    source: CandidateSource::Model,
                    reason: "disabled".to_string(),
                };
            }
        };

        let timeout = config.model_timeout_ms.map(Duration::from_millis);
        match handle.label_frames(frames, timeout) {
            Ok(candidates) => DetectorOutput::PretrainedModel(candidates),
            Err(e) => {
                metadata.warn(format!("{}; using correlation detector only", e));
                DetectorOutput::Unavailable {
                    source: CandidateSource::Model,
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Main analysis function
///
/// Analyzes audio samples with the default engine (bundled model included).
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// `Progression` with chord segments, tempo, beat grid and metadata
///
/// # Errors
///
/// Returns `AnalysisError` if the audio cannot be analyzed (empty, too short,
/// non-finite) or the configuration is invalid
///
/// # Example
///
/// ```no_run
/// use stratum_chords::{analyze_chords, AnalysisConfig};
///
/// let samples = vec![0.0f32; 44100 * 30]; // 30 seconds of silence
/// let progression = analyze_chords(&samples, 44100, &AnalysisConfig::default())?;
/// assert!(progression.is_empty());
/// # Ok::<(), stratum_chords::AnalysisError>(())
/// ```
pub fn analyze_chords(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<Progression, AnalysisError> {
    ChordEngine::new().analyze(samples, sample_rate, config)
}

/// `analyze_chords` with a progress callback
pub fn analyze_chords_with_progress(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
    progress: &mut dyn FnMut(f32, &str),
) -> Result<Progression, AnalysisError> {
    ChordEngine::new().analyze_with_progress(samples, sample_rate, config, progress)
}
