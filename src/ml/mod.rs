//! Pretrained sequence model detector
//!
//! - `ChordSequenceModel` trait and the bundled Viterbi HMM
//! - Load-once model handle with an optional inference timeout

pub mod model_handle;
pub mod sequence_model;

pub use model_handle::{run_with_timeout, ModelHandle};
pub use sequence_model::{ChordSequenceModel, HmmChordModel, HmmWeights};
