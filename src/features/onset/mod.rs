//! Onset detection modules
//!
//! Energy flux envelope and onset picking, feeding tempo estimation.

pub mod energy_flux;

pub use energy_flux::{energy_flux_envelope, pick_onsets};
