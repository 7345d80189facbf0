//! Cross-frequency coupling between channels of electrophysiological recordings.
//!
//! `cfc-rs` computes coupling statistics such as phase-phase coupling (PPC)
//! from pre-computed FFT coefficients, over every combination of requested low
//! (`f1`) and high (`f2`) frequencies, averaged over epochs and fanned out over
//! many channel pairs in parallel.
//!
//! * [`cfc`] holds the selectors, the [`cfc::CouplingKernel`] strategy trait,
//!   the PPC kernel, the dispatcher and the result container.
//! * [`kernel`] is the shared validation substrate.
//! * [`plot`] is a matplotlib-backed debug helper for inspecting results.

#![deny(missing_docs)]

pub mod cfc;
pub mod kernel;

/// Debug plotting through the system Python.
pub mod plot;

mod error;
pub use error::*;

pub use ndarray;
pub use num_complex;
