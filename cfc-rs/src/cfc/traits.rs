//! Trait interfaces for coupling metrics.
//!
//! A coupling metric is a strategy that turns one connection's spectra into an
//! `[f2, f1]` matrix. Selection, dispatch and result storage are shared.

use ndarray::{Array2, ArrayView2, ArrayView3, ArrayViewMut2, Axis};
use num_complex::Complex64;

use super::FrequencyAxis;
use crate::kernel::ExecInvariantViolation;

/// Read-only spectra of one connection, each `[epochs, frequencies]`.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSpectra<'a> {
    seed: ArrayView2<'a, Complex64>,
    target: ArrayView2<'a, Complex64>,
}

impl<'a> ConnectionSpectra<'a> {
    /// Pair seed and target spectra.
    pub fn new(seed: ArrayView2<'a, Complex64>, target: ArrayView2<'a, Complex64>) -> Self {
        Self { seed, target }
    }

    /// Slice a `[epochs, channels, frequencies]` tensor at the given channels.
    ///
    /// # Panics
    /// If `seed` or `target` is not a valid channel index of `data`.
    pub fn from_tensor(data: ArrayView3<'a, Complex64>, seed: usize, target: usize) -> Self {
        Self {
            seed: data.index_axis_move(Axis(1), seed),
            target: data.index_axis_move(Axis(1), target),
        }
    }

    /// Seed channel coefficients.
    pub fn seed(&self) -> ArrayView2<'a, Complex64> {
        self.seed
    }

    /// Target channel coefficients.
    pub fn target(&self) -> ArrayView2<'a, Complex64> {
        self.target
    }

    /// Number of epochs.
    pub fn n_epochs(&self) -> usize {
        self.seed.nrows()
    }

    /// Number of frequency bins.
    pub fn n_freqs(&self) -> usize {
        self.seed.ncols()
    }
}

/// Capability: compute one connection's coupling matrix.
///
/// Implementations are shared read-only between dispatch workers.
pub trait CouplingKernel: Sync {
    /// Human-readable metric name stored with the results.
    fn name(&self) -> &str;

    /// Compute the `[f2s.len(), f1s.len()]` coupling matrix into `out`.
    ///
    /// Every cell of `out` is written, undefined cells as `NaN`.
    fn run_into(
        &self,
        spectra: &ConnectionSpectra<'_>,
        axis: &FrequencyAxis,
        f1s: &[f64],
        f2s: &[f64],
        out: ArrayViewMut2<'_, f64>,
    ) -> Result<(), ExecInvariantViolation>;

    /// Compute the coupling matrix and allocate output.
    fn run_alloc(
        &self,
        spectra: &ConnectionSpectra<'_>,
        axis: &FrequencyAxis,
        f1s: &[f64],
        f2s: &[f64],
    ) -> Result<Array2<f64>, ExecInvariantViolation> {
        let mut out = Array2::from_elem((f2s.len(), f1s.len()), f64::NAN);
        self.run_into(spectra, axis, f1s, f2s, out.view_mut())?;
        Ok(out)
    }
}

impl<K> CouplingKernel for &K
where
    K: CouplingKernel + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run_into(
        &self,
        spectra: &ConnectionSpectra<'_>,
        axis: &FrequencyAxis,
        f1s: &[f64],
        f2s: &[f64],
        out: ArrayViewMut2<'_, f64>,
    ) -> Result<(), ExecInvariantViolation> {
        (**self).run_into(spectra, axis, f1s, f2s, out)
    }
}

impl<K> CouplingKernel for Box<K>
where
    K: CouplingKernel + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run_into(
        &self,
        spectra: &ConnectionSpectra<'_>,
        axis: &FrequencyAxis,
        f1s: &[f64],
        f2s: &[f64],
        out: ArrayViewMut2<'_, f64>,
    ) -> Result<(), ExecInvariantViolation> {
        (**self).run_into(spectra, axis, f1s, f2s, out)
    }
}
