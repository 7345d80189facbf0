//! Phase-phase coupling (PPC).
//!
//! For every `(f1, f2)` cell with `f1 < f2` the seed's coefficients at `f1` and
//! the target's coefficients at `f2` are combined over epochs as
//!
//! ```text
//!            | mean_e( |X(f1)| |Y(f2)| exp(i (phase(X(f1)) f2/f1 - phase(Y(f2)))) ) |
//! PPC = ------------------------------------------------------------------------------
//!                              mean_e( |X(f1)| |Y(f2)| )
//! ```
//!
//! with phases in degrees. The score lies in `[0, 1]`.
//!
//! Undefined cells are `NaN`:
//! * `f1 >= f2`,
//! * `f1 == 0`, where the harmonic ratio `f2 / f1` does not exist,
//! * all epoch amplitudes zero, where the denominator vanishes.

use ndarray::{Array2, ArrayView1, ArrayView3, ArrayViewMut2, Axis};
use num_complex::Complex64;

use super::{ConnectionSpectra, CouplingKernel, FrequencyAxis};
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};

/// Empty config for [`PpcKernel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PpcConfig;

/// Phase-phase coupling kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct PpcKernel;

impl KernelLifecycle for PpcKernel {
    type Config = PpcConfig;

    fn try_new(_: Self::Config) -> Result<Self, ConfigError> {
        Ok(Self)
    }
}

impl CouplingKernel for PpcKernel {
    fn name(&self) -> &str {
        "PPC"
    }

    fn run_into(
        &self,
        spectra: &ConnectionSpectra<'_>,
        axis: &FrequencyAxis,
        f1s: &[f64],
        f2s: &[f64],
        mut out: ArrayViewMut2<'_, f64>,
    ) -> Result<(), ExecInvariantViolation> {
        if spectra.seed().dim() != spectra.target().dim() {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "seed and target spectra must have the same shape",
            });
        }
        if spectra.n_epochs() == 0 {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "ppc requires at least one epoch",
            });
        }
        if spectra.n_freqs() != axis.len() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "freqs",
                expected: spectra.n_freqs(),
                got: axis.len(),
            });
        }
        if out.nrows() != f2s.len() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "out",
                expected: f2s.len(),
                got: out.nrows(),
            });
        }
        if out.ncols() != f1s.len() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "out",
                expected: f1s.len(),
                got: out.ncols(),
            });
        }

        out.fill(f64::NAN);
        let (seed, target) = (spectra.seed(), spectra.target());
        for (f1_i, &f1) in f1s.iter().enumerate() {
            for (f2_i, &f2) in f2s.iter().enumerate() {
                if f1 >= f2 {
                    continue;
                }
                let fft_f1 = seed.column(axis.find_first(f1)?);
                let fft_f2 = target.column(axis.find_first(f2)?);
                out[[f2_i, f1_i]] = phase_coupling(fft_f1, fft_f2, f1, f2);
            }
        }
        Ok(())
    }
}

fn phase_coupling(
    fft_f1: ArrayView1<'_, Complex64>,
    fft_f2: ArrayView1<'_, Complex64>,
    f1: f64,
    f2: f64,
) -> f64 {
    if f1 == 0.0 {
        return f64::NAN;
    }
    let ratio = f2 / f1;

    // amplitudes are normalised by their peaks so tiny inputs do not underflow
    let (peak_f1, peak_f2) = (peak_amplitude(&fft_f1), peak_amplitude(&fft_f2));
    if peak_f1 == 0.0 || peak_f2 == 0.0 {
        return f64::NAN;
    }

    let mut numerator = Complex64::new(0.0, 0.0);
    let mut denominator = 0.0;
    for (x, y) in fft_f1.iter().zip(fft_f2.iter()) {
        let amplitude = (x.norm() / peak_f1) * (y.norm() / peak_f2);
        let phase = x.arg().to_degrees() * ratio - y.arg().to_degrees();
        numerator += Complex64::from_polar(amplitude, phase);
        denominator += amplitude;
    }
    if denominator == 0.0 {
        return f64::NAN;
    }

    let n_epochs = fft_f1.len() as f64;
    (numerator / n_epochs).norm() / (denominator / n_epochs)
}

fn peak_amplitude(fft: &ArrayView1<'_, Complex64>) -> f64 {
    fft.iter().map(|c| c.norm()).fold(0.0, f64::max)
}

/// PPC for a single connection.
///
/// # Parameters
/// * `data` : `[epochs, 2, frequencies]` FFT coefficients, seed at channel 0 and
///   target at channel 1.
/// * `freqs` : Frequencies of the last axis of `data`.
/// * `f1s`, `f2s` : Low and high frequencies to compute coupling for.
///
/// Returns the `[f2s.len(), f1s.len()]` coupling matrix.
pub fn ppc(
    data: ArrayView3<'_, Complex64>,
    freqs: &[f64],
    f1s: &[f64],
    f2s: &[f64],
) -> Result<Array2<f64>, ExecInvariantViolation> {
    if data.len_of(Axis(1)) != 2 {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "data",
            expected: 2,
            got: data.len_of(Axis(1)),
        });
    }
    let axis = FrequencyAxis::try_new(freqs)?;
    PpcKernel.run_alloc(&ConnectionSpectra::from_tensor(data, 0, 1), &axis, f1s, f2s)
}
