//! Per-connection fan-out of a coupling kernel.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::parallel::prelude::*;
use ndarray::{Array3, ArrayView3, ArrayViewMut2, Axis};
use num_complex::Complex64;
use tracing::{debug, info, warn};

use super::{ConnectionSpectra, Connections, CouplingKernel, FrequencyAxis};
use crate::kernel::ConfigError;
use crate::{Error, Result};

/// How many workers a computation may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parallelism {
    /// Run every connection on the calling thread.
    Sequential,
    /// Run connections on a dedicated pool of this many threads.
    Workers(NonZeroUsize),
}

impl Parallelism {
    /// Resolve a job count against the machine's available parallelism.
    ///
    /// `1` is sequential, negative values use every available core and values
    /// above the available core count are capped. `0` is rejected.
    pub fn from_n_jobs(n_jobs: isize) -> core::result::Result<Self, ConfigError> {
        let available = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::resolve(n_jobs, available)
    }

    /// Resolve a job count against an explicit core count.
    pub fn resolve(n_jobs: isize, available: usize) -> core::result::Result<Self, ConfigError> {
        if n_jobs == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "n_jobs",
                reason: "n_jobs must be non-zero",
            });
        }
        let available = available.max(1);
        let workers = if n_jobs < 0 {
            available
        } else if n_jobs.unsigned_abs() > available {
            warn!(
                n_jobs,
                available, "n_jobs exceeds available parallelism, capping"
            );
            available
        } else {
            n_jobs.unsigned_abs()
        };

        Ok(match NonZeroUsize::new(workers) {
            Some(n) if n.get() > 1 => Parallelism::Workers(n),
            _ => Parallelism::Sequential,
        })
    }

    /// Number of threads the computation will use.
    pub fn workers(&self) -> usize {
        match self {
            Parallelism::Sequential => 1,
            Parallelism::Workers(n) => n.get(),
        }
    }
}

/// Progress sink notified once per finished connection.
///
/// Notifications may arrive from several worker threads. Each count from `1`
/// to `total` is delivered exactly once, in unspecified order.
pub trait Progress: Sync {
    /// `completed` of `total` connections are done.
    fn advance(&self, completed: usize, total: usize);
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&self, _: usize, _: usize) {}
}

/// Reports progress as `tracing` events, roughly every tenth of the work.
#[derive(Debug, Clone)]
pub struct TracingProgress {
    label: String,
}

impl TracingProgress {
    /// Progress reporter whose events carry `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Progress for TracingProgress {
    fn advance(&self, completed: usize, total: usize) {
        let step = (total / 10).max(1);
        if completed == total || completed % step == 0 {
            info!(label = %self.label, completed, total, "processing connections");
        }
    }
}

/// Inputs shared read-only by every connection task.
#[derive(Debug, Clone, Copy)]
pub struct DispatchInput<'a> {
    /// `[epochs, channels, frequencies]` FFT coefficients.
    pub data: ArrayView3<'a, Complex64>,
    /// Frequency axis of `data`.
    pub axis: &'a FrequencyAxis,
    /// Connections, in output order.
    pub connections: &'a Connections,
    /// Low frequencies.
    pub f1s: &'a [f64],
    /// High frequencies.
    pub f2s: &'a [f64],
}

/// Run `kernel` once per connection and stack the matrices.
///
/// Returns `[connections, f2s, f1s]`. Each task writes only into the output
/// slot at its own connection position, so the connection axis follows the
/// input order whatever order the workers finish in. The first failing
/// connection aborts the run.
pub fn dispatch<K, P>(
    kernel: &K,
    input: DispatchInput<'_>,
    parallelism: Parallelism,
    progress: &P,
) -> Result<Array3<f64>>
where
    K: CouplingKernel + ?Sized,
    P: Progress + ?Sized,
{
    let total = input.connections.len();
    let mut out = Array3::from_elem((total, input.f2s.len(), input.f1s.len()), f64::NAN);
    let completed = AtomicUsize::new(0);

    let run = |index: usize, slot: ArrayViewMut2<'_, f64>| -> Result<()> {
        let seed = input.connections.seeds()[index];
        let target = input.connections.targets()[index];
        let spectra = ConnectionSpectra::from_tensor(input.data, seed, target);
        kernel
            .run_into(&spectra, input.axis, input.f1s, input.f2s, slot)
            .map_err(|source| Error::Connection {
                index,
                seed,
                target,
                source,
            })?;
        debug!(index, seed, target, "connection finished");
        progress.advance(completed.fetch_add(1, Ordering::Relaxed) + 1, total);
        Ok(())
    };

    match parallelism {
        Parallelism::Sequential => out
            .axis_iter_mut(Axis(0))
            .enumerate()
            .try_for_each(|(index, slot)| run(index, slot))?,
        Parallelism::Workers(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n.get())
                .thread_name(|i| format!("cfc-worker-{i}"))
                .build()
                .map_err(|err| Error::ThreadPool {
                    reason: err.to_string(),
                })?;
            pool.install(|| {
                out.axis_iter_mut(Axis(0))
                    .into_par_iter()
                    .enumerate()
                    .try_for_each(|(index, slot)| run(index, slot))
            })?
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfc::PpcKernel;
    use crate::kernel::ExecInvariantViolation;
    use ndarray::Array2;
    use std::sync::Mutex;

    fn tensor(n_epochs: usize, n_chans: usize, n_freqs: usize) -> ndarray::Array3<Complex64> {
        ndarray::Array3::from_shape_fn((n_epochs, n_chans, n_freqs), |(e, c, f)| {
            let phase = 0.37 * (e * 7 + c * 3 + f) as f64;
            Complex64::from_polar(1.0 + 0.1 * (c + f) as f64, phase)
        })
    }

    /// Writes the connection's seed/target into every cell.
    struct Tagger;

    impl CouplingKernel for Tagger {
        fn name(&self) -> &str {
            "tag"
        }

        fn run_into(
            &self,
            spectra: &ConnectionSpectra<'_>,
            _: &FrequencyAxis,
            _: &[f64],
            _: &[f64],
            mut out: ndarray::ArrayViewMut2<'_, f64>,
        ) -> core::result::Result<(), ExecInvariantViolation> {
            // channel c at epoch 0, freq 0 has magnitude 1 + 0.1 c
            let seed = ((spectra.seed()[[0, 0]].norm() - 1.0) * 10.0).round();
            let target = ((spectra.target()[[0, 0]].norm() - 1.0) * 10.0).round();
            out.fill(seed * 100.0 + target);
            Ok(())
        }
    }

    /// Fails on one seed channel.
    struct FailOnSeed(usize);

    impl CouplingKernel for FailOnSeed {
        fn name(&self) -> &str {
            "fail"
        }

        fn run_into(
            &self,
            spectra: &ConnectionSpectra<'_>,
            _: &FrequencyAxis,
            _: &[f64],
            _: &[f64],
            mut out: ndarray::ArrayViewMut2<'_, f64>,
        ) -> core::result::Result<(), ExecInvariantViolation> {
            let seed = ((spectra.seed()[[0, 0]].norm() - 1.0) * 10.0).round() as usize;
            if seed == self.0 {
                return Err(ExecInvariantViolation::InvalidState {
                    reason: "malformed connection",
                });
            }
            out.fill(0.0);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(usize, usize)>>);

    impl Progress for Recorder {
        fn advance(&self, completed: usize, total: usize) {
            self.0.lock().expect("recorder lock").push((completed, total));
        }
    }

    #[test]
    fn resolve_job_counts() {
        assert_eq!(Parallelism::resolve(1, 8).expect("valid"), Parallelism::Sequential);
        assert_eq!(Parallelism::resolve(4, 8).expect("valid").workers(), 4);
        assert_eq!(Parallelism::resolve(-1, 8).expect("valid").workers(), 8);
        assert_eq!(Parallelism::resolve(64, 8).expect("valid").workers(), 8);
        assert_eq!(Parallelism::resolve(-1, 1).expect("valid"), Parallelism::Sequential);
        assert!(matches!(
            Parallelism::resolve(0, 8),
            Err(ConfigError::InvalidArgument { arg: "n_jobs", .. })
        ));
    }

    #[test]
    fn output_follows_connection_order_in_parallel() {
        let data = tensor(2, 4, 3);
        let axis = FrequencyAxis::try_new(&[1., 2., 3.]).expect("valid axis");
        let connections =
            Connections::try_new(&[3, 0, 2, 1, 3], &[0, 1, 3, 2, 3], 4).expect("valid pairs");
        let input = DispatchInput {
            data: data.view(),
            axis: &axis,
            connections: &connections,
            f1s: &[1.],
            f2s: &[2., 3.],
        };
        let workers = Parallelism::Workers(NonZeroUsize::new(3).expect("non-zero"));
        let out = dispatch(&Tagger, input, workers, &NoProgress).expect("tagging succeeds");
        assert_eq!(out.dim(), (5, 2, 1));
        for (index, (seed, target)) in connections.iter().enumerate() {
            let expected = (seed * 100 + target) as f64;
            out.index_axis(Axis(0), index)
                .iter()
                .for_each(|v| assert_eq!(*v, expected));
        }
    }

    #[test]
    fn sequential_and_parallel_agree_bitwise() {
        let data = tensor(5, 3, 6);
        let freqs = [1., 2., 3., 4., 5., 6.];
        let axis = FrequencyAxis::try_new(&freqs).expect("valid axis");
        let connections = Connections::all(3);
        let input = DispatchInput {
            data: data.view(),
            axis: &axis,
            connections: &connections,
            f1s: &freqs,
            f2s: &freqs,
        };
        let seq = dispatch(&PpcKernel, input, Parallelism::Sequential, &NoProgress)
            .expect("sequential run");
        let par = dispatch(
            &PpcKernel,
            input,
            Parallelism::Workers(NonZeroUsize::new(4).expect("non-zero")),
            &NoProgress,
        )
        .expect("parallel run");
        assert_eq!(seq.dim(), par.dim());
        seq.iter()
            .zip(par.iter())
            .for_each(|(a, b)| assert_eq!(a.to_bits(), b.to_bits()));
    }

    #[test]
    fn failing_connection_is_identified() {
        let data = tensor(2, 3, 2);
        let axis = FrequencyAxis::try_new(&[1., 2.]).expect("valid axis");
        let connections = Connections::try_new(&[0, 1, 2], &[1, 2, 0], 3).expect("valid pairs");
        let input = DispatchInput {
            data: data.view(),
            axis: &axis,
            connections: &connections,
            f1s: &[1.],
            f2s: &[2.],
        };
        for parallelism in [
            Parallelism::Sequential,
            Parallelism::Workers(NonZeroUsize::new(2).expect("non-zero")),
        ] {
            let err = dispatch(&FailOnSeed(2), input, parallelism, &NoProgress)
                .expect_err("seed 2 fails");
            assert_eq!(
                err,
                Error::Connection {
                    index: 2,
                    seed: 2,
                    target: 0,
                    source: ExecInvariantViolation::InvalidState {
                        reason: "malformed connection",
                    },
                }
            );
        }
    }

    #[test]
    fn progress_counts_every_connection() {
        let data = tensor(2, 2, 2);
        let axis = FrequencyAxis::try_new(&[1., 2.]).expect("valid axis");
        let connections = Connections::all(2);
        let input = DispatchInput {
            data: data.view(),
            axis: &axis,
            connections: &connections,
            f1s: &[1.],
            f2s: &[2.],
        };
        let recorder = Recorder::default();
        dispatch(
            &PpcKernel,
            input,
            Parallelism::Workers(NonZeroUsize::new(2).expect("non-zero")),
            &recorder,
        )
        .expect("run succeeds");
        let mut seen = recorder.0.into_inner().expect("recorder lock");
        seen.sort_unstable();
        assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[test]
    fn kernel_output_is_independent_of_neighbours() {
        let data = tensor(3, 2, 4);
        let freqs = [1., 2., 3., 4.];
        let axis = FrequencyAxis::try_new(&freqs).expect("valid axis");
        let connections = Connections::try_new(&[0, 1], &[1, 0], 2).expect("valid pairs");
        let input = DispatchInput {
            data: data.view(),
            axis: &axis,
            connections: &connections,
            f1s: &[1., 2.],
            f2s: &[3., 4.],
        };
        let stacked =
            dispatch(&PpcKernel, input, Parallelism::Sequential, &NoProgress).expect("run");
        let single: Array2<f64> = PpcKernel
            .run_alloc(
                &ConnectionSpectra::from_tensor(data.view(), 1, 0),
                &axis,
                &[1., 2.],
                &[3., 4.],
            )
            .expect("single connection");
        assert_eq!(stacked.index_axis(Axis(0), 1), single);
    }
}
