//! Orchestration of a coupling computation over many connections.

use ndarray::{Array1, Array3, ArrayView1, ArrayView3, Axis};
use num_complex::Complex64;
use tracing::info;

use super::{
    dispatch, Connections, CouplingKernel, DispatchInput, FrequencyAxis, FrequencySelection,
    NoProgress, Parallelism, PpcKernel, Progress, Results, TracingProgress,
};
use crate::kernel::{ConfigError, KernelLifecycle};
use crate::Result;

/// What to compute in one [`CouplingProcess::compute`] call.
///
/// Every field defaults to "everything": all channel pairs, the whole frequency
/// axis for both grids, and a single sequential job.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeRequest {
    indices: Option<(Vec<usize>, Vec<usize>)>,
    f1: Option<Vec<f64>>,
    f2: Option<Vec<f64>>,
    n_jobs: isize,
}

impl Default for ComputeRequest {
    fn default() -> Self {
        Self {
            indices: None,
            f1: None,
            f2: None,
            n_jobs: 1,
        }
    }
}

impl ComputeRequest {
    /// Request with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed and target channel indices, paired by position.
    pub fn indices<S, T>(mut self, seeds: S, targets: T) -> Self
    where
        S: IntoIterator<Item = usize>,
        T: IntoIterator<Item = usize>,
    {
        self.indices = Some((seeds.into_iter().collect(), targets.into_iter().collect()));
        self
    }

    /// Low frequencies.
    pub fn f1<I: IntoIterator<Item = f64>>(mut self, f1: I) -> Self {
        self.f1 = Some(f1.into_iter().collect());
        self
    }

    /// High frequencies.
    pub fn f2<I: IntoIterator<Item = f64>>(mut self, f2: I) -> Self {
        self.f2 = Some(f2.into_iter().collect());
        self
    }

    /// Number of parallel jobs. `1` is sequential; negative uses every core.
    pub fn n_jobs(mut self, n_jobs: isize) -> Self {
        self.n_jobs = n_jobs;
        self
    }
}

/// Constructor config for [`CouplingProcess`].
#[derive(Debug, Clone)]
pub struct ProcessConfig<K> {
    /// `[epochs, channels, frequencies]` FFT coefficients.
    pub data: Array3<Complex64>,
    /// Frequencies of the last axis of `data`.
    pub freqs: Array1<f64>,
    /// Coupling metric.
    pub kernel: K,
    /// Whether to report progress through `tracing`.
    pub verbose: bool,
}

/// Coupling between channel pairs of one FFT tensor, computed with kernel `K`.
#[derive(Debug, Clone)]
pub struct CouplingProcess<K> {
    data: Array3<Complex64>,
    axis: FrequencyAxis,
    kernel: K,
    verbose: bool,
    results: Option<Results>,
}

/// Phase-phase coupling process.
pub type Ppc = CouplingProcess<PpcKernel>;

impl Ppc {
    /// PPC process over `data` with verbose progress.
    pub fn new(data: Array3<Complex64>, freqs: Array1<f64>) -> core::result::Result<Self, ConfigError> {
        Self::try_new(ProcessConfig {
            data,
            freqs,
            kernel: PpcKernel,
            verbose: true,
        })
    }
}

impl<K> KernelLifecycle for CouplingProcess<K>
where
    K: CouplingKernel,
{
    type Config = ProcessConfig<K>;

    fn try_new(config: Self::Config) -> core::result::Result<Self, ConfigError> {
        let (n_epochs, n_chans, n_freqs) = config.data.dim();
        if n_epochs == 0 {
            return Err(ConfigError::EmptyInput { arg: "epochs" });
        }
        if n_chans == 0 {
            return Err(ConfigError::EmptyInput { arg: "channels" });
        }
        if config.freqs.len() != n_freqs {
            return Err(ConfigError::LengthMismatch {
                arg: "freqs",
                expected: n_freqs,
                got: config.freqs.len(),
            });
        }
        let axis = FrequencyAxis::try_new(&config.freqs.to_vec())?;

        Ok(Self {
            data: config.data,
            axis,
            kernel: config.kernel,
            verbose: config.verbose,
            results: None,
        })
    }
}

impl<K> CouplingProcess<K>
where
    K: CouplingKernel,
{
    /// FFT coefficients.
    pub fn data(&self) -> ArrayView3<'_, Complex64> {
        self.data.view()
    }

    /// Frequencies of the FFT coefficients.
    pub fn freqs(&self) -> ArrayView1<'_, f64> {
        self.axis.values()
    }

    /// Number of epochs.
    pub fn n_epochs(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Number of channels.
    pub fn n_channels(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Coupling metric.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Whether progress is reported.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Toggle progress reporting.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Compute coupling for `request`, averaged over epochs.
    ///
    /// Connections, frequencies and the job count are all validated before the
    /// kernel runs for the first time. Coupling is computed between every
    /// `f1`/`f2` pair; cells where `f1 >= f2` are `NaN`.
    pub fn compute(&self, request: &ComputeRequest) -> Result<Results> {
        let connections = match &request.indices {
            Some((seeds, targets)) => Connections::try_new(seeds, targets, self.n_channels())?,
            None => Connections::all(self.n_channels()),
        };
        let freqs = FrequencySelection::try_new(
            &self.axis,
            request.f1.as_deref(),
            request.f2.as_deref(),
        )?;
        let parallelism = Parallelism::from_n_jobs(request.n_jobs)?;

        let name = self.kernel.name();
        if self.verbose {
            info!(
                metric = name,
                connections = connections.len(),
                f1 = freqs.f1().len(),
                f2 = freqs.f2().len(),
                workers = parallelism.workers(),
                "computing coupling"
            );
        }

        let tracing_progress;
        let progress: &dyn Progress = if self.verbose {
            tracing_progress = TracingProgress::new(name);
            &tracing_progress
        } else {
            &NoProgress
        };
        let coupling = dispatch(
            &self.kernel,
            DispatchInput {
                data: self.data.view(),
                axis: &self.axis,
                connections: &connections,
                f1s: freqs.f1(),
                f2s: freqs.f2(),
            },
            parallelism,
            progress,
        )?;

        if self.verbose {
            info!(metric = name, "coupling computation finished");
        }
        let (f1, f2) = freqs.into_arrays();
        Ok(Results::try_new(coupling, connections, f1, f2, name)?)
    }

    /// Compute like [`Self::compute`] and keep the results on the process.
    ///
    /// Successful results replace whatever was stored before. A failed call
    /// leaves the stored results untouched.
    pub fn compute_and_store(&mut self, request: &ComputeRequest) -> Result<&Results> {
        let results = self.compute(request)?;
        Ok(self.results.insert(results))
    }

    /// Results of the last successful [`Self::compute_and_store`].
    pub fn results(&self) -> Option<&Results> {
        self.results.as_ref()
    }

    /// Owned copy of the stored results.
    pub fn get_results(&self) -> Option<Results> {
        self.results.clone()
    }
}
