use cfc_rs::cfc::{ComputeRequest, Ppc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array3};
use num_complex::Complex64;
use rand::rngs::ThreadRng;
use rand::Rng;
use rustfft::FftPlanner;

const SFREQ: f64 = 100.0;

/// Epoched noisy signals in which every channel carries a 10 Hz rhythm and
/// its 20 Hz harmonic, returned as one-sided FFT coefficients and frequencies.
fn coupled_fft(
    mut rng: ThreadRng,
    n_epochs: usize,
    n_chans: usize,
    n_times: usize,
) -> (Array3<Complex64>, Array1<f64>) {
    let n_freqs = n_times / 2 + 1;
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n_times);

    let mut data = Array3::zeros((n_epochs, n_chans, n_freqs));
    let mut buf = vec![Complex64::new(0.0, 0.0); n_times];
    for epoch in 0..n_epochs {
        let phase: f64 = rng.random_range(0.0..std::f64::consts::TAU);
        for chan in 0..n_chans {
            for (i, sample) in buf.iter_mut().enumerate() {
                let t = i as f64 / SFREQ;
                let low = (std::f64::consts::TAU * 10.0 * t + phase).sin();
                let high = 0.5 * (std::f64::consts::TAU * 20.0 * t + 2.0 * phase).sin();
                let noise = rng.random_range(-0.5..0.5);
                *sample = Complex64::new(low + high + noise + 0.01 * chan as f64, 0.0);
            }
            fft.process(&mut buf);
            for (k, coeff) in buf.iter().take(n_freqs).enumerate() {
                data[[epoch, chan, k]] = *coeff;
            }
        }
    }
    let freqs = Array1::from_shape_fn(n_freqs, |k| k as f64 * SFREQ / n_times as f64);
    (data, freqs)
}

fn ppc_dispatch(c: &mut Criterion) {
    let (data, freqs) = coupled_fft(rand::rng(), 30, 8, 200);
    let mut ppc = Ppc::new(data, freqs).expect("valid fft tensor");
    ppc.set_verbose(false);

    let f1: Vec<f64> = (5..=15).map(f64::from).collect();
    let f2: Vec<f64> = (15..=30).map(f64::from).collect();

    let mut group = c.benchmark_group("ppc_all_connections");
    for n_jobs in [1isize, -1] {
        let request = ComputeRequest::new()
            .f1(f1.iter().copied())
            .f2(f2.iter().copied())
            .n_jobs(n_jobs);
        group.bench_with_input(BenchmarkId::from_parameter(n_jobs), &request, |b, request| {
            b.iter(|| black_box(ppc.compute(request).expect("valid request")))
        });
    }
    group.finish();
}

criterion_group!(benches, ppc_dispatch);
criterion_main!(benches);
