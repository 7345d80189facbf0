use anyhow::{anyhow, bail, Context, Result};
use cfc_rs::cfc::{ppc as ppc_baseline, ComputeRequest, Ppc, Results};
use ndarray::{Array1, Array3, Axis};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_PYTHON_BIN: &str = "python";

/// NumPy PPC over every requested connection, laid out `[connections, f2, f1]`
/// and flattened. Undefined cells are emitted as `null`.
const PY_PPC_SCRIPT: &str = r#"
import json
import sys
import time
import numpy as np

env = json.loads(sys.stdin.read())
iters = int(env["iters"])
p = env["payload"]
data = np.asarray(p["re"], dtype=float) + 1j * np.asarray(p["im"], dtype=float)
freqs = np.asarray(p["freqs"], dtype=float)
seeds, targets = p["seeds"], p["targets"]
f1s, f2s = p["f1"], p["f2"]

def _idx(f):
    return int(np.flatnonzero(freqs == f)[0])

def _ppc(x, y, f1, f2):
    if f1 >= f2 or f1 == 0:
        return np.nan
    xa, xp = np.abs(x), np.angle(x, deg=True)
    ya, yp = np.abs(y), np.angle(y, deg=True)
    den = np.mean(xa * ya)
    if den == 0:
        return np.nan
    return np.abs(np.mean(xa * ya * np.exp(1j * (xp * (f2 / f1) - yp)))) / den

def _compute():
    out = np.full((len(seeds), len(f2s), len(f1s)), np.nan)
    for c, (s, t) in enumerate(zip(seeds, targets)):
        for j, f1 in enumerate(f1s):
            for i, f2 in enumerate(f2s):
                out[c, i, j] = _ppc(data[:, s, _idx(f1)], data[:, t, _idx(f2)], f1, f2)
    return out

y = _compute()
t0 = time.perf_counter_ns()
for _ in range(iters):
    _compute()
t1 = time.perf_counter_ns()

print(json.dumps({
    "output": [None if np.isnan(v) else float(v) for v in y.reshape(-1)],
    "avg_ns": (t1 - t0) / max(iters, 1),
    "python_version": sys.version.split()[0],
    "numpy_version": np.__version__,
    "matplotlib_version": None
}))
"#;

#[derive(Debug, Serialize, Deserialize, Clone)]
struct PythonEval {
    output: Vec<Option<f64>>,
    avg_ns: f64,
    python_version: String,
    numpy_version: String,
    matplotlib_version: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ContractRow {
    case_id: String,
    cells: usize,
    defined_cells: usize,
    nan_mask_agrees: bool,
    pearson_r: f64,
    mae: f64,
    max_abs: f64,
    rust_parallel_ns: f64,
    rust_sequential_ns: f64,
    rust_baseline_ns: f64,
    python_ns: f64,
    speedup_vs_sequential: f64,
    speedup_vs_python: f64,
    overlay_plot: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContractBundle {
    generated_epoch_seconds: u64,
    python_executable: String,
    python_version: String,
    numpy_version: String,
    matplotlib_version: String,
    rows: Vec<ContractRow>,
}

/// One synthetic tensor and the request run on it.
struct Case {
    id: &'static str,
    data: Array3<Complex64>,
    freqs: Array1<f64>,
    request: ComputeRequest,
    iters: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("contracts") => run_contracts(),
        _ => {
            eprintln!("Usage:");
            eprintln!("  cargo run -p xtask -- contracts");
            Ok(())
        }
    }
}

fn run_contracts() -> Result<()> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let out_dir = PathBuf::from(format!("target/contracts/{ts}"));
    let plots_dir = out_dir.join("plots");
    fs::create_dir_all(&plots_dir).context("creating contract output directories")?;

    let python_bin = detect_python_bin();
    let mut rows = Vec::new();
    let mut case_plot_payload = Vec::new();

    for case in cases() {
        info!(case = case.id, "running contract case");
        let row = run_case(&python_bin, &plots_dir, &case, &mut case_plot_payload)?;
        if !row.nan_mask_agrees || row.max_abs > 1e-9 {
            warn!(
                case = case.id,
                max_abs = row.max_abs,
                nan_mask_agrees = row.nan_mask_agrees,
                "rust and python disagree"
            );
        }
        rows.push(row);
    }

    let versions = python_versions(&python_bin)?;
    let bundle = ContractBundle {
        generated_epoch_seconds: ts,
        python_executable: python_bin.to_string_lossy().into_owned(),
        python_version: versions.python_version,
        numpy_version: versions.numpy_version,
        matplotlib_version: versions.matplotlib_version.unwrap_or_default(),
        rows,
    };

    let summary_json = serde_json::to_string_pretty(&bundle).context("serializing summary")?;
    fs::write(out_dir.join("summary.json"), summary_json).context("writing summary.json")?;
    write_summary_csv(&out_dir.join("summary.csv"), &bundle.rows)?;

    let report_pdf = out_dir.join("report.pdf");
    generate_plots_and_pdf(&python_bin, &case_plot_payload, &report_pdf)?;

    println!("Contract artifacts written to:");
    println!("  - {}", out_dir.join("summary.csv").display());
    println!("  - {}", out_dir.join("summary.json").display());
    println!("  - {}", report_pdf.display());
    println!("  - {}", plots_dir.display());
    println!("  - cases: {}", bundle.rows.len());

    Ok(())
}

fn cases() -> Vec<Case> {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    // Independent noise: scores near zero, every pair.
    let noise = Array3::from_shape_fn((24, 4, 10), |_| {
        Complex64::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0))
    });

    // Seed phase at bin k drives target phase at bin 2k, partially jittered.
    let n_freqs = 12;
    let mut locked = Array3::<Complex64>::zeros((40, 3, n_freqs));
    for mut epoch in locked.outer_iter_mut() {
        let base: f64 = rng.random_range(-180.0..180.0);
        for k in 0..n_freqs {
            let jitter: f64 = rng.random_range(-20.0..20.0);
            let amp: f64 = rng.random_range(0.5..2.0);
            epoch[[0, k]] = Complex64::from_polar(amp, base.to_radians());
            epoch[[1, k]] = Complex64::from_polar(amp, (2.0 * base + jitter).to_radians());
            epoch[[2, k]] = Complex64::from_polar(amp, rng.random_range(-3.0..3.0));
        }
    }

    // Two-sided FFT ordering with a DC bin.
    let fft_freqs = Array1::from(vec![0., 1., 2., 3., 4., -4., -3., -2., -1.]);
    let fft_order = Array3::from_shape_fn((16, 2, fft_freqs.len()), |_| {
        Complex64::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0))
    });

    vec![
        Case {
            id: "ppc_noise_all_pairs",
            data: noise,
            freqs: Array1::linspace(1., 10., 10),
            request: ComputeRequest::new(),
            iters: 5,
        },
        Case {
            id: "ppc_phase_locked_pairs",
            data: locked,
            freqs: Array1::linspace(1., n_freqs as f64, n_freqs),
            request: ComputeRequest::new()
                .indices([0, 0, 1, 2], [1, 2, 0, 1])
                .f1([1., 2., 3., 4., 5., 6.])
                .f2([2., 4., 6., 8., 10., 12.]),
            iters: 5,
        },
        Case {
            id: "ppc_fft_ordered_axis",
            data: fft_order,
            freqs: fft_freqs,
            request: ComputeRequest::new()
                .indices([0, 1], [1, 0])
                .f1([0., 1., -2., 2.])
                .f2([4., 3., -1., 2.]),
            iters: 10,
        },
    ]
}

fn run_case(
    python_bin: &Path,
    plots_dir: &Path,
    case: &Case,
    case_plot_payload: &mut Vec<serde_json::Value>,
) -> Result<ContractRow> {
    let mut ppc = Ppc::new(case.data.clone(), case.freqs.clone())?;
    ppc.set_verbose(false);

    let sequential_request = case.request.clone().n_jobs(1);
    let parallel_request = case.request.clone().n_jobs(-1);
    let candidate = ppc.compute(&parallel_request)?;
    let sequential = ppc.compute(&sequential_request)?;
    if !same_bits(&candidate, &sequential) {
        bail!("case {} differs between sequential and parallel runs", case.id);
    }
    let baseline = baseline_ppc(&case.data, &case.freqs, &candidate)?;
    ensure_same_length(case.id, &flatten(&candidate), &baseline)?;

    let py = python_ppc_eval(python_bin, case, &candidate)?;
    let rust_values = flatten(&candidate);
    ensure_same_length(case.id, &rust_values, &py.output)?;

    let rust_parallel_ns = benchmark_avg_ns(case.iters, || {
        ppc.compute(&parallel_request).map(|_| ()).map_err(|e| anyhow!("{e}"))
    })?;
    let rust_sequential_ns = benchmark_avg_ns(case.iters, || {
        ppc.compute(&sequential_request).map(|_| ()).map_err(|e| anyhow!("{e}"))
    })?;
    let rust_baseline_ns = benchmark_avg_ns(case.iters, || {
        baseline_ppc(&case.data, &case.freqs, &candidate).map(|_| ())
    })?;

    let nan_mask_agrees = rust_values
        .iter()
        .zip(py.output.iter())
        .all(|(r, p)| r.is_nan() == p.is_none());
    let (rust_defined, py_defined): (Vec<f64>, Vec<f64>) = rust_values
        .iter()
        .zip(py.output.iter())
        .filter_map(|(&r, &p)| p.filter(|_| !r.is_nan()).map(|p| (r, p)))
        .unzip();

    let overlay = plots_dir.join(format!("{}_overlay.png", case.id));
    case_plot_payload.push(json!({
        "case_id": case.id,
        "rust_candidate": rust_defined,
        "python_reference": py_defined,
        "overlay_plot": overlay.to_string_lossy()
    }));

    Ok(ContractRow {
        case_id: case.id.to_string(),
        cells: rust_values.len(),
        defined_cells: rust_defined.len(),
        nan_mask_agrees,
        pearson_r: pearson(&rust_defined, &py_defined),
        mae: mean_abs_error(&rust_defined, &py_defined),
        max_abs: max_abs_error(&rust_defined, &py_defined),
        rust_parallel_ns,
        rust_sequential_ns,
        rust_baseline_ns,
        python_ns: py.avg_ns,
        speedup_vs_sequential: rust_sequential_ns / rust_parallel_ns,
        speedup_vs_python: py.avg_ns / rust_parallel_ns,
        overlay_plot: overlay.to_string_lossy().into_owned(),
    })
}

/// Connection-by-connection PPC through the two-channel free function.
fn baseline_ppc(data: &Array3<Complex64>, freqs: &Array1<f64>, like: &Results) -> Result<Vec<f64>> {
    let freqs = freqs.to_vec();
    let f1 = like.f1().to_vec();
    let f2 = like.f2().to_vec();
    let mut out = Vec::with_capacity(like.coupling().len());
    for (seed, target) in like.connections().iter() {
        let pair = data.select(Axis(1), &[seed, target]);
        let matrix = ppc_baseline(pair.view(), &freqs, &f1, &f2)
            .map_err(|e| anyhow!("baseline failed on ({seed}, {target}): {e}"))?;
        out.extend(matrix.iter().copied());
    }
    Ok(out)
}

fn flatten(results: &Results) -> Vec<f64> {
    results.coupling().iter().copied().collect()
}

fn same_bits(a: &Results, b: &Results) -> bool {
    a.coupling()
        .iter()
        .zip(b.coupling().iter())
        .all(|(x, y)| x.to_bits() == y.to_bits())
}

fn detect_python_bin() -> PathBuf {
    PathBuf::from(DEFAULT_PYTHON_BIN)
}

fn python_versions(python_bin: &Path) -> Result<PythonEval> {
    run_python_eval(
        python_bin,
        r#"
import json, sys
import numpy
import matplotlib
payload = json.loads(sys.stdin.read())
print(json.dumps({
    "output": [],
    "avg_ns": 0.0,
    "python_version": sys.version.split()[0],
    "numpy_version": numpy.__version__,
    "matplotlib_version": matplotlib.__version__
}))
"#,
        json!({}),
    )
}

fn python_ppc_eval(python_bin: &Path, case: &Case, like: &Results) -> Result<PythonEval> {
    let re: Vec<Vec<Vec<f64>>> = case
        .data
        .outer_iter()
        .map(|epoch| epoch.outer_iter().map(|chan| chan.iter().map(|c| c.re).collect()).collect())
        .collect();
    let im: Vec<Vec<Vec<f64>>> = case
        .data
        .outer_iter()
        .map(|epoch| epoch.outer_iter().map(|chan| chan.iter().map(|c| c.im).collect()).collect())
        .collect();
    run_python_eval(
        python_bin,
        PY_PPC_SCRIPT,
        json!({
            "iters": case.iters,
            "payload": {
                "re": re,
                "im": im,
                "freqs": case.freqs.to_vec(),
                "seeds": like.connections().seeds(),
                "targets": like.connections().targets(),
                "f1": like.f1().to_vec(),
                "f2": like.f2().to_vec(),
            }
        }),
    )
}

fn run_python_eval(
    python_bin: &Path,
    script: &str,
    payload: serde_json::Value,
) -> Result<PythonEval> {
    let output = run_python(python_bin, script, &payload)?;
    let stdout = String::from_utf8(output).context("parsing python stdout utf8")?;
    let parsed: PythonEval = serde_json::from_str(stdout.trim()).context("parsing python json")?;
    Ok(parsed)
}

fn run_python(python_bin: &Path, script: &str, payload: &serde_json::Value) -> Result<Vec<u8>> {
    let mut child = Command::new(python_bin)
        .arg("-c")
        .arg(script)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning python interpreter at {}", python_bin.display()))?;

    {
        let stdin = child.stdin.as_mut().context("opening python stdin")?;
        let payload_bytes = serde_json::to_vec(payload).context("serializing python payload")?;
        stdin
            .write_all(&payload_bytes)
            .context("writing payload to python stdin")?;
    }

    let output = child
        .wait_with_output()
        .context("waiting for python process")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("python execution failed: {stderr}");
    }
    Ok(output.stdout)
}

fn ensure_same_length<A, B>(case_id: &str, a: &[A], b: &[B]) -> Result<()> {
    if a.len() != b.len() {
        bail!(
            "case {case_id} has mismatched output lengths: left={}, right={}",
            a.len(),
            b.len()
        );
    }
    Ok(())
}

fn benchmark_avg_ns<F>(iters: usize, mut f: F) -> Result<f64>
where
    F: FnMut() -> Result<()>,
{
    let start = Instant::now();
    for _ in 0..iters {
        f()?;
    }
    Ok(start.elapsed().as_nanos() as f64 / iters.max(1) as f64)
}

fn mean_abs_error(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .sum::<f64>()
        / a.len() as f64
}

fn max_abs_error(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let (cov, var_a, var_b) = a.iter().zip(b.iter()).fold((0.0, 0.0, 0.0), |acc, (x, y)| {
        let (da, db) = (x - mean_a, y - mean_b);
        (acc.0 + da * db, acc.1 + da * da, acc.2 + db * db)
    });
    if var_a == 0.0 || var_b == 0.0 {
        if a == b {
            1.0
        } else {
            0.0
        }
    } else {
        cov / (var_a.sqrt() * var_b.sqrt())
    }
}

fn write_summary_csv(path: &Path, rows: &[ContractRow]) -> Result<()> {
    let mut out = String::from(
        "case_id,cells,defined_cells,nan_mask_agrees,pearson_r,mae,max_abs,rust_parallel_ns,rust_sequential_ns,rust_baseline_ns,python_ns,speedup_vs_sequential,speedup_vs_python,overlay_plot\n",
    );
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{:.12},{:.12},{:.12},{:.3},{:.3},{:.3},{:.3},{:.6},{:.6},{}\n",
            row.case_id,
            row.cells,
            row.defined_cells,
            row.nan_mask_agrees,
            row.pearson_r,
            row.mae,
            row.max_abs,
            row.rust_parallel_ns,
            row.rust_sequential_ns,
            row.rust_baseline_ns,
            row.python_ns,
            row.speedup_vs_sequential,
            row.speedup_vs_python,
            row.overlay_plot
        ));
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}

fn generate_plots_and_pdf(
    python_bin: &Path,
    case_payload: &[serde_json::Value],
    report_pdf: &Path,
) -> Result<()> {
    let payload = json!({
        "cases": case_payload,
        "report_pdf": report_pdf.to_string_lossy()
    });
    let script = r#"
import json
import sys
import matplotlib
matplotlib.use("Agg")
import matplotlib.pyplot as plt
from matplotlib.backends.backend_pdf import PdfPages

payload = json.loads(sys.stdin.read())

with PdfPages(payload["report_pdf"]) as pdf:
    for case in payload["cases"]:
        rust = case["rust_candidate"]
        py = case["python_reference"]
        fig, (ax_scatter, ax_residual) = plt.subplots(1, 2, figsize=(10, 4))
        ax_scatter.scatter(py, rust, s=8)
        ax_scatter.plot([0, 1], [0, 1], color="gray", linestyle="--", linewidth=1)
        ax_scatter.set_xlabel("NumPy PPC")
        ax_scatter.set_ylabel("Rust PPC")
        ax_residual.plot([r - p for r, p in zip(rust, py)], color="tab:red", linewidth=1)
        ax_residual.set_xlabel("defined cell")
        ax_residual.set_ylabel("Rust - NumPy")
        fig.suptitle(case["case_id"])
        fig.tight_layout()
        fig.savefig(case["overlay_plot"], dpi=150)
        pdf.savefig(fig)
        plt.close(fig)
"#;

    run_python(python_bin, script, &payload).context("plot/pdf generation failed")?;
    Ok(())
}
