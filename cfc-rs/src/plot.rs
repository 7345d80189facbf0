use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cfc::Results;

/// Errors raised by plot utilities.
#[derive(Debug)]
pub enum PlotError {
    /// Underlying process or filesystem I/O failure.
    Io(std::io::Error),
    /// A requested connection does not exist in the results.
    InvalidNode {
        /// Requested connection.
        node: usize,
        /// Number of connections in the results.
        n_connections: usize,
    },
    /// Python subprocess stdin was unavailable.
    StdinUnavailable,
    /// Python subprocess exited unsuccessfully.
    PythonExitFailure(ExitStatus),
}

impl core::fmt::Display for PlotError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PlotError::Io(err) => write!(f, "plot I/O failure: {err}"),
            PlotError::InvalidNode {
                node,
                n_connections,
            } => write!(
                f,
                "connection {node} requested but results hold {n_connections} connections"
            ),
            PlotError::StdinUnavailable => {
                write!(f, "failed to open stdin for python plotting process")
            }
            PlotError::PythonExitFailure(status) => {
                write!(f, "python plotting script failed with status: {status}")
            }
        }
    }
}

impl std::error::Error for PlotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlotError::Io(err) => Some(err),
            PlotError::InvalidNode { .. }
            | PlotError::StdinUnavailable
            | PlotError::PythonExitFailure(_) => None,
        }
    }
}

impl From<std::io::Error> for PlotError {
    fn from(value: std::io::Error) -> Self {
        PlotError::Io(value)
    }
}

/// Debug utility that plots coupling results with matplotlib.
///
/// One `f1` x `f2` heatmap is drawn per connection in `nodes` (all connections
/// when `None`), titled by seed and target, on a figure titled with the metric
/// name. Undefined cells stay blank.
///
/// Note: requires a system `python` with matplotlib. The PNG is written to
/// `output_path`, or to `target/contracts/plots` when `None`; the written path
/// is returned.
pub fn python_plot_results<P: AsRef<Path>>(
    results: &Results,
    nodes: Option<&[usize]>,
    output_path: Option<P>,
) -> Result<PathBuf, PlotError> {
    let n_connections = results.n_connections();
    let nodes: Vec<usize> = match nodes {
        Some(nodes) => nodes.to_vec(),
        None => (0..n_connections).collect(),
    };
    if let Some(&node) = nodes.iter().find(|&&node| node >= n_connections) {
        return Err(PlotError::InvalidNode {
            node,
            n_connections,
        });
    }

    let output_path = match output_path {
        Some(path) => path.as_ref().to_path_buf(),
        None => {
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            PathBuf::from(format!(
                "target/contracts/plots/{}_{ts}.png",
                results.name().to_lowercase()
            ))
        }
    };
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let matrices: Vec<Vec<Vec<f64>>> = nodes
        .iter()
        .map(|&node| {
            results
                .coupling()
                .index_axis(ndarray::Axis(0), node)
                .outer_iter()
                .map(|row| row.to_vec())
                .collect()
        })
        .collect();
    let titles: Vec<String> = nodes
        .iter()
        .map(|&node| {
            let seed = results.connections().seeds()[node];
            let target = results.connections().targets()[node];
            format!("Seed: {seed} | Target: {target}")
        })
        .collect();

    let output_path_literal = output_path.to_string_lossy().replace('\\', "\\\\");
    // Debug formatting of f64 yields `NaN`/`inf`, bound below as python names.
    let script = format!(
        r#"
import matplotlib
matplotlib.use("Agg")
import matplotlib.pyplot as plt
import numpy as np

NaN = float("nan")
inf = float("inf")
f1 = np.array({:?})
f2 = np.array({:?})
data = {:?}
titles = {:?}
fig, axes = plt.subplots(1, len(data), figsize=(5 * len(data), 5), squeeze=False)
for axis, matrix, title in zip(axes[0], data, titles):
    mesh = axis.pcolormesh(f1, f2, np.ma.masked_invalid(np.array(matrix)), shading="nearest")
    fig.colorbar(mesh, ax=axis, label="Coupling (A.U.)", shrink=0.3)
    axis.set_aspect("equal")
    axis.grid(which="major", axis="both", linestyle="--", color=[0.7, 0.7, 0.7], alpha=0.7)
    axis.set_xlabel("$f_1$ (Hz)")
    axis.set_ylabel("$f_2$ (Hz)")
    axis.set_title(title)
fig.suptitle({:?})
fig.tight_layout()
fig.savefig(r"{}", dpi=150)
plt.close(fig)
"#,
        results.f1().to_vec(),
        results.f2().to_vec(),
        matrices,
        titles,
        results.name(),
        output_path_literal
    );
    // Run the script with python
    let script = script.as_bytes();
    let mut python = std::process::Command::new("python")
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::null()) // noisy
        .stderr(std::process::Stdio::null()) // noisy
        .spawn()?;

    if let Some(mut stdin) = python.stdin.take() {
        stdin.write_all(script)?;
    } else {
        return Err(PlotError::StdinUnavailable);
    }

    // Wait for completion and return a deterministic error if plotting fails.
    let status = python.wait()?;
    if !status.success() {
        return Err(PlotError::PythonExitFailure(status));
    }
    Ok(output_path)
}
