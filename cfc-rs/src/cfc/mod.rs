//! Cross-frequency coupling between channel pairs.
//!
//! Works on pre-computed FFT coefficients shaped `[epochs, channels, frequencies]`.
//! A [`CouplingProcess`] validates the requested [`Connections`] and
//! [`FrequencySelection`], fans a [`CouplingKernel`] out over the connections
//! and returns the stacked coupling as immutable [`Results`].
//!
//! ```
//! use cfc_rs::cfc::{ComputeRequest, Ppc};
//! use ndarray::{array, Array3};
//! use num_complex::Complex64;
//!
//! let data = Array3::from_shape_fn((4, 2, 5), |(e, c, f)| {
//!     Complex64::from_polar(1.0, 0.2 * (e + c + f) as f64)
//! });
//! let ppc = Ppc::new(data, array![1., 2., 3., 4., 5.]).unwrap();
//! let results = ppc
//!     .compute(&ComputeRequest::new().indices([0], [1]).f1([1., 2.]).f2([3., 4.]))
//!     .unwrap();
//! assert_eq!(results.coupling().dim(), (1, 2, 2));
//! ```

mod connections;
mod dispatch;
mod freqs;
mod ppc;
mod process;
mod results;
mod traits;

pub use connections::*;
pub use dispatch::*;
pub use freqs::*;
pub use ppc::*;
pub use process::*;
pub use results::*;
pub use traits::*;
