//! Shared kernel substrate.
//!
//! Validation errors, validated constructors and 1D input adapters used by the
//! selectors, coupling kernels and the process orchestrator.

mod errors;
mod io;
mod lifecycle;

pub use errors::*;
pub use io::*;
pub use lifecycle::*;
