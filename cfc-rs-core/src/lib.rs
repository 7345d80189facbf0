//! Core numeric helpers for `cfc-rs`.
//!
//! Small, allocation-free building blocks with numpy-like semantics that the
//! coupling engine relies on in its inner loops.

#![no_std]
#![deny(missing_docs)]

mod error;

/// numpy-like array helpers.
pub mod num_rs;

pub use error::*;
