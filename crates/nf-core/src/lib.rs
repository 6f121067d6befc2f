//! # nf-core
//!
//! Shared error taxonomy and result alias for the nufold workspace.
//! Every library crate returns [`Result`] so that the per-prefix
//! extraction boundary can decide which failures are fatal.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

pub use error::{Error, Result};

/// Version string reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
