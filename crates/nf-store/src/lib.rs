//! # nf-store
//!
//! The hierarchical key→value store the extraction pipeline loads from and
//! persists to. A store is a flat, ordered mapping from string keys to one
//! of three value kinds: a plain exposure scalar, a 1D multi-universe
//! histogram, or a 2D multi-universe histogram. On disk it is a single
//! pretty-printed JSON document.
//!
//! Output stores are create-only: writing to a path that already exists is
//! refused rather than clobbering another run's result.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod merge;
pub mod store;

pub use merge::merge_stores;
pub use store::{Store, StoreValue};
