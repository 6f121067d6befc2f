//! # nf-hist
//!
//! Multi-universe histograms for cross-section extraction.
//!
//! A [`Hist1D`] carries a central-value spectrum plus named groups of
//! systematically-shifted variants ("error bands" of "universes"), all on
//! one shared binning. Arithmetic is lock-step: band X universe i of one
//! histogram only ever combines with band X universe i of the other, so a
//! systematic shift propagates coherently through every pipeline stage.
//!
//! [`Hist2D`] is the two-axis variant used for migration matrices.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod band;
pub mod broadcast;
pub mod hist1d;
pub mod hist2d;
pub mod ratio;

pub use band::{BandLayout, ErrorBand};
pub use broadcast::broadcast;
pub use hist1d::Hist1D;
pub use hist2d::Hist2D;
pub use ratio::ratio_correlated;
