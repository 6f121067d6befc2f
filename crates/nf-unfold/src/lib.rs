//! # nf-unfold
//!
//! Statistical deconvolution of detector smearing. A measured spectrum is
//! related to the true one through a migration matrix; this crate inverts
//! that relation either by direct matrix inversion or by d'Agostini
//! iterative Bayesian refinement, applies the chosen solver lock-step to
//! every systematic universe, and extracts a one-time statistical
//! covariance for the central value.
//!
//! Inversion is exact but degrades for ill-conditioned response matrices;
//! fewer Bayesian iterations regularize harder (more bias, less variance)
//! while more iterations converge toward the inversion solution and amplify
//! statistical noise.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod covariance;
pub mod engine;
pub mod response;

pub use covariance::{repair_covariance, statistical_covariance};
pub use engine::unfold;
pub use response::{Method, ResponseMatrix};
