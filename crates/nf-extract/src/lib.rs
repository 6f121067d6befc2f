//! # nf-extract
//!
//! The extraction pipeline: turn a measured, detector-level event-rate
//! histogram plus a simulated detector-response model into a physical
//! differential cross section, carrying a central value and dozens of
//! systematic universes in lock-step through every stage.
//!
//! Per signal definition ("prefix") the stages run strictly in order:
//! load → synchronize bands → subtract backgrounds → negative-bin scan
//! (diagnostic) → unfold (fatal on failure) → efficiency correction →
//! normalization → persist. Prefixes are independent units of work: one
//! prefix's failure never blocks another's extraction.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ingredients;
pub mod normalize;
pub mod pipeline;
pub mod sanity;
pub mod subtract;

pub use ingredients::{discover_prefixes, Ingredients};
pub use normalize::{normalize, M2_TO_CM2};
pub use pipeline::{extract_prefix, output_store, run_extraction, ExtractionSummary, PrefixOutput};
pub use sanity::{report_negative_bins, BinLocation, NegativeBin};
pub use subtract::subtract_backgrounds;
