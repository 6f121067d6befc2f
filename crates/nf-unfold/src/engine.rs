//! Multi-universe unfolding: the CV-level solve applied lock-step to every
//! systematic universe, plus the one-time statistical covariance.

use nf_core::{Error, Result};
use nf_hist::{ErrorBand, Hist1D, Hist2D};

use crate::covariance::{repair_covariance, statistical_covariance};
use crate::response::{Method, ResponseMatrix};

/// Name of the covariance source attached to unfolded histograms.
pub const UNFOLDING_COV: &str = "unfolding_cov";

/// Unfold a folded spectrum with a migration matrix.
///
/// The solve runs independently for the central value and for every
/// universe of every band in `folded`, each against the same-universe plane
/// of `migration` when the matrix carries that band, or against the
/// matrix's central plane when it does not.
///
/// One statistical covariance is derived from the CV-level inputs only —
/// recomputing it per universe would scale its cost with the universe count
/// for no statistical gain — repaired via [`repair_covariance`], and
/// attached as the covariance source [`UNFOLDING_COV`]. The unfolded CV
/// statistical errors are the square roots of the pre-repair diagonal.
///
/// Any solver failure is reported as [`Error::Unfolding`]; callers must not
/// substitute a default spectrum for a failed solve.
pub fn unfold(folded: &Hist1D, migration: &Hist2D, method: Method) -> Result<Hist1D> {
    if folded.n_bins() != migration.n_reco() {
        return Err(Error::BinningMismatch(format!(
            "folded spectrum {} has {} bins but migration {} has {} reco bins",
            folded.name(),
            folded.n_bins(),
            migration.name(),
            migration.n_reco()
        )));
    }

    let n_reco = migration.n_reco();
    let n_truth = migration.n_truth();

    // CV solve, with the unfolding matrix for covariance propagation.
    let cv_response = ResponseMatrix::build(migration.cv(), n_reco, n_truth)?;
    let (cv, u) = cv_response.solve(folded.cv(), method)?;

    let cov = statistical_covariance(&u, folded.cv_err());
    let cv_err: Vec<f64> = (0..n_truth).map(|i| cov[(i, i)].max(0.0).sqrt()).collect();
    let repaired = repair_covariance(cov, n_truth)?;

    let mut out = Hist1D::with_contents(folded.name(), migration.truth_edges(), cv, cv_err)?;

    for (name, band) in folded.bands() {
        let mut universes = Vec::with_capacity(band.n_universes());
        for (i, universe) in band.universes().enumerate() {
            let plane = migration.universe_or_cv(name, i);
            let response = ResponseMatrix::build(plane, n_reco, n_truth)?;
            universes.push(response.unfold(universe, method)?);
        }
        out.set_band(name, ErrorBand::from_universes(&universes)?)?;
    }

    let row_major: Vec<f64> = (0..n_truth)
        .flat_map(|i| (0..n_truth).map(move |j| (i, j)))
        .map(|(i, j)| repaired[(i, j)])
        .collect();
    out.push_covariance(UNFOLDING_COV, row_major)?;

    tracing::info!(
        hist = folded.name(),
        bands = folded.bands().count(),
        ?method,
        "unfolded spectrum"
    );
    Ok(out)
}
