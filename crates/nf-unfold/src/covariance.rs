//! Statistical covariance of the unfolded spectrum.

use nalgebra::DMatrix;
use nf_core::{Error, Result};

/// Propagate the folded spectrum's per-bin statistical errors through the
/// linearized unfolding matrix `U` (`n_truth × n_reco`):
/// `cov = U · diag(σ²) · Uᵀ`.
pub fn statistical_covariance(u: &DMatrix<f64>, folded_err: &[f64]) -> DMatrix<f64> {
    let mut weighted = u.clone();
    for (i, &sigma) in folded_err.iter().enumerate() {
        for j in 0..weighted.nrows() {
            weighted[(j, i)] *= sigma;
        }
    }
    &weighted * weighted.transpose()
}

/// Repair a solver-returned covariance for use as an extra uncertainty
/// source on an `n_truth`-bin histogram.
///
/// The solve can hand back a matrix whose dimension exceeds the number of
/// meaningful truth bins, with the extra trailing rows and columns empty.
/// Those trailing entries are verified to be zero, not assumed; nonzero
/// content there (or a matrix smaller than the truth binning) is an
/// unrepairable failure. The surviving diagonal is then zeroed: per-bin
/// variance is already carried by the per-universe statistical fluctuation
/// of the multi-universe structure, and keeping it here would double-count
/// it. Only the off-diagonal bin-to-bin correlations survive.
pub fn repair_covariance(cov: DMatrix<f64>, n_truth: usize) -> Result<DMatrix<f64>> {
    if cov.nrows() != cov.ncols() {
        return Err(Error::Unfolding(format!(
            "covariance is {}×{}, not square",
            cov.nrows(),
            cov.ncols()
        )));
    }
    if cov.nrows() < n_truth {
        return Err(Error::Unfolding(format!(
            "covariance dimension {} is smaller than the {n_truth}-bin truth binning",
            cov.nrows()
        )));
    }

    let mut out = if cov.nrows() > n_truth {
        let dim = cov.nrows();
        for i in 0..dim {
            for j in 0..dim {
                if (i >= n_truth || j >= n_truth) && cov[(i, j)] != 0.0 {
                    return Err(Error::Unfolding(format!(
                        "covariance row/column {} beyond the truth binning has content; \
                         cannot truncate {dim}×{dim} down to {n_truth}×{n_truth}",
                        i.max(j)
                    )));
                }
            }
        }
        tracing::warn!(from = dim, to = n_truth, "truncating oversized unfolding covariance");
        cov.view((0, 0), (n_truth, n_truth)).into_owned()
    } else {
        cov
    };

    for i in 0..n_truth {
        out[(i, i)] = 0.0;
    }
    Ok(out)
}
