//! Correlated-ratio estimator for efficiency-style divisions.

use nf_core::Result;

use crate::hist1d::Hist1D;

/// Bin-by-bin ratio `numerator / denominator` where the numerator's events
/// are a strict subset of the denominator's (both filled from the same
/// simulated sample).
///
/// Independent-error division overstates the uncertainty of such a ratio,
/// so the central-value errors use the binomial estimator
/// `err² = |(1 − 2r)·eₙ² + r²·e_d²| / d²`. Universes divide content-wise,
/// lock-step per band; their spread is the systematic uncertainty and
/// carries no per-universe error of its own. Zero-denominator bins come out
/// zero.
pub fn ratio_correlated(numerator: &Hist1D, denominator: &Hist1D) -> Result<Hist1D> {
    numerator.combine(
        denominator,
        |n, d| if d == 0.0 { 0.0 } else { n / d },
        |n, en, d, ed| {
            if d == 0.0 {
                return 0.0;
            }
            let r = n / d;
            (((1.0 - 2.0 * r) * en * en + r * r * ed * ed).abs() / (d * d)).sqrt()
        },
    )
}
