//! Expanding a one-bin scalar across an arbitrary binning.

use nf_core::{Error, Result};

use crate::band::ErrorBand;
use crate::hist1d::Hist1D;

/// Expand a one-bin scalar-with-uncertainty across `template`'s binning.
///
/// Every bin of the result's central value equals the scalar's single
/// central value, and for every band the scalar carries, every bin of
/// universe `u` equals the scalar's universe-`u` value. Bands the scalar
/// lacks are *not* fabricated here; synchronize afterwards if the result
/// must combine with a richer histogram.
///
/// The scalar's statistical error is not spread across bins: a constant
/// repeated in every bin is fully correlated with itself, which per-bin
/// independent errors cannot represent, so the result's statistical errors
/// are zero.
pub fn broadcast(scalar: &Hist1D, template: &Hist1D) -> Result<Hist1D> {
    if scalar.n_bins() != 1 {
        return Err(Error::BinningMismatch(format!(
            "{} has {} bins; only a one-bin scalar can be broadcast",
            scalar.name(),
            scalar.n_bins()
        )));
    }

    let n = template.n_bins();
    let mut out = Hist1D::with_contents(
        scalar.name(),
        template.edges(),
        vec![scalar.cv()[0]; n],
        vec![0.0; n],
    )?;

    for (name, band) in scalar.bands() {
        let universes: Vec<Vec<f64>> =
            band.universes().map(|u| vec![u[0]; n]).collect();
        out.set_band(name, ErrorBand::from_universes(&universes)?)?;
    }

    Ok(out)
}
