//! Flux, target, and exposure normalization.

use nf_core::Result;
use nf_hist::{broadcast, Hist1D};

/// The flux is recorded per m², the reporting convention is per cm².
pub const M2_TO_CM2: f64 = 1.0e4;

/// Convert an efficiency-corrected event count into a flux- and
/// target-normalized differential rate.
///
/// Five steps, in this order, each applied exactly once to the central
/// value and to every universe of every band:
///
/// 1. divide by the integrated flux,
/// 2. divide by the nucleon count (a one-bin scalar is broadcast across
///    the binning first),
/// 3. scale by `1 / exposure`,
/// 4. scale by [`M2_TO_CM2`],
/// 5. divide every bin by its width.
///
/// Bands missing on either side of a division are synthesized from the
/// respective central value before dividing, so a flux or nucleon count
/// that does not vary with some systematic still tracks it coherently.
pub fn normalize(
    accepted: &Hist1D,
    flux: &Hist1D,
    nucleons: &Hist1D,
    exposure: f64,
) -> Result<Hist1D> {
    let mut nucleons = if nucleons.n_bins() == 1 {
        broadcast(nucleons, accepted)?
    } else {
        nucleons.clone()
    };
    let mut flux = flux.clone();
    let mut out = accepted.clone();

    let mut layout = out.band_layout();
    layout.merge(&flux.band_layout())?;
    layout.merge(&nucleons.band_layout())?;
    out.add_missing_bands(&layout);
    flux.add_missing_bands(&layout);
    nucleons.add_missing_bands(&layout);

    let mut out = out.divide(&flux)?;
    out = out.divide(&nucleons)?;
    out.scale(1.0 / exposure);
    out.scale(M2_TO_CM2);
    out.bin_width_normalize();
    Ok(out)
}
