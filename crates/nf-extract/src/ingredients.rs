//! Loading a prefix's ingredients from the input stores.
//!
//! Key naming convention: `<prefix>_Signal` is the folded data spectrum,
//! `<prefix>_Migration` the 2D reco×truth matrix, and so on; backgrounds
//! hang under `<prefix>_Background_<name>`. The fiducial nucleon count is
//! matched to a prefix by longest-matching-prefix lookup over
//! `<fiducialPrefix>_FiducialNucleons` keys.

use nf_core::{Error, Result};
use nf_hist::{Hist1D, Hist2D};
use nf_store::Store;

/// Key suffix identifying a folded data spectrum (and hence a prefix).
pub const SIGNAL_SUFFIX: &str = "_Signal";
const MIGRATION_SUFFIX: &str = "_Migration";
const EFF_NUM_SUFFIX: &str = "_EfficiencyNumerator";
const EFF_DENOM_SUFFIX: &str = "_EfficiencyDenominator";
const FLUX_SUFFIX: &str = "_reweightedflux_integrated";
const BACKGROUND_INFIX: &str = "_Background_";
const NUCLEONS_SUFFIX: &str = "_FiducialNucleons";

/// Top-level exposure key present in each dataset.
pub const POT_KEY: &str = "POTUsed";

/// Everything one prefix's extraction needs, cloned out of the read-only
/// input stores.
#[derive(Debug, Clone)]
pub struct Ingredients {
    /// Folded data spectrum.
    pub folded: Hist1D,
    /// Migration matrix (reco × truth).
    pub migration: Hist2D,
    /// Selected-and-truth-matched signal (efficiency numerator).
    pub eff_numerator: Hist1D,
    /// All true signal (efficiency denominator).
    pub eff_denominator: Hist1D,
    /// Integrated flux per bin.
    pub flux: Hist1D,
    /// Background templates, in key order.
    pub backgrounds: Vec<Hist1D>,
    /// Fiducial nucleon count (one-bin scalar histogram).
    pub nucleons: Hist1D,
    /// Data exposure.
    pub data_pot: f64,
    /// Simulation exposure.
    pub mc_pot: f64,
}

/// Every prefix with a folded spectrum in the data store, in key order.
pub fn discover_prefixes(data: &Store) -> Vec<String> {
    data.keys()
        .filter_map(|k| k.strip_suffix(SIGNAL_SUFFIX))
        .map(|p| p.to_string())
        .collect()
}

fn positive_exposure(store: &Store, what: &str) -> Result<f64> {
    let pot = store.get_scalar(POT_KEY)?;
    if !pot.is_finite() || pot <= 0.0 {
        return Err(Error::MissingIngredient {
            key: POT_KEY.to_string(),
            reason: format!("{what} exposure {pot} is not positive"),
        });
    }
    Ok(pot)
}

/// The nucleon count whose fiducial prefix is the longest prefix of
/// `prefix`.
fn find_nucleons(prefix: &str, sim: &Store) -> Result<Hist1D> {
    let best = sim
        .keys()
        .filter_map(|k| k.strip_suffix(NUCLEONS_SUFFIX).map(|fid| (fid, k)))
        .filter(|(fid, _)| prefix.starts_with(fid))
        .max_by_key(|(fid, _)| fid.len());

    let (_, key) = best.ok_or_else(|| Error::MissingIngredient {
        key: format!("*{NUCLEONS_SUFFIX}"),
        reason: format!("no fiducial nucleon count matches prefix {prefix}"),
    })?;

    let hist = sim.get_hist1d(key)?;
    if hist.n_bins() != 1 {
        return Err(Error::MissingIngredient {
            key: key.to_string(),
            reason: format!("nucleon count must be a one-bin scalar, has {} bins", hist.n_bins()),
        });
    }
    Ok(hist.clone())
}

/// Load all of one prefix's ingredients. Any absent or malformed required
/// key is a [`Error::MissingIngredient`], fatal for this prefix only.
pub fn load(prefix: &str, data: &Store, sim: &Store) -> Result<Ingredients> {
    let folded = data.get_hist1d(&format!("{prefix}{SIGNAL_SUFFIX}"))?.clone();
    let migration = sim.get_hist2d(&format!("{prefix}{MIGRATION_SUFFIX}"))?.clone();
    let eff_numerator = sim.get_hist1d(&format!("{prefix}{EFF_NUM_SUFFIX}"))?.clone();
    let eff_denominator = sim.get_hist1d(&format!("{prefix}{EFF_DENOM_SUFFIX}"))?.clone();
    let flux = sim.get_hist1d(&format!("{prefix}{FLUX_SUFFIX}"))?.clone();

    let background_prefix = format!("{prefix}{BACKGROUND_INFIX}");
    let background_keys: Vec<String> = sim
        .keys()
        .filter(|k| k.starts_with(&background_prefix))
        .map(|k| k.to_string())
        .collect();
    let mut backgrounds = Vec::with_capacity(background_keys.len());
    for key in &background_keys {
        backgrounds.push(sim.get_hist1d(key)?.clone());
    }

    let nucleons = find_nucleons(prefix, sim)?;
    let data_pot = positive_exposure(data, "data")?;
    let mc_pot = positive_exposure(sim, "simulation")?;

    tracing::info!(
        prefix,
        backgrounds = backgrounds.len(),
        nucleons = nucleons.cv()[0],
        data_pot,
        mc_pot,
        "loaded ingredients"
    );

    Ok(Ingredients {
        folded,
        migration,
        eff_numerator,
        eff_denominator,
        flux,
        backgrounds,
        nucleons,
        data_pot,
        mc_pot,
    })
}
