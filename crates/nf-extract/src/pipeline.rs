//! Per-prefix extraction pipeline and run orchestration.

use nf_core::{Error, Result};
use nf_hist::{ratio_correlated, Hist1D};
use nf_store::{Store, StoreValue};
use nf_unfold::Method;
use rayon::prelude::*;

use crate::ingredients::{self, discover_prefixes};
use crate::normalize::normalize;
use crate::sanity::{report_negative_bins, BinLocation};
use crate::subtract::subtract_backgrounds;

/// The derived histograms one prefix's extraction produces, in the order
/// they were produced.
#[derive(Debug, Clone)]
pub struct PrefixOutput {
    /// The signal definition this output belongs to.
    pub prefix: String,
    /// Folded spectrum after background removal.
    pub background_subtracted: Hist1D,
    /// Truth-binned spectrum after unfolding.
    pub unfolded: Hist1D,
    /// The measured differential cross section.
    pub cross_section: Hist1D,
    /// The simulation's prediction, normalized with its own exposure.
    pub simulated_cross_section: Hist1D,
}

/// Outcome of a whole run: completed prefixes plus isolated failures.
#[derive(Debug)]
pub struct ExtractionSummary {
    /// Successfully extracted prefixes.
    pub outputs: Vec<PrefixOutput>,
    /// Prefixes that failed, with the cause. A failure here never blocks
    /// other prefixes.
    pub failures: Vec<(String, Error)>,
}

fn log_negative_bins(prefix: &str, stage: &str, hist: &Hist1D) -> bool {
    let found = report_negative_bins(hist);
    for neg in &found {
        match &neg.location {
            BinLocation::Cv => tracing::warn!(
                prefix,
                stage,
                bin = neg.bin,
                value = neg.value,
                "negative bin in CV"
            ),
            BinLocation::Universe { band, universe } => tracing::warn!(
                prefix,
                stage,
                band = band.as_str(),
                universe,
                bin = neg.bin,
                value = neg.value,
                "negative bin in universe"
            ),
        }
    }
    !found.is_empty()
}

/// Run the full extraction for one signal definition.
///
/// Stages run strictly in order — load, band synchronization, background
/// subtraction, negative-bin scan (diagnostic only), unfolding (fatal on
/// failure), efficiency and acceptance correction, normalization — and
/// each stage's output is the unique input to the next.
pub fn extract_prefix(
    prefix: &str,
    data: &Store,
    sim: &Store,
    method: Method,
) -> Result<PrefixOutput> {
    let mut ing = ingredients::load(prefix, data, sim)?;

    // Synchronize bands: every ingredient ends up carrying the union of
    // all bands, absent ones synthesized from its own CV. From here on any
    // band mismatch is a hard error, never silently ignored.
    let mut layout = ing.folded.band_layout();
    layout.merge(&ing.migration.band_layout())?;
    layout.merge(&ing.eff_numerator.band_layout())?;
    layout.merge(&ing.eff_denominator.band_layout())?;
    layout.merge(&ing.flux.band_layout())?;
    layout.merge(&ing.nucleons.band_layout())?;
    for bkg in &ing.backgrounds {
        layout.merge(&bkg.band_layout())?;
    }

    ing.folded.add_missing_bands(&layout);
    ing.migration.add_missing_bands(&layout);
    ing.eff_numerator.add_missing_bands(&layout);
    ing.eff_denominator.add_missing_bands(&layout);
    for bkg in &mut ing.backgrounds {
        bkg.add_missing_bands(&layout);
    }
    tracing::info!(prefix, bands = layout.len(), "synchronized error bands");

    let background_subtracted =
        subtract_backgrounds(&ing.folded, &ing.backgrounds, ing.data_pot, ing.mc_pot)?;
    log_negative_bins(prefix, "backgroundSubtracted", &background_subtracted);

    let unfolded = nf_unfold::unfold(&background_subtracted, &ing.migration, method)?;

    let efficiency = ratio_correlated(&ing.eff_numerator, &ing.eff_denominator)?;
    let accepted = ratio_correlated(&unfolded, &efficiency)?;

    let cross_section = normalize(&accepted, &ing.flux, &ing.nucleons, ing.data_pot)?;
    let simulated_cross_section =
        normalize(&ing.eff_denominator, &ing.flux, &ing.nucleons, ing.mc_pot)?;

    tracing::info!(prefix, "extraction complete");
    Ok(PrefixOutput {
        prefix: prefix.to_string(),
        background_subtracted,
        unfolded,
        cross_section,
        simulated_cross_section,
    })
}

/// Extract every prefix found in the data store.
///
/// Prefixes only share read-only access to the two stores, so they run in
/// parallel on the current rayon pool. Failures are isolated: a prefix
/// that cannot be extracted is recorded and the rest keep going.
pub fn run_extraction(data: &Store, sim: &Store, method: Method) -> ExtractionSummary {
    let prefixes = discover_prefixes(data);
    tracing::info!(prefixes = prefixes.len(), "starting extraction");

    let results: Vec<(String, Result<PrefixOutput>)> = prefixes
        .par_iter()
        .map(|prefix| (prefix.clone(), extract_prefix(prefix, data, sim, method)))
        .collect();

    let mut summary = ExtractionSummary { outputs: Vec::new(), failures: Vec::new() };
    for (prefix, result) in results {
        match result {
            Ok(output) => summary.outputs.push(output),
            Err(error) => {
                tracing::error!(prefix = prefix.as_str(), %error, "prefix failed");
                summary.failures.push((prefix, error));
            }
        }
    }
    summary
}

/// Assemble the output store: the four derived histograms per completed
/// prefix, plus copies of the data store's scalar bookkeeping values.
pub fn output_store(summary: &ExtractionSummary, data: &Store) -> Store {
    let mut out = Store::new();
    for (key, value) in data.scalars() {
        out.insert(key, StoreValue::Scalar { value });
    }
    for output in &summary.outputs {
        let p = &output.prefix;
        out.insert(
            format!("{p}_backgroundSubtracted"),
            StoreValue::Hist1D(output.background_subtracted.clone()),
        );
        out.insert(format!("{p}_unfolded"), StoreValue::Hist1D(output.unfolded.clone()));
        out.insert(
            format!("{p}_crossSection"),
            StoreValue::Hist1D(output.cross_section.clone()),
        );
        out.insert(
            format!("{p}_simulatedCrossSection"),
            StoreValue::Hist1D(output.simulated_cross_section.clone()),
        );
    }
    out
}
