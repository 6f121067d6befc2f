//! 2D multi-universe histogram (migration matrices).

use std::collections::BTreeMap;

use nf_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::band::{BandLayout, ErrorBand};

/// A two-axis multi-universe histogram indexed by
/// `(reconstructed bin, true bin)`.
///
/// Contents are stored reco-major: `cv[reco * n_truth + truth]`. Bands have
/// the same structure as in [`crate::Hist1D`], with one
/// `n_reco * n_truth` plane per universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist2D {
    name: String,
    reco_edges: Vec<f64>,
    truth_edges: Vec<f64>,
    cv: Vec<f64>,
    cv_err: Vec<f64>,
    #[serde(default)]
    bands: BTreeMap<String, ErrorBand>,
}

fn check_axis(edges: &[f64], axis: &str) -> Result<()> {
    if edges.len() < 2 || edges.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::BinningMismatch(format!(
            "{axis} axis needs at least one bin with strictly increasing edges"
        )));
    }
    Ok(())
}

impl Hist2D {
    /// An empty histogram on the given axes.
    pub fn new(name: impl Into<String>, reco_edges: &[f64], truth_edges: &[f64]) -> Result<Self> {
        check_axis(reco_edges, "reco")?;
        check_axis(truth_edges, "truth")?;
        let n = (reco_edges.len() - 1) * (truth_edges.len() - 1);
        Ok(Hist2D {
            name: name.into(),
            reco_edges: reco_edges.to_vec(),
            truth_edges: truth_edges.to_vec(),
            cv: vec![0.0; n],
            cv_err: vec![0.0; n],
            bands: BTreeMap::new(),
        })
    }

    /// A histogram with explicit reco-major contents.
    pub fn with_contents(
        name: impl Into<String>,
        reco_edges: &[f64],
        truth_edges: &[f64],
        cv: Vec<f64>,
        cv_err: Vec<f64>,
    ) -> Result<Self> {
        check_axis(reco_edges, "reco")?;
        check_axis(truth_edges, "truth")?;
        let n = (reco_edges.len() - 1) * (truth_edges.len() - 1);
        if cv.len() != n || cv_err.len() != n {
            return Err(Error::BinningMismatch(format!(
                "expected {n} cells, got {} contents and {} errors",
                cv.len(),
                cv_err.len()
            )));
        }
        Ok(Hist2D {
            name: name.into(),
            reco_edges: reco_edges.to_vec(),
            truth_edges: truth_edges.to_vec(),
            cv,
            cv_err,
            bands: BTreeMap::new(),
        })
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of reconstructed bins.
    pub fn n_reco(&self) -> usize {
        self.reco_edges.len() - 1
    }

    /// Number of true bins.
    pub fn n_truth(&self) -> usize {
        self.truth_edges.len() - 1
    }

    /// Reconstructed-axis bin edges.
    pub fn reco_edges(&self) -> &[f64] {
        &self.reco_edges
    }

    /// True-axis bin edges.
    pub fn truth_edges(&self) -> &[f64] {
        &self.truth_edges
    }

    /// Central-value contents, reco-major.
    pub fn cv(&self) -> &[f64] {
        &self.cv
    }

    /// Central-value statistical errors, reco-major.
    pub fn cv_err(&self) -> &[f64] {
        &self.cv_err
    }

    /// Content of cell `(reco, truth)`.
    pub fn value(&self, reco: usize, truth: usize) -> f64 {
        self.cv[reco * self.n_truth() + truth]
    }

    /// Look up a band by name.
    pub fn band(&self, name: &str) -> Option<&ErrorBand> {
        self.bands.get(name)
    }

    /// Install (or replace) a band of `n_reco * n_truth` planes.
    pub fn set_band(&mut self, name: impl Into<String>, band: ErrorBand) -> Result<()> {
        if band.data_len() != band.n_universes() * self.cv.len() {
            return Err(Error::BinningMismatch(format!(
                "band does not match the {}×{} binning of {}",
                self.n_reco(),
                self.n_truth(),
                self.name
            )));
        }
        self.bands.insert(name.into(), band);
        Ok(())
    }

    /// This histogram's band structure.
    pub fn band_layout(&self) -> BandLayout {
        BandLayout::from_entries(
            self.bands.iter().map(|(name, band)| (name.clone(), band.n_universes())).collect(),
        )
    }

    /// For every band in `layout` that this histogram lacks, create it with
    /// universes copied from this histogram's central value. Idempotent;
    /// existing bands are untouched.
    pub fn add_missing_bands(&mut self, layout: &BandLayout) {
        for (name, n_universes) in layout.iter() {
            if !self.bands.contains_key(name) {
                self.bands.insert(name.to_string(), ErrorBand::filled(&self.cv, n_universes));
            }
        }
    }

    /// The migration plane to use when unfolding band `band`, universe `u`:
    /// the matching universe when this matrix carries that band, otherwise
    /// the central value (the matrix does not vary with that systematic).
    pub fn universe_or_cv(&self, band: &str, u: usize) -> &[f64] {
        match self.bands.get(band) {
            Some(b) if u < b.n_universes() => b.universe(u),
            _ => &self.cv,
        }
    }

    /// Elementwise sum, lock-step across every universe of every band.
    /// Both sides must agree on axes and band structure.
    pub fn add(&self, other: &Hist2D) -> Result<Hist2D> {
        if self.reco_edges != other.reco_edges || self.truth_edges != other.truth_edges {
            return Err(Error::BinningMismatch(format!(
                "{} and {} have different axes",
                self.name, other.name
            )));
        }
        for (name, band) in &self.bands {
            match other.bands.get(name) {
                Some(theirs) if theirs.n_universes() == band.n_universes() => {}
                _ => {
                    return Err(Error::BandMismatch(format!(
                        "band {name} differs between {} and {}",
                        self.name, other.name
                    )));
                }
            }
        }
        if let Some((name, _)) = other.bands.iter().find(|(n, _)| !self.bands.contains_key(*n)) {
            return Err(Error::BandMismatch(format!(
                "{} carries band {name} that {} lacks",
                other.name, self.name
            )));
        }

        let cv = self.cv.iter().zip(&other.cv).map(|(&a, &b)| a + b).collect();
        let cv_err = self
            .cv_err
            .iter()
            .zip(&other.cv_err)
            .map(|(&a, &b)| (a * a + b * b).sqrt())
            .collect();
        let mut bands = BTreeMap::new();
        for (name, band) in &self.bands {
            bands.insert(name.clone(), band.zip_with(&other.bands[name], |a, b| a + b)?);
        }

        Ok(Hist2D {
            name: self.name.clone(),
            reco_edges: self.reco_edges.clone(),
            truth_edges: self.truth_edges.clone(),
            cv,
            cv_err,
            bands,
        })
    }
}
