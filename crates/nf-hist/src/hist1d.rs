//! 1D multi-universe histogram.

use std::collections::BTreeMap;

use nf_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::band::{BandLayout, ErrorBand};

/// A binned spectrum carrying a central value with per-bin statistical
/// errors, named systematic error bands, and optional named covariance
/// sources (row-major `n_bins × n_bins` matrices).
///
/// Invariant: every universe of every band shares the central value's
/// binning. Two histograms may only be combined when their binnings match
/// exactly and their band structures agree; use
/// [`Hist1D::add_missing_bands`] first when one side lacks a band the other
/// carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist1D {
    name: String,
    edges: Vec<f64>,
    cv: Vec<f64>,
    cv_err: Vec<f64>,
    #[serde(default)]
    bands: BTreeMap<String, ErrorBand>,
    #[serde(default)]
    covariances: BTreeMap<String, Vec<f64>>,
}

fn check_edges(edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::BinningMismatch("a histogram needs at least one bin".into()));
    }
    if edges.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::BinningMismatch("bin edges must be strictly increasing".into()));
    }
    Ok(())
}

impl Hist1D {
    /// An empty (all-zero) histogram on the given binning.
    pub fn new(name: impl Into<String>, edges: &[f64]) -> Result<Self> {
        check_edges(edges)?;
        let n = edges.len() - 1;
        Ok(Hist1D {
            name: name.into(),
            edges: edges.to_vec(),
            cv: vec![0.0; n],
            cv_err: vec![0.0; n],
            bands: BTreeMap::new(),
            covariances: BTreeMap::new(),
        })
    }

    /// A histogram with explicit central-value contents and statistical
    /// errors.
    pub fn with_contents(
        name: impl Into<String>,
        edges: &[f64],
        cv: Vec<f64>,
        cv_err: Vec<f64>,
    ) -> Result<Self> {
        check_edges(edges)?;
        let n = edges.len() - 1;
        if cv.len() != n || cv_err.len() != n {
            return Err(Error::BinningMismatch(format!(
                "{} edges define {} bins but got {} contents and {} errors",
                edges.len(),
                n,
                cv.len(),
                cv_err.len()
            )));
        }
        Ok(Hist1D {
            name: name.into(),
            edges: edges.to_vec(),
            cv,
            cv_err,
            bands: BTreeMap::new(),
            covariances: BTreeMap::new(),
        })
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the histogram name, consuming and returning `self`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.cv.len()
    }

    /// Bin edges (`n_bins + 1` entries, strictly increasing).
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Width of bin `i`.
    pub fn bin_width(&self, i: usize) -> f64 {
        self.edges[i + 1] - self.edges[i]
    }

    /// Central-value bin contents.
    pub fn cv(&self) -> &[f64] {
        &self.cv
    }

    /// Central-value statistical errors.
    pub fn cv_err(&self) -> &[f64] {
        &self.cv_err
    }

    /// Look up a band by name.
    pub fn band(&self, name: &str) -> Option<&ErrorBand> {
        self.bands.get(name)
    }

    /// Iterate over `(band name, band)` in name order.
    pub fn bands(&self) -> impl Iterator<Item = (&str, &ErrorBand)> {
        self.bands.iter().map(|(name, band)| (name.as_str(), band))
    }

    /// Install (or replace) a band. The band's universes must share this
    /// histogram's binning.
    pub fn set_band(&mut self, name: impl Into<String>, band: ErrorBand) -> Result<()> {
        if band.data_len() != band.n_universes() * self.n_bins() {
            return Err(Error::BinningMismatch(format!(
                "band does not match the {}-bin binning of {}",
                self.n_bins(),
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
    /// the same number of universes, each an exact copy of this histogram's
    /// central value. Bands already present are left untouched, so the
    /// operation is idempotent. Bands present here but absent from `layout`
    /// are kept.
    pub fn add_missing_bands(&mut self, layout: &BandLayout) {
        for (name, n_universes) in layout.iter() {
            if !self.bands.contains_key(name) {
                self.bands.insert(name.to_string(), ErrorBand::filled(&self.cv, n_universes));
            }
        }
    }

    /// Look up a named covariance source (row-major `n_bins × n_bins`).
    pub fn covariance(&self, name: &str) -> Option<&[f64]> {
        self.covariances.get(name).map(|m| m.as_slice())
    }

    /// Iterate over named covariance sources.
    pub fn covariances(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.covariances.iter().map(|(name, m)| (name.as_str(), m.as_slice()))
    }

    /// Attach a named covariance source.
    pub fn push_covariance(&mut self, name: impl Into<String>, matrix: Vec<f64>) -> Result<()> {
        let n = self.n_bins();
        if matrix.len() != n * n {
            return Err(Error::BinningMismatch(format!(
                "covariance has {} entries, expected {n}×{n}",
                matrix.len()
            )));
        }
        self.covariances.insert(name.into(), matrix);
        Ok(())
    }

    /// Whether `other` shares this histogram's binning exactly.
    pub fn same_binning(&self, other: &Hist1D) -> bool {
        self.edges == other.edges
    }

    pub(crate) fn check_same_binning(&self, other: &Hist1D) -> Result<()> {
        if !self.same_binning(other) {
            return Err(Error::BinningMismatch(format!(
                "{} ({} bins) vs {} ({} bins)",
                self.name,
                self.n_bins(),
                other.name,
                other.n_bins()
            )));
        }
        Ok(())
    }

    fn check_same_bands(&self, other: &Hist1D) -> Result<()> {
        for (name, band) in &self.bands {
            match other.bands.get(name) {
                None => {
                    return Err(Error::BandMismatch(format!(
                        "{} carries band {name} that {} lacks; synchronize bands first",
                        self.name, other.name
                    )));
                }
                Some(theirs) if theirs.n_universes() != band.n_universes() => {
                    return Err(Error::BandMismatch(format!(
                        "band {name}: {} universes in {} vs {} in {}",
                        band.n_universes(),
                        self.name,
                        theirs.n_universes(),
                        other.name
                    )));
                }
                Some(_) => {}
            }
        }
        if let Some((name, _)) = other.bands.iter().find(|(n, _)| !self.bands.contains_key(*n)) {
            return Err(Error::BandMismatch(format!(
                "{} carries band {name} that {} lacks; synchronize bands first",
                other.name, self.name
            )));
        }
        Ok(())
    }

    /// Lock-step binary combination: `value` is applied bin-by-bin to the
    /// central values and, independently, to every universe of every band;
    /// `error` combines the central-value statistical errors. The result
    /// keeps `self`'s covariance sources.
    pub(crate) fn combine(
        &self,
        other: &Hist1D,
        value: impl Fn(f64, f64) -> f64,
        error: impl Fn(f64, f64, f64, f64) -> f64,
    ) -> Result<Hist1D> {
        self.check_same_binning(other)?;
        self.check_same_bands(other)?;

        let cv: Vec<f64> =
            self.cv.iter().zip(&other.cv).map(|(&a, &b)| value(a, b)).collect();
        let cv_err: Vec<f64> = self
            .cv
            .iter()
            .zip(&self.cv_err)
            .zip(other.cv.iter().zip(&other.cv_err))
            .map(|((&a, &ea), (&b, &eb))| error(a, ea, b, eb))
            .collect();

        let mut bands = BTreeMap::new();
        for (name, band) in &self.bands {
            let theirs = &other.bands[name];
            bands.insert(name.clone(), band.zip_with(theirs, &value)?);
        }

        Ok(Hist1D {
            name: self.name.clone(),
            edges: self.edges.clone(),
            cv,
            cv_err,
            bands,
            covariances: self.covariances.clone(),
        })
    }

    /// Elementwise sum, with independent-error propagation on the central
    /// value and lock-step universe sums.
    pub fn add(&self, other: &Hist1D) -> Result<Hist1D> {
        self.combine(other, |a, b| a + b, |_, ea, _, eb| (ea * ea + eb * eb).sqrt())
    }

    /// `self − scale · other`, lock-step across every universe of every
    /// band. This is the background-subtraction primitive: `scale` is the
    /// exposure ratio between the two samples.
    pub fn subtract_scaled(&self, other: &Hist1D, scale: f64) -> Result<Hist1D> {
        self.combine(
            other,
            |a, b| a - scale * b,
            |_, ea, _, eb| (ea * ea + scale * scale * eb * eb).sqrt(),
        )
    }

    /// Elementwise ratio with independent-error propagation. Bins with a
    /// zero denominator come out zero. For a numerator that is a subset of
    /// the denominator use [`crate::ratio_correlated`] instead.
    pub fn divide(&self, other: &Hist1D) -> Result<Hist1D> {
        self.combine(
            other,
            |a, b| if b == 0.0 { 0.0 } else { a / b },
            |a, ea, b, eb| {
                if a == 0.0 || b == 0.0 {
                    0.0
                } else {
                    let r = a / b;
                    (r * r * ((ea / a).powi(2) + (eb / b).powi(2))).sqrt()
                }
            },
        )
    }

    /// Multiply every bin of the central value and of every universe by
    /// `factor`. Statistical errors scale by `|factor|`, covariance sources
    /// by `factor²`.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.cv {
            *v *= factor;
        }
        for e in &mut self.cv_err {
            *e *= factor.abs();
        }
        for band in self.bands.values_mut() {
            band.apply(|v| v * factor);
        }
        for m in self.covariances.values_mut() {
            for v in m.iter_mut() {
                *v *= factor * factor;
            }
        }
    }

    /// Divide every bin (central value and every universe) by its bin
    /// width; covariance entry `(i, j)` is divided by `wᵢ·wⱼ`. The last
    /// step of turning an event count into a differential rate.
    pub fn bin_width_normalize(&mut self) {
        let widths: Vec<f64> = (0..self.n_bins()).map(|i| self.bin_width(i)).collect();
        for (v, w) in self.cv.iter_mut().zip(&widths) {
            *v /= w;
        }
        for (e, w) in self.cv_err.iter_mut().zip(&widths) {
            *e /= w;
        }
        let n = widths.len();
        for band in self.bands.values_mut() {
            for u in 0..band.n_universes() {
                let universe = band.universe_mut(u);
                for (v, w) in universe.iter_mut().zip(&widths) {
                    *v /= w;
                }
            }
        }
        for m in self.covariances.values_mut() {
            for i in 0..n {
                for j in 0..n {
                    m[i * n + j] /= widths[i] * widths[j];
                }
            }
        }
    }
}
