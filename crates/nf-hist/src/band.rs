//! Flat storage for systematic error bands.

use nf_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// One named systematic uncertainty source: an ordered list of universes.
///
/// Universe contents live in a single contiguous, universe-major buffer
/// (`data[universe * stride + bin]`) so that lock-step arithmetic over many
/// universes walks memory linearly. The stride is the owning histogram's
/// bin count (or `n_reco * n_truth` for a 2D histogram).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBand {
    n_universes: usize,
    data: Vec<f64>,
}

impl ErrorBand {
    /// Build a band from explicit universe contents. Every universe must
    /// have the same length.
    pub fn from_universes(universes: &[Vec<f64>]) -> Result<Self> {
        let stride = universes.first().map(|u| u.len()).unwrap_or(0);
        if universes.iter().any(|u| u.len() != stride) {
            return Err(Error::BinningMismatch(
                "universes within one band must share a binning".into(),
            ));
        }
        let mut data = Vec::with_capacity(universes.len() * stride);
        for u in universes {
            data.extend_from_slice(u);
        }
        Ok(ErrorBand { n_universes: universes.len(), data })
    }

    /// Build a band of `n_universes` universes, each an exact copy of
    /// `contents`. This is how a histogram that carries no information about
    /// a systematic source synthesizes it from its own central value.
    pub fn filled(contents: &[f64], n_universes: usize) -> Self {
        let mut data = Vec::with_capacity(n_universes * contents.len());
        for _ in 0..n_universes {
            data.extend_from_slice(contents);
        }
        ErrorBand { n_universes, data }
    }

    /// Number of universes in this band.
    pub fn n_universes(&self) -> usize {
        self.n_universes
    }

    /// Length of one universe's contents.
    pub fn stride(&self) -> usize {
        if self.n_universes == 0 { 0 } else { self.data.len() / self.n_universes }
    }

    /// One universe's bin contents.
    pub fn universe(&self, u: usize) -> &[f64] {
        let stride = self.stride();
        &self.data[u * stride..(u + 1) * stride]
    }

    /// Mutable access to one universe's bin contents.
    pub fn universe_mut(&mut self, u: usize) -> &mut [f64] {
        let stride = self.stride();
        &mut self.data[u * stride..(u + 1) * stride]
    }

    /// Iterate over universes in order.
    pub fn universes(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.stride().max(1))
    }

    pub(crate) fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Combine two bands universe-by-universe, bin-by-bin.
    pub(crate) fn zip_with(
        &self,
        other: &ErrorBand,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<ErrorBand> {
        if self.n_universes != other.n_universes || self.data.len() != other.data.len() {
            return Err(Error::BandMismatch(format!(
                "cannot combine bands of {} and {} universes",
                self.n_universes, other.n_universes
            )));
        }
        let data = self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect();
        Ok(ErrorBand { n_universes: self.n_universes, data })
    }

    /// Apply `f` to every bin of every universe in place.
    pub(crate) fn apply(&mut self, f: impl Fn(f64) -> f64) {
        for v in &mut self.data {
            *v = f(*v);
        }
    }
}

/// The band structure of a histogram: each source's name and universe count.
///
/// A layout abstracts over histogram dimensionality, so a 1D data spectrum
/// can be synchronized against the bands of a 2D migration matrix and vice
/// versa.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandLayout {
    entries: Vec<(String, usize)>,
}

impl BandLayout {
    /// Layout with no bands.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Vec<(String, usize)>) -> Self {
        BandLayout { entries }
    }

    /// Iterate over `(band name, universe count)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(name, n)| (name.as_str(), *n))
    }

    /// Number of bands in the layout.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the layout has no bands.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold another layout into this one. Bands present in both must agree
    /// on their universe count; a conflict means the two histograms cannot
    /// be made combinable.
    pub fn merge(&mut self, other: &BandLayout) -> Result<()> {
        for (name, n) in other.iter() {
            match self.entries.iter().find(|(have, _)| have == name) {
                Some((_, have_n)) if *have_n != n => {
                    return Err(Error::BandMismatch(format!(
                        "band {name} has {have_n} universes on one side and {n} on the other"
                    )));
                }
                Some(_) => {}
                None => self.entries.push((name.to_string(), n)),
            }
        }
        Ok(())
    }
}
