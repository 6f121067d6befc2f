//! Negative-bin diagnostics.

use nf_hist::Hist1D;

/// Where a negative bin was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinLocation {
    /// In the central value.
    Cv,
    /// In one universe of one band.
    Universe {
        /// Band name.
        band: String,
        /// Universe index within the band.
        universe: usize,
    },
}

/// One strictly-negative bin.
#[derive(Debug, Clone, PartialEq)]
pub struct NegativeBin {
    /// Central value or a specific universe.
    pub location: BinLocation,
    /// Bin index.
    pub bin: usize,
    /// The offending content.
    pub value: f64,
}

/// Scan the central value and every universe of every band for bins with
/// strictly negative content.
///
/// Diagnostic only: the histogram is never modified and findings are never
/// escalated to errors. A background subtraction can legitimately drive a
/// statistically-starved bin below zero; the record is for manual
/// inspection.
pub fn report_negative_bins(hist: &Hist1D) -> Vec<NegativeBin> {
    let mut found = Vec::new();

    for (bin, &value) in hist.cv().iter().enumerate() {
        if value < 0.0 {
            found.push(NegativeBin { location: BinLocation::Cv, bin, value });
        }
    }
    for (name, band) in hist.bands() {
        for (universe, contents) in band.universes().enumerate() {
            for (bin, &value) in contents.iter().enumerate() {
                if value < 0.0 {
                    found.push(NegativeBin {
                        location: BinLocation::Universe { band: name.to_string(), universe },
                        bin,
                        value,
                    });
                }
            }
        }
    }

    found
}
