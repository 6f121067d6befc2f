//! Error types for nufold

use thiserror::Error;

/// nufold error type.
///
/// `Argument` and `StoreOpen` are fatal to a whole run. `MissingIngredient`,
/// `BandMismatch`, `BinningMismatch`, and `Unfolding` are caught at the
/// per-prefix boundary and abort only that prefix's extraction.
/// `OutputExists` is a refusal to clobber another run's artifact.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed invocation.
    #[error("argument error: {0}")]
    Argument(String),

    /// An input store could not be opened or parsed.
    #[error("failed to open store {path}: {reason}")]
    StoreOpen {
        /// Path of the store that could not be opened.
        path: String,
        /// What went wrong while opening or parsing it.
        reason: String,
    },

    /// A required key is absent from an input store, or has the wrong shape.
    #[error("missing ingredient {key}: {reason}")]
    MissingIngredient {
        /// The store key that was looked up.
        key: String,
        /// Why the lookup failed.
        reason: String,
    },

    /// Two histograms that must be combined disagree on their error bands.
    #[error("band mismatch: {0}")]
    BandMismatch(String),

    /// Two histograms that must be combined disagree on their binning.
    #[error("binning mismatch: {0}")]
    BinningMismatch(String),

    /// The unfolding solve did not produce a usable result.
    #[error("unfolding failed: {0}")]
    Unfolding(String),

    /// Refusal to overwrite an existing output artifact.
    #[error("output artifact error: {0}")]
    OutputExists(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_key() {
        let err = Error::MissingIngredient {
            key: "Tracker_FiducialNucleons".into(),
            reason: "absent".into(),
        };
        assert!(err.to_string().contains("Tracker_FiducialNucleons"));
    }
}
