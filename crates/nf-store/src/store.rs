//! Store document and typed accessors.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use nf_core::{Error, Result};
use nf_hist::{Hist1D, Hist2D};
use serde::{Deserialize, Serialize};

/// One stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreValue {
    /// A plain exposure count (e.g. protons on target).
    Scalar {
        /// The stored value.
        value: f64,
    },
    /// A 1D multi-universe histogram.
    Hist1D(Hist1D),
    /// A 2D multi-universe histogram.
    Hist2D(Hist2D),
}

/// A flat, ordered key→value mapping backed by a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    values: BTreeMap<String, StoreValue>,
}

impl Store {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a store document.
    pub fn open(path: &Path) -> Result<Self> {
        let open_err = |reason: String| Error::StoreOpen {
            path: path.display().to_string(),
            reason,
        };
        let bytes = std::fs::read(path).map_err(|e| open_err(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| open_err(e.to_string()))
    }

    /// Persist the store as pretty JSON. Create-only: an existing file at
    /// `path` is never overwritten.
    pub fn write_new(&self, path: &Path) -> Result<()> {
        let exists_err = |reason: String| {
            Error::OutputExists(format!("{}: {reason}", path.display()))
        };
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| exists_err(e.to_string()))?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| exists_err(e.to_string()))?;
        file.write_all(json.as_bytes()).map_err(|e| exists_err(e.to_string()))?;
        Ok(())
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: StoreValue) {
        self.values.insert(key.into(), value);
    }

    /// Raw lookup.
    pub fn get(&self, key: &str) -> Option<&StoreValue> {
        self.values.get(key)
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// All scalar-valued entries, in key order.
    pub fn scalars(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().filter_map(|(k, v)| match v {
            StoreValue::Scalar { value } => Some((k.as_str(), *value)),
            _ => None,
        })
    }

    fn missing(key: &str, reason: &str) -> Error {
        Error::MissingIngredient { key: key.to_string(), reason: reason.to_string() }
    }

    /// A scalar by key.
    pub fn get_scalar(&self, key: &str) -> Result<f64> {
        match self.values.get(key) {
            Some(StoreValue::Scalar { value }) => Ok(*value),
            Some(_) => Err(Self::missing(key, "expected a scalar")),
            None => Err(Self::missing(key, "absent")),
        }
    }

    /// A 1D histogram by key.
    pub fn get_hist1d(&self, key: &str) -> Result<&Hist1D> {
        match self.values.get(key) {
            Some(StoreValue::Hist1D(h)) => Ok(h),
            Some(_) => Err(Self::missing(key, "expected a 1D histogram")),
            None => Err(Self::missing(key, "absent")),
        }
    }

    /// A 2D histogram by key.
    pub fn get_hist2d(&self, key: &str) -> Result<&Hist2D> {
        match self.values.get(key) {
            Some(StoreValue::Hist2D(h)) => Ok(h),
            Some(_) => Err(Self::missing(key, "expected a 2D histogram")),
            None => Err(Self::missing(key, "absent")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> Store {
        let mut store = Store::new();
        store.insert("POTUsed", StoreValue::Scalar { value: 1.0e19 });
        store.insert(
            "Tracker_Signal",
            StoreValue::Hist1D(
                Hist1D::with_contents(
                    "Tracker_Signal",
                    &[0.0, 1.0, 2.0],
                    vec![10.0, 20.0],
                    vec![3.0, 4.0],
                )
                .unwrap(),
            ),
        );
        store
    }

    #[test]
    fn typed_getters_distinguish_absent_from_wrong_kind() {
        let store = sample_store();
        assert!(store.get_scalar("POTUsed").is_ok());
        assert!(matches!(
            store.get_hist1d("POTUsed"),
            Err(Error::MissingIngredient { .. })
        ));
        assert!(matches!(
            store.get_scalar("NotThere"),
            Err(Error::MissingIngredient { .. })
        ));
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        let store = sample_store();
        store.write_new(&path).unwrap();
        let back = Store::open(&path).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn write_new_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        let store = sample_store();
        store.write_new(&path).unwrap();
        match store.write_new(&path) {
            Err(Error::OutputExists(_)) => {}
            other => panic!("expected OutputExists, got {other:?}"),
        }
    }

    #[test]
    fn open_reports_parse_failures_as_store_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(Store::open(&path), Err(Error::StoreOpen { .. })));
    }

    #[test]
    fn open_reports_missing_file_as_store_open() {
        let path = Path::new("/nonexistent/store.json");
        assert!(matches!(Store::open(path), Err(Error::StoreOpen { .. })));
    }
}
