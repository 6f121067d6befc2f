//! Merging per-run-period stores into one.

use nf_core::{Error, Result};

use crate::store::{Store, StoreValue};

/// Combine stores from separate running periods into one: histograms sum
/// lock-step (central values and matching universes together), exposure
/// scalars sum, so the merged `POTUsed` reflects the combined exposure.
///
/// Every key of the first store must be present in every other store with
/// the same kind; a missing or mismatched key is an error. Keys that later
/// stores carry beyond the first one's set are dropped with a warning, the
/// same way a partial run period's extras would be.
///
/// Exposure normalization between datasets is *not* applied here; the
/// extraction stage scales backgrounds by the data/simulation exposure
/// ratio itself.
pub fn merge_stores(first: Store, rest: &[Store]) -> Result<Store> {
    let mut merged = first;

    for store in rest {
        for extra in store.keys().filter(|k| merged.get(k).is_none()) {
            tracing::warn!(key = extra, "key not present in the first store; not merged");
        }

        let keys: Vec<String> = merged.keys().map(|k| k.to_string()).collect();
        for key in keys {
            let theirs = store.get(&key).ok_or_else(|| Error::MissingIngredient {
                key: key.clone(),
                reason: "absent from a store being merged in".into(),
            })?;

            let combined = match (merged.get(&key), theirs) {
                (
                    Some(StoreValue::Scalar { value: a }),
                    StoreValue::Scalar { value: b },
                ) => StoreValue::Scalar { value: a + b },
                (Some(StoreValue::Hist1D(a)), StoreValue::Hist1D(b)) => {
                    StoreValue::Hist1D(a.add(b)?)
                }
                (Some(StoreValue::Hist2D(a)), StoreValue::Hist2D(b)) => {
                    StoreValue::Hist2D(a.add(b)?)
                }
                _ => {
                    return Err(Error::MissingIngredient {
                        key,
                        reason: "stores disagree on the value kind".into(),
                    });
                }
            };
            merged.insert(key, combined);
        }
    }

    Ok(merged)
}
