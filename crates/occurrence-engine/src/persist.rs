//! Persistence of per-household view state through an opaque blob store.
//!
//! Saved custom ranges (per household) and filter settings (per household
//! and tab) are stored as JSON blobs under string keys. The engine only
//! (de)serializes them; where and how blobs are kept is up to the
//! [`BlobStore`] implementation.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::filter::FilterOptions;
use crate::views::NamedRange;

/// Key-value storage for opaque string blobs.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&mut self, key: &str, blob: String) -> Result<()>;
}

/// In-process blob store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn put(&mut self, key: &str, blob: String) -> Result<()> {
        self.blobs.insert(key.to_string(), blob);
        Ok(())
    }
}

pub fn ranges_key(household_id: &str) -> String {
    format!("ranges:{}", household_id)
}

pub fn filters_key(household_id: &str, tab: &str) -> String {
    format!("filters:{}:{}", household_id, tab)
}

fn load_json<T: DeserializeOwned>(store: &dyn BlobStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        None => Ok(None),
        Some(blob) => serde_json::from_str(&blob)
            .map(Some)
            .map_err(|e| EngineError::Storage(format!("corrupt blob '{}': {}", key, e))),
    }
}

fn save_json<T: Serialize + ?Sized>(store: &mut dyn BlobStore, key: &str, value: &T) -> Result<()> {
    let blob = serde_json::to_string(value)
        .map_err(|e| EngineError::Storage(format!("cannot encode '{}': {}", key, e)))?;
    store.put(key, blob)
}

/// Saved custom ranges for a household; empty when none were saved.
pub fn load_ranges(store: &dyn BlobStore, household_id: &str) -> Result<Vec<NamedRange>> {
    Ok(load_json(store, &ranges_key(household_id))?.unwrap_or_default())
}

/// Save `range`, replacing any saved range with the same name.
pub fn save_range(store: &mut dyn BlobStore, household_id: &str, range: NamedRange) -> Result<()> {
    let mut ranges = load_ranges(store, household_id)?;
    match ranges.iter_mut().find(|r| r.name == range.name) {
        Some(existing) => *existing = range,
        None => ranges.push(range),
    }
    tracing::debug!(household = household_id, count = ranges.len(), "saving custom ranges");
    save_json(store, &ranges_key(household_id), &ranges)
}

pub fn find_range(
    store: &dyn BlobStore,
    household_id: &str,
    name: &str,
) -> Result<Option<NamedRange>> {
    Ok(load_ranges(store, household_id)?
        .into_iter()
        .find(|r| r.name == name))
}

/// Saved filters for a household tab; defaults when none were saved.
pub fn load_filters(store: &dyn BlobStore, household_id: &str, tab: &str) -> Result<FilterOptions> {
    Ok(load_json(store, &filters_key(household_id, tab))?.unwrap_or_default())
}

pub fn save_filters(
    store: &mut dyn BlobStore,
    household_id: &str,
    tab: &str,
    options: &FilterOptions,
) -> Result<()> {
    save_json(store, &filters_key(household_id, tab), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PrioritySort;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_ranges_empty_by_default() {
        let store = MemoryBlobStore::new();
        assert!(load_ranges(&store, "h1").unwrap().is_empty());
    }

    #[test]
    fn test_save_range_replaces_by_name() {
        let mut store = MemoryBlobStore::new();
        let first = NamedRange::new("Easter", date(2024, 3, 25), date(2024, 4, 1)).unwrap();
        let second = NamedRange::new("Summer", date(2024, 6, 20), date(2024, 8, 15)).unwrap();
        let moved = NamedRange::new("Easter", date(2024, 3, 23), date(2024, 4, 2)).unwrap();
        save_range(&mut store, "h1", first).unwrap();
        save_range(&mut store, "h1", second).unwrap();
        save_range(&mut store, "h1", moved.clone()).unwrap();

        let ranges = load_ranges(&store, "h1").unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0], moved);
        assert_eq!(find_range(&store, "h1", "Summer").unwrap().unwrap().end, date(2024, 8, 15));
        assert!(find_range(&store, "h2", "Summer").unwrap().is_none());
    }

    #[test]
    fn test_filters_are_per_household_and_tab() {
        let mut store = MemoryBlobStore::new();
        let options = FilterOptions {
            priority_sort: PrioritySort::LowFirst,
            ..FilterOptions::default().with_tags("school, sport")
        };
        save_filters(&mut store, "h1", "week", &options).unwrap();

        assert_eq!(load_filters(&store, "h1", "week").unwrap(), options);
        assert_eq!(load_filters(&store, "h1", "month").unwrap(), FilterOptions::default());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_corrupt_blob_is_storage_error() {
        let mut store = MemoryBlobStore::new();
        store.put(&ranges_key("h1"), "not json".to_string()).unwrap();
        let err = load_ranges(&store, "h1").unwrap_err().to_string();
        assert!(err.contains("Storage error"), "got: {err}");
    }
}
