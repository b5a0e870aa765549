use serde::Serialize;
use std::collections::BTreeMap;

use crate::period::Period;
use crate::structs::{ClassificationResult, DimensionKey};

/// A sparse `(dimension key, period) -> finding` lookup.
///
/// This is what a renderer consumes to decide which crosstab cells to
/// highlight. Iteration is ordered by key, then period.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyMap<V = ClassificationResult> {
    entries: BTreeMap<(DimensionKey, Period), V>,
}

impl<V> AnomalyMap<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts a finding, returning the one it replaced, if any.
    pub fn insert(&mut self, key: DimensionKey, period: Period, value: V) -> Option<V> {
        self.entries.insert((key, period), value)
    }

    pub fn get(&self, key: &DimensionKey, period: Period) -> Option<&V> {
        // BTreeMap lookups need an owned tuple key.
        self.entries.get(&(key.clone(), period))
    }

    pub fn contains(&self, key: &DimensionKey, period: Period) -> bool {
        self.get(key, period).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DimensionKey, Period, &V)> {
        self.entries.iter().map(|((key, period), value)| (key, *period, value))
    }
}

impl<V> Default for AnomalyMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(DimensionKey, Period, V)> for AnomalyMap<V> {
    fn from_iter<I: IntoIterator<Item = (DimensionKey, Period, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, period, value) in iter {
            map.insert(key, period, value);
        }
        map
    }
}

#[derive(Serialize)]
struct MapEntry<'a, V> {
    key: &'a DimensionKey,
    period: Period,
    finding: &'a V,
}

/// Serialized as a flat list of entries; JSON objects cannot have tuple keys.
impl<V: Serialize> Serialize for AnomalyMap<V> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            self.iter()
                .map(|(key, period, finding)| MapEntry { key, period, finding }),
        )
    }
}
