use std::collections::HashMap;

use crate::fragment::Fragment;
use crate::types::{Key, MetadataEntry, MetadataValue};

/// The merged, live metadata of an array as seen by one open session.
///
/// Iteration order is first-insertion order of the surviving keys:
/// - a put of a new key appends it,
/// - a put of a present key overwrites the value in place,
/// - a tombstone removes the key (no-op when absent).
///
/// A key that is deleted and later put again counts as new and lands at
/// the end. Nothing is ever sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataView {
    entries: Vec<(Key, MetadataValue)>,
    positions: HashMap<Key, usize>,
}

/// Replay fragments oldest to newest into a fresh view.
///
/// This is the only merge function: session open and consolidation both
/// go through it, so they cannot disagree.
pub fn merge<'f>(fragments: impl IntoIterator<Item = &'f Fragment>) -> MetadataView {
    let mut view = MetadataView::new();
    for fragment in fragments {
        for entry in &fragment.entries {
            view.apply(entry);
        }
    }
    view
}

impl MetadataView {
    pub fn new() -> Self {
        MetadataView::default()
    }

    /// Apply one put or tombstone.
    pub fn apply(&mut self, entry: &MetadataEntry) {
        match &entry.value {
            Some(value) => self.put(&entry.key, value.clone()),
            None => self.remove(&entry.key),
        }
    }

    fn put(&mut self, key: &[u8], value: MetadataValue) {
        match self.positions.get(key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.positions.insert(key.to_vec(), self.entries.len());
                self.entries.push((key.to_vec(), value));
            }
        }
    }

    fn remove(&mut self, key: &[u8]) {
        let Some(pos) = self.positions.remove(key) else {
            return;
        };
        self.entries.remove(pos);
        // Everything after the hole shifts left by one
        for (key, _) in &self.entries[pos..] {
            if let Some(p) = self.positions.get_mut(key) {
                *p -= 1;
            }
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&MetadataValue> {
        self.positions.get(key).map(|&pos| &self.entries[pos].1)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `index`-th live entry in iteration order.
    pub fn get_by_index(&self, index: usize) -> Option<(&[u8], &MetadataValue)> {
        self.entries
            .get(index)
            .map(|(key, value)| (key.as_slice(), value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &MetadataValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_slice(), value))
    }

    /// The live entries as puts, in iteration order. Replaying them into an
    /// empty view reproduces this view exactly.
    pub fn into_entries(self) -> Vec<MetadataEntry> {
        self.entries
            .into_iter()
            .map(|(key, value)| MetadataEntry::put(key, value))
            .collect()
    }
}
