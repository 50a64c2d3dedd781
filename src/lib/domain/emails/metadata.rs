//! Free-form email metadata

use std::collections::{btree_map::Entry, BTreeMap, HashMap};

use super::errors::MetadataError;

/// A string map with case-insensitive keys
///
/// The casing of the first insert of a key is kept; later inserts that differ only in case
/// replace the value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata(BTreeMap<String, (String, String)>);

impl Metadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Build metadata from key/value pairs, rejecting blank keys
    pub fn try_from_pairs<I, K, V>(pairs: I) -> Result<Self, MetadataError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut metadata = Self::new();

        for (key, value) in pairs {
            metadata.insert(key.as_ref(), value)?;
        }

        Ok(metadata)
    }

    /// Insert or replace a value
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> Result<(), MetadataError> {
        if key.trim().is_empty() {
            return Err(MetadataError::EmptyKey);
        }

        let value = value.into();

        match self.0.entry(key.to_lowercase()) {
            Entry::Occupied(mut entry) => entry.get_mut().1 = value,
            Entry::Vacant(entry) => {
                entry.insert((key.to_string(), value));
            }
        }

        Ok(())
    }

    /// Look up a value ignoring key case
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(&key.to_lowercase())
            .map(|(_, value)| value.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs with their original key casing
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl TryFrom<HashMap<String, String>> for Metadata {
    type Error = MetadataError;

    fn try_from(map: HashMap<String, String>) -> Result<Self, Self::Error> {
        Self::try_from_pairs(map)
    }
}
