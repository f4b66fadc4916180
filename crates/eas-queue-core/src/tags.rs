//! Tag filters.
//!
//! Tags are attached to frames on enqueue and passed back as query
//! parameters to filter reads and watches. Parameter names of the form
//! `_name_` belong to the protocol itself, so tags may not use them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered string key/value tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    /// Empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a tag.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check that every key can be sent as a query parameter.
    pub fn validate(&self) -> Result<(), TagError> {
        for key in self.0.keys() {
            if key.is_empty() {
                return Err(TagError::EmptyKey);
            }
            if is_reserved(key) {
                return Err(TagError::Reserved(key.clone()));
            }
        }
        Ok(())
    }
}

fn is_reserved(key: &str) -> bool {
    key.len() > 2 && key.starts_with('_') && key.ends_with('_')
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Tag validation failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TagError {
    #[error("tag key cannot be empty")]
    EmptyKey,
    #[error("tag key {0:?} is reserved by the queue protocol")]
    Reserved(String),
}
