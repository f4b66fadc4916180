//! Server-assigned protocol attributes.
//!
//! The queue server decides which HTTP header names carry the user id, group
//! id and priority. Clients fetch this mapping once and consult it on every
//! request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Logical attribute keys understood by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    /// Header carrying the user id. Required.
    UserIdentifyHeader,
    /// Header carrying the group id.
    GroupIdentifyHeader,
    /// Header carrying the enqueue priority.
    PriorityHeader,
}

impl AttributeKey {
    /// Key as it appears in the encoded attribute mapping.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserIdentifyHeader => "meta.header.user_id",
            Self::GroupIdentifyHeader => "meta.header.group_id",
            Self::PriorityHeader => "meta.header.priority",
        }
    }
}

/// Snapshot of attribute key to header name mappings.
///
/// Unknown keys are preserved so newer servers stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert for a known key.
    pub fn with(mut self, key: AttributeKey, header: impl Into<String>) -> Self {
        self.0.insert(key.as_str().to_string(), header.into());
        self
    }

    /// Header name for `key`. Empty names count as absent.
    pub fn get(&self, key: AttributeKey) -> Option<&str> {
        self.0
            .get(key.as_str())
            .map(String::as_str)
            .filter(|h| !h.is_empty())
    }

    pub fn user_header(&self) -> Option<&str> {
        self.get(AttributeKey::UserIdentifyHeader)
    }

    pub fn group_header(&self) -> Option<&str> {
        self.get(AttributeKey::GroupIdentifyHeader)
    }

    pub fn priority_header(&self) -> Option<&str> {
        self.get(AttributeKey::PriorityHeader)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw key to header name pairs, including unknown keys.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, header)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {header}")?;
        }
        f.write_str("}")
    }
}
