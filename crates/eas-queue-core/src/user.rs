//! Queue user identity.
//!
//! A user is identified by a user id and a group id, carried on every request
//! under header names chosen by the server (see [`crate::Attributes`]).
//!
//! The textual form `uid:gid` is accepted wherever a user is configured as a
//! single string; the group part is optional and defaults to
//! [`DEFAULT_GROUP_NAME`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Group id used when none is configured.
pub const DEFAULT_GROUP_NAME: &str = "eas";

/// A queue user: user id, group id and an optional access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueUser {
    uid: String,
    gid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

impl QueueUser {
    /// Create a new user.
    pub fn new(uid: impl Into<String>, gid: impl Into<String>, token: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            gid: gid.into(),
            token,
        }
    }

    /// Attach an access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The user id.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// The group id.
    pub fn gid(&self) -> &str {
        &self.gid
    }

    /// The access token, if any. Empty tokens count as absent.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

impl fmt::Display for QueueUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}

impl FromStr for QueueUser {
    type Err = UserParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (uid, gid) = match s.split_once(':') {
            Some((uid, gid)) => (uid, gid),
            None => (s, DEFAULT_GROUP_NAME),
        };

        if uid.is_empty() {
            return Err(UserParseError::EmptyUid);
        }
        if gid.is_empty() {
            return Err(UserParseError::EmptyGid(s.to_string()));
        }

        Ok(Self::new(uid, gid, None))
    }
}

/// Error parsing a user string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UserParseError {
    #[error("user id cannot be empty")]
    EmptyUid,
    #[error("group id cannot be empty, got: {0}")]
    EmptyGid(String),
}
