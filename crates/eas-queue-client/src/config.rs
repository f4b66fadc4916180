//! Client configuration.
//!
//! A [`QueueConfig`] can be built in code or loaded from TOML:
//!
//! ```toml
//! endpoint = "http://queue.example.com"
//! queue_name = "jobs"
//! token = "secret"
//! watch_mode = "pull"
//! wire_format = "json"
//!
//! [extra_headers]
//! X-Trace = "on"
//! ```

use crate::error::{ClientError, Result};
use crate::protocol::DEFAULT_BASE_PATH;
use eas_queue_core::{DEFAULT_GROUP_NAME, QueueUser, WireFormat};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Transport used by watches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    /// Persistent WebSocket connection, reconnected on failure.
    #[default]
    Push,
    /// One streaming HTTP response; ends on the first failure.
    Pull,
}

/// Everything needed to construct a [`crate::QueueClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Server endpoint, e.g. `http://host:port`. Defaults to `http` when no
    /// scheme is given.
    pub endpoint: String,
    pub queue_name: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// User id; a random one is generated when unset.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    /// Headers added to enqueue and negative-acknowledge requests.
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub watch_mode: WatchMode,
    /// Encoding of frames and attributes; protobuf unless set.
    #[serde(default)]
    pub wire_format: WireFormat,
}

fn default_base_path() -> String {
    DEFAULT_BASE_PATH.to_string()
}

impl QueueConfig {
    pub fn new(endpoint: impl Into<String>, queue_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            queue_name: queue_name.into(),
            token: None,
            base_path: default_base_path(),
            user_id: None,
            group_id: None,
            extra_headers: BTreeMap::new(),
            watch_mode: WatchMode::default(),
            wire_format: WireFormat::default(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_user_id(mut self, uid: impl Into<String>) -> Self {
        self.user_id = Some(uid.into());
        self
    }

    pub fn with_group_id(mut self, gid: impl Into<String>) -> Self {
        self.group_id = Some(gid.into());
        self
    }

    pub fn with_extra_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_watch_mode(mut self, mode: WatchMode) -> Self {
        self.watch_mode = mode;
        self
    }

    pub fn with_wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = format;
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Queue URL: endpoint joined with base path and queue name.
    pub fn base_url(&self) -> Result<Url> {
        if self.queue_name.trim_matches('/').is_empty() {
            return Err(ClientError::Config("queue name cannot be empty".to_string()));
        }
        let endpoint = self.endpoint.trim_end_matches('/');
        let endpoint = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        };
        let path = [self.base_path.as_str(), self.queue_name.as_str()]
            .iter()
            .flat_map(|part| part.split('/'))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        let raw = format!("{endpoint}/{path}");
        Url::parse(&raw).map_err(|e| ClientError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// The user requests are made as.
    pub fn user(&self) -> QueueUser {
        let uid = match self.user_id.as_deref() {
            Some(uid) if !uid.is_empty() => uid.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        let gid = match self.group_id.as_deref() {
            Some(gid) if !gid.is_empty() => gid,
            _ => DEFAULT_GROUP_NAME,
        };
        QueueUser::new(uid, gid, self.token.clone())
    }
}
