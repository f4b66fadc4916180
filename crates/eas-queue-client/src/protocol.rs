//! Protocol constants and request target helpers.

use std::time::Duration;

use eas_queue_core::Tags;
use reqwest::Url;

/// Response header carrying the id the server assigned to an enqueue.
pub const HEADER_REQUEST_ID: &str = "X-Eas-Queueservice-Request-Id";
pub const HEADER_AUTHORIZATION: &str = "Authorization";

/// Path prefix the queue name is joined onto.
pub const DEFAULT_BASE_PATH: &str = "/api/predict";

/// Capacity of every frame channel between a transport and its reader.
pub const FRAME_CHANNEL_CAPACITY: usize = 100;
/// Interval between keepalive pings on a push connection.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(1);
/// Interval between reconnect attempts after a push connection drops.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(1);
/// Upper bound on one push connection attempt, TCP connect plus handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound on waiting for the close handshake of a push connection.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);
/// Largest length-delimited unit accepted on a pull stream.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

// Query parameters.
pub const PARAM_ATTRS: &str = "_attrs_";
pub const PARAM_INDEX: &str = "_index_";
pub const PARAM_INDEXES: &str = "_indexes_";
pub const PARAM_LENGTH: &str = "_length_";
pub const PARAM_TIMEOUT: &str = "_timeout_";
pub const PARAM_RAW: &str = "_raw_";
pub const PARAM_AUTO_DELETE: &str = "_auto_delete_";
pub const PARAM_NEGATIVE: &str = "_negative_";
pub const PARAM_TRUNC: &str = "_trunc_";
pub const PARAM_EOS: &str = "_eos_";
pub const PARAM_FORCE: &str = "_force_";
pub const PARAM_WATCH: &str = "_watch_";
pub const PARAM_WINDOW: &str = "_window_";
pub const PARAM_INDEX_ONLY: &str = "_index_only_";
pub const PARAM_AUTO_COMMIT: &str = "_auto_commit_";

// Form fields of a negative acknowledgement.
pub const FORM_REASON: &str = "_reason_";
pub const FORM_CODE: &str = "_code_";

/// Tag used by `get_by_request_id`.
pub const TAG_REQUEST_ID: &str = "requestId";

/// Copy of `base` with `params` and `tags` appended to its query.
pub(crate) fn target(base: &Url, params: &[(&str, String)], tags: &Tags) -> Url {
    let mut url = base.clone();
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
        for (key, value) in tags.iter() {
            query.append_pair(key, value);
        }
    }
    url
}

pub(crate) fn join_indexes(indexes: &[u64]) -> String {
    indexes
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Read timeout in a form the server's duration parser accepts.
pub(crate) fn format_timeout(timeout: Duration) -> String {
    format!("{}ms", timeout.as_millis())
}

pub(crate) fn flag(value: bool) -> String {
    value.to_string()
}
