//! Client for the EAS queue service.
//!
//! [`QueueClient`] wraps one queue: enqueue, range reads, acknowledgements
//! and streaming watches. Watches come back as a [`Watcher`] that yields
//! frames until closed; push watches survive connection drops by
//! reconnecting behind the caller's back.
//!
//! ```no_run
//! use eas_queue_client::{QueueClient, QueueConfig};
//! use eas_queue_core::Tags;
//!
//! # async fn demo() -> eas_queue_client::Result<()> {
//! let client = QueueClient::new(QueueConfig::new("http://localhost:8080", "jobs"))?;
//! client.put("hello", &Tags::new()).await?;
//!
//! let mut watcher = client.watch(0, 10, false, true).await?;
//! while let Some(frame) = watcher.recv().await {
//!     println!("{frame:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod attributes;
mod client;
pub mod config;
mod error;
pub mod protocol;
pub mod watch;

#[cfg(test)]
mod testing;

pub use attributes::{AttributeCache, AttributeSource, HttpAttributeSource};
pub use client::QueueClient;
pub use config::{QueueConfig, WatchMode};
pub use error::{ClientError, Result};
pub use watch::Watcher;
