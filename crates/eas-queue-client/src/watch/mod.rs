//! Streaming watches.
//!
//! A [`Watcher`] is the caller's handle on a watch: a sequence of frames and
//! a `close` operation. Behind it sits one of two transports, picked by the
//! client's [`crate::WatchMode`]:
//!
//! - push: a [`ReconnectingWatcher`] over WebSocket connections, which hides
//!   disconnects and only ends when closed;
//! - pull: a single [`PullTransport`], which ends on the first failure.

pub mod pull;
pub mod push;
pub mod reconnect;

pub use pull::PullTransport;
pub use push::{PushConnector, PushTransport};
pub use reconnect::ReconnectingWatcher;

use crate::config::WatchMode;
use eas_queue_core::Frame;
use futures_util::Stream;

enum Transport {
    Push(ReconnectingWatcher),
    Pull(PullTransport),
}

/// Handle on a running watch.
///
/// Dropping the handle closes the watch.
pub struct Watcher {
    transport: Transport,
}

impl Watcher {
    pub(crate) fn push(watcher: ReconnectingWatcher) -> Self {
        Self {
            transport: Transport::Push(watcher),
        }
    }

    pub(crate) fn pull(transport: PullTransport) -> Self {
        Self {
            transport: Transport::Pull(transport),
        }
    }

    /// Next frame. `None` means the watch is over: closed by the caller for
    /// push watches, or closed or failed for pull watches.
    pub async fn recv(&mut self) -> Option<Frame> {
        match &mut self.transport {
            Transport::Push(watcher) => watcher.recv().await,
            Transport::Pull(transport) => transport.recv().await,
        }
    }

    /// Stop the watch. Frames already buffered may still be received before
    /// `recv` returns `None`. Safe to call more than once.
    pub fn close(&self) {
        match &self.transport {
            Transport::Push(watcher) => watcher.close(),
            Transport::Pull(transport) => transport.close(),
        }
    }

    pub fn mode(&self) -> WatchMode {
        match self.transport {
            Transport::Push(_) => WatchMode::Push,
            Transport::Pull(_) => WatchMode::Pull,
        }
    }

    /// Consume the handle as a stream of frames.
    pub fn into_stream(self) -> impl Stream<Item = Frame> + Send {
        futures_util::stream::unfold(self, |mut watcher| async move {
            let frame = watcher.recv().await?;
            Some((frame, watcher))
        })
    }
}
