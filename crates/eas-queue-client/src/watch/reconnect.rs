//! Reconnecting supervisor for push transports.
//!
//! The watcher owns one output channel for its whole life. Frames from the
//! current [`PushTransport`] are forwarded to it in order; when that
//! transport's channel closes the watcher retries the connection every
//! [`RECONNECT_INTERVAL`] until it succeeds or the watcher is cancelled.
//! Only cancellation closes the output.

use super::push::{PushConnector, PushTransport};
use crate::error::Result;
use crate::protocol::{FRAME_CHANNEL_CAPACITY, RECONNECT_INTERVAL};
use eas_queue_core::Frame;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub struct ReconnectingWatcher {
    frames: mpsc::Receiver<Frame>,
    cancel: CancellationToken,
}

impl ReconnectingWatcher {
    /// Open the first connection and start supervising. Fails, without
    /// leaving anything running, if the first connection cannot be made.
    pub async fn connect(connector: PushConnector, cancel: CancellationToken) -> Result<Self> {
        let first = match PushTransport::connect(&connector, cancel.child_token()).await {
            Ok(transport) => transport,
            Err(e) => {
                cancel.cancel();
                return Err(e);
            }
        };
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        tokio::spawn(supervise(connector, first, tx, cancel.clone()));
        Ok(Self { frames: rx, cancel })
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ReconnectingWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn supervise(
    connector: PushConnector,
    mut current: PushTransport,
    out: mpsc::Sender<Frame>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = current.recv() => next,
        };

        match next {
            Some(frame) => {
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = out.send(frame) => sent,
                };
                if sent.is_err() {
                    break;
                }
            }
            None => {
                tracing::info!("connection to {} lost, reconnecting", connector.url());
                match reconnect(&connector, &cancel).await {
                    Some(transport) => current = transport,
                    None => break,
                }
            }
        }
    }

    current.close();
    tracing::debug!("watcher for {} closed", connector.url());
}

/// Retry on every tick until connected. `None` if cancelled first.
async fn reconnect(connector: &PushConnector, cancel: &CancellationToken) -> Option<PushTransport> {
    let mut ticker = time::interval_at(Instant::now() + RECONNECT_INTERVAL, RECONNECT_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = ticker.tick() => {}
        }

        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            attempt = PushTransport::connect(connector, cancel.child_token()) => attempt,
        };
        match attempt {
            Ok(transport) => {
                tracing::info!("reconnected to {}", connector.url());
                return Some(transport);
            }
            Err(e) => tracing::warn!("connect to {} failed: {}, retrying", connector.url(), e),
        }
    }
}
