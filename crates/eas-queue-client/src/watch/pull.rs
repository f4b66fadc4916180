//! Pull transport: frames demultiplexed from one streaming response body.
//!
//! The body is a sequence of units, each prefixed with its length as a
//! 4-byte big-endian integer. End of body, a read error, a decode error or
//! cancellation all end the stream for good; there is no reconnect.

use crate::protocol::{FRAME_CHANNEL_CAPACITY, MAX_FRAME_LENGTH};
use eas_queue_core::{Frame, FrameCodec};
use futures_util::{StreamExt, TryStreamExt};
use std::io;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::LengthDelimitedCodec;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

pub struct PullTransport {
    frames: mpsc::Receiver<Frame>,
    cancel: CancellationToken,
}

impl PullTransport {
    /// Start reading frames from `reader`.
    pub fn spawn<R>(reader: R, codec: Arc<dyn FrameCodec>, cancel: CancellationToken) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        tokio::spawn(run(reader, codec, tx, cancel.clone()));
        Self { frames: rx, cancel }
    }

    /// Start reading frames from the body of a watch response.
    pub(crate) fn from_response(
        response: reqwest::Response,
        codec: Arc<dyn FrameCodec>,
        cancel: CancellationToken,
    ) -> Self {
        let body = response.bytes_stream().map_err(io::Error::other);
        Self::spawn(StreamReader::new(Box::pin(body)), codec, cancel)
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PullTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<R>(
    reader: R,
    codec: Arc<dyn FrameCodec>,
    tx: mpsc::Sender<Frame>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut units = LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_read(reader);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = units.next() => next,
        };
        let unit = match next {
            Some(Ok(unit)) => unit,
            Some(Err(e)) => {
                tracing::debug!("pull stream read failed: {}", e);
                break;
            }
            None => {
                tracing::debug!("pull stream ended");
                break;
            }
        };
        let frame = match codec.decode(&unit) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("pull stream decode failed: {}", e);
                break;
            }
        };
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = tx.send(frame) => sent,
        };
        if sent.is_err() {
            break;
        }
    }
    cancel.cancel();
}
