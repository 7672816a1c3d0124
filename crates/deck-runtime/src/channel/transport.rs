//! In-process duplex transport for the channel.
//!
//! Delivery is at-most-once and the protocol above never assumes
//! ordering between independently sent messages, so this port can be
//! swapped for a real cross-process transport without protocol changes.

use super::error::ChannelError;
use super::message::ChannelMessage;
use tokio::sync::mpsc;

/// Default per-direction buffer depth.
pub const DEFAULT_PORT_BUFFER: usize = 64;

/// One end of a duplex message pipe.
///
/// # Example
///
/// ```
/// use deck_runtime::channel::{ChannelMessage, MessagePort};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (left, mut right) = MessagePort::pair(8);
///
/// left.send(ChannelMessage::service_ready()).await.unwrap();
/// let received = right.recv().await.unwrap();
/// assert!(received.request_id.is_none());
/// # }
/// ```
pub struct MessagePort {
    tx: mpsc::Sender<ChannelMessage>,
    rx: mpsc::Receiver<ChannelMessage>,
}

impl MessagePort {
    /// Creates two cross-wired ports.
    #[must_use]
    pub fn pair(buffer: usize) -> (Self, Self) {
        let (left_tx, right_rx) = mpsc::channel(buffer);
        let (right_tx, left_rx) = mpsc::channel(buffer);
        (
            Self {
                tx: left_tx,
                rx: left_rx,
            },
            Self {
                tx: right_tx,
                rx: right_rx,
            },
        )
    }

    /// Sends a message to the peer.
    ///
    /// # Errors
    ///
    /// [`ChannelError::SendFailed`] if the peer is gone.
    pub async fn send(&self, message: ChannelMessage) -> Result<(), ChannelError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| ChannelError::SendFailed("peer detached".into()))
    }

    /// Receives the next message; `None` once the peer is gone and the
    /// buffer is drained.
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        self.rx.recv().await
    }

    pub(crate) fn into_split(
        self,
    ) -> (mpsc::Sender<ChannelMessage>, mpsc::Receiver<ChannelMessage>) {
        (self.tx, self.rx)
    }
}

impl std::fmt::Debug for MessagePort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePort").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MessageKind;
    use serde_json::json;

    #[tokio::test]
    async fn pair_delivers_both_directions() {
        let (mut a, mut b) = MessagePort::pair(4);

        a.send(ChannelMessage::event(MessageKind::LoadingChange, json!(true)))
            .await
            .unwrap();
        b.send(ChannelMessage::service_ready()).await.unwrap();

        assert_eq!(b.recv().await.unwrap().kind, MessageKind::LoadingChange);
        assert_eq!(a.recv().await.unwrap().kind, MessageKind::ServiceReady);
    }

    #[tokio::test]
    async fn send_to_dropped_peer_fails() {
        let (a, b) = MessagePort::pair(4);
        drop(b);

        let err = a.send(ChannelMessage::service_ready()).await.unwrap_err();
        assert_eq!(err, ChannelError::SendFailed("peer detached".into()));
    }

    #[tokio::test]
    async fn recv_drains_buffer_after_peer_drop() {
        let (a, mut b) = MessagePort::pair(4);
        a.send(ChannelMessage::service_ready()).await.unwrap();
        drop(a);

        assert!(b.recv().await.is_some());
        assert!(b.recv().await.is_none());
    }
}
