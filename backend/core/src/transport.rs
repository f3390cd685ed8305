use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::DeliveryError;

/// The write side of one long-lived stream.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn write(&mut self, frame: String) -> Result<(), DeliveryError>;

    /// Push buffered frames to the peer. Transports without a flush keep the default.
    async fn flush(&mut self) -> Result<(), DeliveryError> {
        Err(DeliveryError::FlushUnsupported)
    }

    /// Resolves once the peer has gone away.
    async fn closed(&self);
}

/// Transport backed by a bounded channel whose receiver feeds a response body.
///
/// The peer is gone once the receiver is dropped.
pub struct ChannelTransport {
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// A transport and the receiving end of its frames.
    pub fn pair(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn write(&mut self, frame: String) -> Result<(), DeliveryError> {
        self.tx.send(frame).await.map_err(|_| DeliveryError::Closed)
    }

    // Each frame becomes its own body chunk, so there is nothing left to push.
    async fn flush(&mut self) -> Result<(), DeliveryError> {
        if self.tx.is_closed() {
            return Err(DeliveryError::Closed);
        }
        Ok(())
    }

    async fn closed(&self) {
        self.tx.closed().await;
    }
}
