//! Pub/sub seam.
//!
//! The component only needs three things from a bus: fire-and-forget publish,
//! subject subscriptions, and request/reply. `LocalBus` is the in-process
//! implementation; a networked client implements `MessageBus` the same way.

mod local;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use rollcall_core::error::{Result, RollcallError};

pub use local::LocalBus;

/// One delivered message.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub subject: String,
    /// Where a reply should be published, for request/reply traffic.
    pub reply: Option<String>,
    pub payload: Bytes,
}

/// A live subscription. Dropping it cancels delivery.
pub struct Subscription {
    subject: String,
    rx: mpsc::Receiver<BusMessage>,
}

impl Subscription {
    pub fn new(subject: impl Into<String>, rx: mpsc::Receiver<BusMessage>) -> Self {
        Self {
            subject: subject.into(),
            rx,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Next message, or `None` once the bus side is gone.
    pub async fn next(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }
}

#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, subject: &str, reply: Option<&str>, payload: Bytes) -> Result<()>;

    async fn subscribe(&self, subject: &str) -> Result<Subscription>;

    /// Publish with a unique inbox as reply subject and wait for the first answer.
    async fn request(&self, subject: &str, payload: Bytes, timeout: Duration) -> Result<BusMessage> {
        let token: [u8; 8] = rand::random();
        let inbox = format!("_INBOX.{}", hex::encode(token));
        let mut sub = self.subscribe(&inbox).await?;
        self.publish(subject, Some(&inbox), payload).await?;

        match tokio::time::timeout(timeout, sub.next()).await {
            Ok(Some(msg)) => Ok(msg),
            Ok(None) => Err(RollcallError::Internal(format!("inbox for {subject} closed"))),
            Err(_) => Err(RollcallError::Internal(format!("request on {subject} timed out"))),
        }
    }
}
