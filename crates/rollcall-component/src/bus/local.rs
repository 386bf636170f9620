use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;

use rollcall_core::error::Result;

use super::{BusMessage, MessageBus, Subscription};

const SUBSCRIPTION_QUEUE: usize = 256;

/// In-process bus: `subject -> subscriber queues`.
///
/// Delivery is lossy like a real bus under pressure: a full subscriber queue
/// drops the message. Closed subscriptions are pruned on publish and on every
/// subscribe, so one-shot request inboxes do not accumulate.
#[derive(Default)]
pub struct LocalBus {
    subjects: DashMap<String, Vec<mpsc::Sender<BusMessage>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self {
            subjects: DashMap::new(),
        }
    }

    pub fn subscriber_count(&self, subject: &str) -> usize {
        self.subjects
            .get(subject)
            .map(|s| s.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Subjects with at least one registered sender (closed ones included until pruned).
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    fn prune_closed(&self) {
        self.subjects.retain(|_, senders| {
            senders.retain(|tx| !tx.is_closed());
            !senders.is_empty()
        });
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn publish(&self, subject: &str, reply: Option<&str>, payload: Bytes) -> Result<()> {
        let Some(mut subs) = self.subjects.get_mut(subject) else {
            return Ok(());
        };
        subs.retain(|tx| !tx.is_closed());
        for tx in subs.iter() {
            let msg = BusMessage {
                subject: subject.to_string(),
                reply: reply.map(str::to_string),
                payload: payload.clone(),
            };
            if tx.try_send(msg).is_err() {
                tracing::debug!(%subject, "subscriber queue full; message dropped");
            }
        }
        let empty = subs.is_empty();
        drop(subs);
        if empty {
            self.subjects.remove_if(subject, |_, v| v.is_empty());
        }
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription> {
        self.prune_closed();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_QUEUE);
        self.subjects
            .entry(subject.to_string())
            .or_default()
            .push(tx);
        Ok(Subscription::new(subject, rx))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn fan_out_to_every_subscriber() {
        let bus = LocalBus::new();
        let mut a = bus.subscribe("s").await.unwrap();
        let mut b = bus.subscribe("s").await.unwrap();
        assert_eq!(a.subject(), "s");
        bus.publish("s", None, Bytes::from_static(b"hi")).await.unwrap();

        assert_eq!(a.next().await.unwrap().payload, Bytes::from_static(b"hi"));
        assert_eq!(b.next().await.unwrap().subject, "s");
    }

    #[tokio::test]
    async fn dropped_subscription_is_pruned() {
        let bus = LocalBus::new();
        let sub = bus.subscribe("s").await.unwrap();
        assert_eq!(bus.subscriber_count("s"), 1);
        drop(sub);
        bus.publish("s", None, Bytes::new()).await.unwrap();
        assert_eq!(bus.subscriber_count("s"), 0);
    }

    #[tokio::test]
    async fn request_gets_reply_on_inbox() {
        let bus = std::sync::Arc::new(LocalBus::new());
        let mut svc = bus.subscribe("echo").await.unwrap();
        let responder = bus.clone();
        tokio::spawn(async move {
            let msg = svc.next().await.unwrap();
            let reply = msg.reply.unwrap();
            responder.publish(&reply, None, msg.payload).await.unwrap();
        });

        let got = bus
            .request("echo", Bytes::from_static(b"ping"), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(got.subject.starts_with("_INBOX."));
        assert_eq!(got.payload, Bytes::from_static(b"ping"));
    }

    #[tokio::test]
    async fn request_inboxes_do_not_accumulate() {
        let bus = std::sync::Arc::new(LocalBus::new());
        let mut svc = bus.subscribe("echo").await.unwrap();
        let responder = bus.clone();
        tokio::spawn(async move {
            while let Some(msg) = svc.next().await {
                if let Some(reply) = msg.reply {
                    let _ = responder.publish(&reply, None, msg.payload).await;
                }
            }
        });

        for _ in 0..100 {
            bus.request("echo", Bytes::new(), Duration::from_secs(1)).await.unwrap();
        }
        for _ in 0..100 {
            let timed_out = bus.request("nobody", Bytes::new(), Duration::from_millis(1)).await;
            assert!(timed_out.is_err());
        }

        // "echo" plus at most the last inbox, which is pruned by the next subscribe
        assert!(bus.subject_count() <= 2, "subjects: {}", bus.subject_count());
        let _other = bus.subscribe("other").await.unwrap();
        assert_eq!(bus.subject_count(), 2);
    }

    #[tokio::test]
    async fn request_without_responder_times_out() {
        let bus = LocalBus::new();
        let err = bus
            .request("nobody", Bytes::new(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err.client_code().as_str(), "INTERNAL");
    }
}
