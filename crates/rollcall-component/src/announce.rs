//! Announce on registration; answer every discovery request.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use rollcall_core::error::{Result, RollcallError};
use rollcall_core::protocol::{Announcement, Credentials, ANNOUNCE_SUBJECT, DISCOVER_SUBJECT};

use crate::bus::MessageBus;
use crate::identity::Identity;
use crate::varz::format_uptime;

/// Static registration facts an announcement is built from.
#[derive(Debug, Clone)]
pub struct AnnouncementTemplate {
    pub identity: Identity,
    pub host: String,
    pub credentials: Credentials,
    pub start: String,
    pub started: Instant,
}

impl AnnouncementTemplate {
    pub fn current(&self) -> Announcement {
        Announcement {
            component_type: self.identity.component_type().to_string(),
            index: self.identity.index(),
            uuid: self.identity.uuid().to_string(),
            host: self.host.clone(),
            credentials: self.credentials.clone(),
            start: self.start.clone(),
            uptime: format_uptime(self.started.elapsed()),
        }
    }
}

#[derive(Clone)]
pub struct AnnouncementPublisher {
    bus: Arc<dyn MessageBus>,
    template: Arc<AnnouncementTemplate>,
}

impl AnnouncementPublisher {
    pub fn new(bus: Arc<dyn MessageBus>, template: Arc<AnnouncementTemplate>) -> Self {
        Self { bus, template }
    }

    pub fn template(&self) -> &AnnouncementTemplate {
        &self.template
    }

    /// Fire-and-forget publish on the announce subject.
    pub async fn announce(&self) -> Result<()> {
        let payload = self.template.current().encode()?;
        self.bus.publish(ANNOUNCE_SUBJECT, None, payload).await?;
        tracing::debug!(uuid = %self.template.identity.uuid(), "announced");
        Ok(())
    }

    /// Subscribe to discovery requests and spawn the reply loop.
    ///
    /// The subscription is established before this returns; failure to
    /// subscribe is a startup error.
    pub async fn listen(&self) -> Result<JoinHandle<()>> {
        let mut sub = self
            .bus
            .subscribe(DISCOVER_SUBJECT)
            .await
            .map_err(|e| RollcallError::TransportSetup(format!("subscribe {DISCOVER_SUBJECT}: {e}")))?;

        let this = self.clone();
        Ok(tokio::spawn(async move {
            while let Some(msg) = sub.next().await {
                let Some(reply) = msg.reply else {
                    tracing::debug!("discover without reply subject ignored");
                    continue;
                };
                if let Err(e) = this.reply_to(&reply).await {
                    tracing::warn!(error = %e, %reply, "discover reply failed");
                }
            }
            tracing::debug!("discover subscription closed");
        }))
    }

    async fn reply_to(&self, reply: &str) -> Result<()> {
        let payload = self.template.current().encode()?;
        self.bus.publish(reply, None, payload).await?;
        tracing::debug!(%reply, "discover answered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::bus::{BusMessage, LocalBus, Subscription};

    fn template(index: u32) -> Arc<AnnouncementTemplate> {
        Arc::new(AnnouncementTemplate {
            identity: Identity::allocate("type", index).unwrap(),
            host: "127.0.0.1:4000".into(),
            credentials: Credentials::new("u", "p"),
            start: "2026-10-14 00:00:00 +0000".into(),
            started: Instant::now(),
        })
    }

    #[tokio::test]
    async fn one_reply_per_discover_request() {
        let bus = Arc::new(LocalBus::new());
        let publisher = AnnouncementPublisher::new(bus.clone(), template(2));
        let _loop = publisher.listen().await.unwrap();

        let mut inbox = bus.subscribe("inbox.1").await.unwrap();
        bus.publish(DISCOVER_SUBJECT, Some("inbox.1"), Bytes::new()).await.unwrap();
        bus.publish(DISCOVER_SUBJECT, Some("inbox.1"), Bytes::new()).await.unwrap();
        // no reply subject: ignored
        bus.publish(DISCOVER_SUBJECT, None, Bytes::new()).await.unwrap();

        for _ in 0..2 {
            let msg = tokio::time::timeout(Duration::from_secs(1), inbox.next())
                .await
                .unwrap()
                .unwrap();
            let a = Announcement::decode(&msg.payload).unwrap();
            assert_eq!(a.index, 2);
            assert!(a.uuid.starts_with("2-"));
        }
        assert!(tokio::time::timeout(Duration::from_millis(50), inbox.next()).await.is_err());
    }

    struct NoSubscribe;

    #[async_trait]
    impl crate::bus::MessageBus for NoSubscribe {
        async fn publish(&self, _: &str, _: Option<&str>, _: Bytes) -> Result<()> {
            Ok(())
        }

        async fn subscribe(&self, _: &str) -> Result<Subscription> {
            Err(RollcallError::Internal("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn subscribe_failure_is_transport_setup() {
        let publisher = AnnouncementPublisher::new(Arc::new(NoSubscribe), template(0));
        let err = publisher.listen().await.unwrap_err();
        assert_eq!(err.client_code().as_str(), "TRANSPORT_SETUP");
    }

    #[tokio::test]
    async fn announce_reaches_announce_subject() {
        let bus = Arc::new(LocalBus::new());
        let mut sub = bus.subscribe(ANNOUNCE_SUBJECT).await.unwrap();
        AnnouncementPublisher::new(bus.clone(), template(0))
            .announce()
            .await
            .unwrap();
        let BusMessage { payload, .. } = sub.next().await.unwrap();
        assert_eq!(Announcement::decode(&payload).unwrap().component_type, "type");
    }
}
