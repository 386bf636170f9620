//! Registration: validate, allocate identity, seed varz, announce, serve.
//!
//! There is no process-global registry; `register` hands back an owned
//! `Component` and every handler shares its state through `Arc`s.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;

use rollcall_core::error::{Result, RollcallError};
use rollcall_core::protocol::{Announcement, Credentials};

use crate::announce::{AnnouncementPublisher, AnnouncementTemplate};
use crate::bus::MessageBus;
use crate::config::RegisterOptions;
use crate::http::{self, MonitorState};
use crate::identity::Identity;
use crate::stats::{ProcfsSampler, ResourceSampler, StatsCache};
use crate::varz::{SeedFields, VarzStore};

const START_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
const DEFAULT_HEALTHZ: &str = "ok\n";

pub struct Registrar {
    sampler: Arc<dyn ResourceSampler>,
}

impl Default for Registrar {
    fn default() -> Self {
        Self::new()
    }
}

impl Registrar {
    pub fn new() -> Self {
        Self {
            sampler: Arc::new(ProcfsSampler::new()),
        }
    }

    /// Use a different resource source (e.g. a stub in tests).
    pub fn with_sampler(sampler: Arc<dyn ResourceSampler>) -> Self {
        Self { sampler }
    }

    pub async fn register(&self, opts: RegisterOptions, bus: Arc<dyn MessageBus>) -> Result<Component> {
        // 1) Validate before anything is allocated, bound or published
        opts.validate()?;
        let component_type = opts
            .component_type
            .as_deref()
            .ok_or_else(|| RollcallError::Config("type is required".into()))?;

        // 2) Identity and credentials
        let identity = Identity::allocate(component_type, opts.index)?;
        let credentials = opts.credentials().unwrap_or_else(generate_credentials);

        // 3) Bind monitoring listener
        let bind = SocketAddr::new(opts.host_ip, opts.port.unwrap_or(0));
        let listener = TcpListener::bind(bind)
            .await
            .map_err(|e| RollcallError::TransportSetup(format!("bind {bind}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| RollcallError::TransportSetup(format!("local_addr: {e}")))?;
        let host = local_addr.to_string();

        // 4) Seed varz
        let started = Instant::now();
        let start = chrono::Local::now().format(START_FORMAT).to_string();
        let stats = StatsCache::new(
            Arc::clone(&self.sampler),
            Duration::from_millis(opts.stats_refresh_ms),
        );
        let varz = Arc::new(VarzStore::new(stats, started));
        varz.seed(
            &opts.metadata,
            SeedFields {
                identity: &identity,
                credentials: &credentials,
                host: &host,
                start: &start,
            },
        )
        .await?;

        // 5) Discovery subscription, then the one-shot announcement
        let publisher = AnnouncementPublisher::new(
            bus,
            Arc::new(AnnouncementTemplate {
                identity: identity.clone(),
                host: host.clone(),
                credentials: credentials.clone(),
                start,
                started,
            }),
        );
        let discover_task = publisher.listen().await?;
        if let Err(e) = publisher.announce().await {
            tracing::warn!(error = %e, "initial announcement failed");
        }

        // 6) Serve
        let state = MonitorState {
            varz: Arc::clone(&varz),
            healthz: Arc::new(RwLock::new(DEFAULT_HEALTHZ.to_string())),
            credentials: Arc::new(credentials),
        };
        let app = http::build_router(state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_task = tokio::spawn(async move {
            let graceful = async move {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(graceful).await {
                tracing::error!(error = %e, "monitoring server failed");
            }
        });

        tracing::info!(
            ty = %identity.component_type(),
            index = identity.index(),
            uuid = %identity.uuid(),
            %host,
            "component registered"
        );

        Ok(Component {
            identity,
            local_addr,
            state,
            publisher,
            discover_task,
            server_task,
            shutdown_tx: Some(shutdown_tx),
        })
    }
}

/// A registered process instance.
pub struct Component {
    identity: Identity,
    local_addr: SocketAddr,
    state: MonitorState,
    publisher: AnnouncementPublisher,
    discover_task: JoinHandle<()>,
    server_task: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Component {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// `ip:port` of the monitoring endpoint, as published in varz.
    pub fn host(&self) -> String {
        self.local_addr.to_string()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn credentials(&self) -> &Credentials {
        &self.state.credentials
    }

    pub fn varz(&self) -> &VarzStore {
        &self.state.varz
    }

    pub async fn set_varz(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.state.varz.set(key, value).await
    }

    pub async fn healthz(&self) -> String {
        self.state.healthz.read().await.clone()
    }

    pub async fn set_healthz(&self, healthz: impl Into<String>) {
        *self.state.healthz.write().await = healthz.into();
    }

    /// The payload sent on announce and in discovery replies.
    pub fn announcement(&self) -> Announcement {
        self.publisher.template().current()
    }

    /// Re-publish on the announce subject.
    pub async fn announce(&self) -> Result<()> {
        self.publisher.announce().await
    }

    /// Stop answering discovery and shut the monitoring server down.
    pub async fn shutdown(mut self) {
        self.discover_task.abort();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.server_task).await {
            tracing::warn!(error = %e, "monitoring server task ended abnormally");
        }
        tracing::info!(uuid = %self.identity.uuid(), "component shut down");
    }
}

impl Drop for Component {
    fn drop(&mut self) {
        self.discover_task.abort();
        self.server_task.abort();
    }
}

fn generate_credentials() -> Credentials {
    let user: [u8; 8] = rand::random();
    let password: [u8; 8] = rand::random();
    Credentials::new(hex::encode(user), hex::encode(password))
}
