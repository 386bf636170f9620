//! rollcall component runner.
//!
//! Registers one component on an in-process bus and serves `/varz` and
//! `/healthz` until Ctrl-C.
//! - Config: `rollcall.yaml`, or the path given as first argument
//! - Log filter: `RUST_LOG`

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use rollcall_component::{bus::LocalBus, config, Registrar};
use rollcall_core::error::Result;

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.client_code().as_str(), "rollcall-component failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "rollcall.yaml".to_string());
    let cfg = config::load_from_file(&path)?;

    let bus = Arc::new(LocalBus::new());
    let component = Registrar::new().register(cfg.component, bus).await?;
    tracing::info!(
        host = %component.host(),
        user = %component.credentials().user(),
        "monitoring endpoint ready"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed; shutting down");
    }
    component.shutdown().await;
    Ok(())
}
