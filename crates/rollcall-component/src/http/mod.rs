//! Monitoring HTTP endpoint.
//!
//! - `/varz`    : JSON snapshot of the varz store
//! - `/healthz` : the raw healthz string
//!
//! Both routes sit behind HTTP Basic auth against the registered credentials.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::sync::RwLock;

use rollcall_core::protocol::Credentials;

use crate::varz::VarzStore;

/// Shared state handed to both handlers and the auth layer.
#[derive(Clone)]
pub struct MonitorState {
    pub varz: Arc<VarzStore>,
    pub healthz: Arc<RwLock<String>>,
    pub credentials: Arc<Credentials>,
}

pub fn build_router(state: MonitorState) -> Router {
    Router::new()
        .route("/varz", get(handlers::varz))
        .route("/healthz", get(handlers::healthz))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_basic))
        .with_state(state)
}
