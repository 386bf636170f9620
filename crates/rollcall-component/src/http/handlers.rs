use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use rollcall_core::error::RollcallError;

use super::{auth::error_response, MonitorState};

pub async fn varz(State(state): State<MonitorState>) -> Response {
    let snapshot = state.varz.snapshot().await;
    match serde_json::to_vec(&snapshot) {
        Ok(body) => sized("application/json", body),
        Err(e) => error_response(&RollcallError::Internal(format!("varz encode failed: {e}"))),
    }
}

/// Raw bytes of the healthz string; never passes through JSON.
pub async fn healthz(State(state): State<MonitorState>) -> Response {
    let body = state.healthz.read().await.clone().into_bytes();
    sized("text/plain; charset=utf-8", body)
}

// Content-Length is the encoded byte count, not the character count.
fn sized(content_type: &'static str, body: Vec<u8>) -> Response {
    let len = HeaderValue::from(body.len());
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_LENGTH, len),
        ],
        body,
    )
        .into_response()
}
