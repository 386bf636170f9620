//! HTTP Basic auth.
//!
//! - no `Authorization` header           -> 401 + challenge
//! - not `Basic base64(user:password)`   -> 400
//! - wrong user/password                 -> 401
//! - match                               -> next handler

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use rollcall_core::error::{Result, RollcallError};
use rollcall_core::protocol::Credentials;

use super::MonitorState;

const CHALLENGE: &str = "Basic realm=\"rollcall\"";

pub async fn require_basic(State(state): State<MonitorState>, req: Request, next: Next) -> Response {
    match check(req.headers(), &state.credentials) {
        Ok(()) => next.run(req).await,
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), error = %e, "monitoring request rejected");
            error_response(&e)
        }
    }
}

pub fn check(headers: &HeaderMap, expected: &Credentials) -> Result<()> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .ok_or(RollcallError::AuthRequired)?;
    let (user, password) = parse_basic(raw.as_bytes())?;
    if expected.matches(&user, &password) {
        Ok(())
    } else {
        tracing::warn!(%user, "monitoring credentials mismatch");
        Err(RollcallError::AuthFailed)
    }
}

/// Decode a `Basic <token>` header value into `(user, password)`.
pub fn parse_basic(raw: &[u8]) -> Result<(String, String)> {
    let malformed = |why: &str| RollcallError::MalformedRequest(format!("authorization: {why}"));

    let s = std::str::from_utf8(raw).map_err(|_| malformed("not utf-8"))?;
    let (scheme, token) = s
        .trim()
        .split_once(' ')
        .ok_or_else(|| malformed("expected `Basic <credentials>`"))?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(malformed("unsupported scheme"));
    }
    let decoded = STANDARD
        .decode(token.trim())
        .map_err(|_| malformed("invalid base64"))?;
    let pair = String::from_utf8(decoded).map_err(|_| malformed("credentials not utf-8"))?;
    let (user, password) = pair
        .split_once(':')
        .ok_or_else(|| malformed("missing `:` separator"))?;
    Ok((user.to_string(), password.to_string()))
}

/// Map an error onto its HTTP status; 401s carry the Basic challenge.
pub fn error_response(e: &RollcallError) -> Response {
    let code = e.client_code();
    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut res = (status, code.as_str()).into_response();
    if status == StatusCode::UNAUTHORIZED {
        res.headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
    }
    res
}
