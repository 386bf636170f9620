//! Shared error type across rollcall crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Registration input rejected.
    Validation,
    /// Configuration missing or unparseable.
    Config,
    /// Unsupported config version.
    UnsupportedVersion,
    /// No credentials presented.
    AuthRequired,
    /// Credentials presented but wrong.
    AuthFailed,
    /// Malformed request (e.g. unparseable auth header).
    BadRequest,
    /// Bus subscription or listener bind failed.
    TransportSetup,
    /// Internal error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::Validation => "VALIDATION",
            ClientCode::Config => "CONFIG",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::AuthRequired => "AUTH_REQUIRED",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::TransportSetup => "TRANSPORT_SETUP",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// HTTP status this code maps to at the monitoring boundary.
    pub fn http_status(self) -> u16 {
        match self {
            ClientCode::Validation
            | ClientCode::Config
            | ClientCode::UnsupportedVersion
            | ClientCode::BadRequest => 400,
            ClientCode::AuthRequired | ClientCode::AuthFailed => 401,
            ClientCode::TransportSetup | ClientCode::Internal => 500,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RollcallError>;

/// Unified error type used by core and component.
#[derive(Debug, Error)]
pub enum RollcallError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("authentication required")]
    AuthRequired,
    #[error("auth failed")]
    AuthFailed,
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("transport setup failed: {0}")]
    TransportSetup(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RollcallError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            RollcallError::Validation(_) => ClientCode::Validation,
            RollcallError::Config(_) => ClientCode::Config,
            RollcallError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            RollcallError::AuthRequired => ClientCode::AuthRequired,
            RollcallError::AuthFailed => ClientCode::AuthFailed,
            RollcallError::MalformedRequest(_) => ClientCode::BadRequest,
            RollcallError::TransportSetup(_) => ClientCode::TransportSetup,
            RollcallError::Internal(_) => ClientCode::Internal,
        }
    }
}
