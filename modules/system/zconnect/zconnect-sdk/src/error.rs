use std::io;

use http::StatusCode;
use thiserror::Error;

use crate::models::CredentialKind;

/// Errors raised by a connector while building URLs, sending requests, or logging in.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("URL construction error: {0}")]
    UrlConstruction(String),

    #[error("transport configuration error: {0}")]
    TransportConfig(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend answered the login call with something other than `200 OK`.
    #[error("login failed: status={status}")]
    LoginFailed { status: StatusCode, body: String },

    /// The backend accepted the login but did not hand out a session cookie.
    #[error("login failed: response carried no Set-Cookie header")]
    MissingSessionCookie,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for ConnectorError {
    fn from(err: url::ParseError) -> Self {
        ConnectorError::UrlConstruction(err.to_string())
    }
}

/// Errors surfaced by the authentication provider.
///
/// The user-facing message never carries backend detail; the failure that
/// caused the rejection stays reachable through [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user not found: {username}")]
    UserNotFound {
        username: String,
        #[source]
        source: ConnectorError,
    },

    #[error("unsupported credential kind: {0}")]
    UnsupportedCredential(CredentialKind),
}

/// Returned when a connector kind name is not one of the known backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown connector kind: \"{0}\"")]
pub struct UnknownConnectorKind(pub String);
