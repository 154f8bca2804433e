use secrecy::SecretString;
use url::Url;

use crate::error::ConnectorError;
use crate::models::{ConnectorKind, Principal, SessionToken};
use crate::request::ConnectorRequest;
use crate::response::ConnectorResponse;

// ---------------------------------------------------------------------------
// Connector trait
// ---------------------------------------------------------------------------

/// Access to one backend HTTP API on behalf of an authenticated principal.
#[async_trait::async_trait]
pub trait ZConnector: Send + Sync {
    /// Absolute URL for `relative_path` on this backend.
    ///
    /// # Errors
    /// Returns `ConnectorError::UrlConstruction` if the path cannot form a valid URI.
    fn full_url(&self, relative_path: &str) -> Result<Url, ConnectorError> {
        self.full_url_with_query(relative_path, None)
    }

    /// Absolute URL for `relative_path` with an optional raw query string.
    ///
    /// # Errors
    /// Returns `ConnectorError::UrlConstruction` if the path or query cannot form a valid URI.
    fn full_url_with_query(
        &self,
        relative_path: &str,
        query: Option<&str>,
    ) -> Result<Url, ConnectorError>;

    /// Send `request` with the principal's session credentials attached.
    ///
    /// # Errors
    /// Returns a transport-level `ConnectorError` if the request could not be
    /// sent or the response could not be read. Non-2xx statuses are returned
    /// as responses, not errors.
    async fn request(
        &self,
        request: ConnectorRequest,
        principal: &Principal,
    ) -> Result<ConnectorResponse, ConnectorError>;
}

// ---------------------------------------------------------------------------
// Login trait
// ---------------------------------------------------------------------------

/// A connector that can exchange username/password for a backend session cookie.
#[async_trait::async_trait]
pub trait LoginConnector: ZConnector {
    fn kind(&self) -> ConnectorKind;

    /// Log in against the backend and return its session cookie.
    ///
    /// # Errors
    /// Returns `ConnectorError::LoginFailed` when the backend rejects the
    /// credentials, `ConnectorError::MissingSessionCookie` when it accepts them
    /// without issuing a cookie, or a transport-level error.
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionToken, ConnectorError>;
}
