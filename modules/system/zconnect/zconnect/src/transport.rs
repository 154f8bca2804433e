//! HTTP transport shared by the connectors.
//!
//! Every `reqwest::Client` in this crate is built by [`TransportFactory`], so
//! the TLS trust policy, timeouts and Basic credentials are decided in one
//! place. A connector builds its transport once and reuses it for all calls.

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use http::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;
use zconnect_sdk::{ConnectorError, ConnectorRequest, ConnectorResponse};

// ---------------------------------------------------------------------------
// Basic credentials and preemptive auth cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BasicCredentials {
    username: String,
    password: SecretString,
}

impl BasicCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// `Authorization: Basic ...` value, marked sensitive.
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidHeader` if the encoded value is not a valid header.
    pub fn header_value(&self) -> Result<HeaderValue, ConnectorError> {
        let raw = format!("{}:{}", self.username, self.password.expose_secret());
        let mut value = HeaderValue::from_str(&format!("Basic {}", STANDARD.encode(raw)))
            .map_err(|e| ConnectorError::InvalidHeader(format!("authorization: {e}")))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Target a set of credentials applies to: scheme, host and port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthScope {
    scheme: String,
    host: String,
    port: u16,
}

impl AuthScope {
    #[must_use]
    pub fn new(scheme: &str, host: &str, port: u16) -> Self {
        Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            port,
        }
    }

    /// Scope of `url`; `None` for URLs without a host.
    #[must_use]
    pub fn of(url: &Url) -> Option<Self> {
        Some(Self::new(
            url.scheme(),
            url.host_str()?,
            url.port_or_known_default()?,
        ))
    }
}

/// Credentials sent with the first request to a matching scope, without
/// waiting for a `401` challenge.
#[derive(Debug, Clone, Default)]
pub struct PreemptiveAuthCache {
    entries: HashMap<AuthScope, BasicCredentials>,
}

impl PreemptiveAuthCache {
    pub fn insert(&mut self, scope: AuthScope, credentials: BasicCredentials) {
        self.entries.insert(scope, credentials);
    }

    #[must_use]
    pub fn for_url(&self, url: &Url) -> Option<&BasicCredentials> {
        self.entries.get(&AuthScope::of(url)?)
    }
}

// ---------------------------------------------------------------------------
// Transport factory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Sent preemptively on every request that has no `Authorization` header.
    pub credentials: Option<BasicCredentials>,
    /// Accept any server certificate and hostname.
    pub trust_all_certificates: bool,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            credentials: None,
            trust_all_certificates: false,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TransportOptions {
    #[must_use]
    pub fn with_credentials(mut self, credentials: BasicCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

pub struct TransportFactory;

impl TransportFactory {
    /// Build a transport for `options`.
    ///
    /// # Errors
    /// Returns `ConnectorError::TransportConfig` if the TLS backend or client
    /// cannot be initialised.
    pub fn build(options: &TransportOptions) -> Result<Transport, ConnectorError> {
        let mut builder = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(options.connect_timeout);

        if options.trust_all_certificates {
            builder = builder
                .tls_danger_accept_invalid_certs(true)
                .tls_danger_accept_invalid_hostnames(true);
        }

        let client = builder
            .build()
            .map_err(|e| ConnectorError::TransportConfig(e.to_string()))?;

        Ok(Transport {
            client,
            credentials: options.credentials.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A configured HTTP client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    credentials: Option<BasicCredentials>,
}

impl Transport {
    /// Send `request` and buffer the response.
    ///
    /// # Errors
    /// Returns a transport-level `ConnectorError` on connect, timeout or body failures.
    pub async fn send(&self, request: ConnectorRequest) -> Result<ConnectorResponse, ConnectorError> {
        self.send_inner(request, None).await
    }

    /// Like [`Transport::send`], attaching credentials from `auth` when the
    /// request URL falls into one of its scopes.
    ///
    /// # Errors
    /// Same as [`Transport::send`].
    pub async fn send_preemptive(
        &self,
        request: ConnectorRequest,
        auth: &PreemptiveAuthCache,
    ) -> Result<ConnectorResponse, ConnectorError> {
        self.send_inner(request, Some(auth)).await
    }

    async fn send_inner(
        &self,
        request: ConnectorRequest,
        auth: Option<&PreemptiveAuthCache>,
    ) -> Result<ConnectorResponse, ConnectorError> {
        let (method, url, mut headers, body, timeout) = request.into_parts();
        self.authorize(&url, &mut headers, auth)?;

        debug!(method = %method, path = url.path(), "sending backend request");

        let mut req_builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            req_builder = req_builder.body(body);
        }
        if let Some(timeout) = timeout {
            req_builder = req_builder.timeout(timeout);
        }

        let resp = req_builder.send().await.map_err(map_reqwest_error)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(map_reqwest_error)?;

        debug!(status = %status, bytes = body.len(), "backend response received");
        Ok(ConnectorResponse::new(status, headers, body))
    }

    fn authorize(
        &self,
        url: &Url,
        headers: &mut HeaderMap,
        auth: Option<&PreemptiveAuthCache>,
    ) -> Result<(), ConnectorError> {
        if headers.contains_key(AUTHORIZATION) {
            return Ok(());
        }
        let credentials = auth
            .and_then(|cache| cache.for_url(url))
            .or(self.credentials.as_ref());
        if let Some(credentials) = credentials {
            headers.insert(AUTHORIZATION, credentials.header_value()?);
        }
        Ok(())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ConnectorError {
    if err.is_timeout() {
        ConnectorError::Timeout(err.to_string())
    } else if err.is_connect() {
        ConnectorError::Connection(err.to_string())
    } else if err.is_builder() {
        ConnectorError::TransportConfig(err.to_string())
    } else if err.is_body() || err.is_decode() {
        ConnectorError::Io(std::io::Error::other(err))
    } else {
        ConnectorError::Transport(err.to_string())
    }
}
