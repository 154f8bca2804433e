use http::StatusCode;
use http::header::COOKIE;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use url::Url;
use zconnect_sdk::{
    ConnectorError, ConnectorKind, ConnectorRequest, ConnectorResponse, LoginConnector, Principal,
    SessionToken, ZConnector,
};

use super::{build_url, session_token_from};
use crate::config::ZssConfig;
use crate::transport::{Transport, TransportFactory, TransportOptions};

const LOGIN_PATH: &str = "login";

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

/// Connector for the Zowe System Services server. ZSS speaks plain HTTP only.
#[derive(Debug)]
pub struct ZssConnector {
    host: String,
    port: u16,
    transport: Transport,
}

impl ZssConnector {
    /// # Errors
    /// Returns `ConnectorError::TransportConfig` if the HTTP client cannot be built.
    pub fn new(config: &ZssConfig) -> Result<Self, ConnectorError> {
        let transport = TransportFactory::build(&TransportOptions {
            credentials: None,
            trust_all_certificates: false,
            request_timeout: config.request_timeout,
            connect_timeout: config.connect_timeout,
        })?;
        info!(host = %config.host, port = config.port, "ZSS connector configured");

        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            transport,
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

#[async_trait::async_trait]
impl ZConnector for ZssConnector {
    fn full_url_with_query(
        &self,
        relative_path: &str,
        query: Option<&str>,
    ) -> Result<Url, ConnectorError> {
        build_url(
            "http",
            &self.host,
            self.port,
            &format!("/{relative_path}"),
            query,
        )
    }

    async fn request(
        &self,
        mut request: ConnectorRequest,
        principal: &Principal,
    ) -> Result<ConnectorResponse, ConnectorError> {
        request.set_header(COOKIE, principal.token().as_cookie_header())?;
        self.transport.send(request).await.inspect_err(|e| {
            error!(username = principal.username(), error = %e, "ZSS request failed");
        })
    }
}

#[async_trait::async_trait]
impl LoginConnector for ZssConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Zss
    }

    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionToken, ConnectorError> {
        let url = self.full_url(LOGIN_PATH)?;
        let request = ConnectorRequest::post(url)
            .json(&LoginBody {
                username,
                password: password.expose_secret(),
            })?
            .build();

        let response = self
            .transport
            .send(request)
            .await
            .inspect_err(|e| error!(username, error = %e, "ZSS login request failed"))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text_lossy();
            warn!(username, status = %status, body = %body, "ZSS login rejected");
            return Err(ConnectorError::LoginFailed { status, body });
        }

        let token = session_token_from(&response)?;
        debug!(username, cookie = token.name(), "ZSS session established");
        Ok(token)
    }
}
