use http::StatusCode;
use http::header::{COOKIE, HeaderName, HeaderValue};
use secrecy::SecretString;
use tracing::{debug, error, info, warn};
use url::Url;
use zconnect_sdk::{
    ConnectorError, ConnectorKind, ConnectorRequest, ConnectorResponse, LoginConnector, Principal,
    SessionToken, ZConnector,
};

use super::{build_url, session_token_from};
use crate::config::ZosmfConfig;
use crate::transport::{
    AuthScope, BasicCredentials, PreemptiveAuthCache, Transport, TransportFactory,
    TransportOptions,
};

/// Anti-CSRF header required by z/OSMF on every REST call.
pub const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-zosmf-header");
/// Server-side processing timeout, in seconds.
pub const RESPONSE_TIMEOUT_HEADER: HeaderName = HeaderName::from_static("x-ibm-response-timeout");

const CONTEXT_ROOT: &str = "/zosmf/";
/// Cheap authenticated endpoint used to obtain the LTPA cookie.
const LOGIN_PATH: &str = "restjobs/jobs";

/// Connector for the z/OSMF REST services, reached over HTTPS.
pub struct ZosmfConnector {
    scheme: &'static str,
    host: String,
    port: u16,
    response_timeout: HeaderValue,
    transport_options: TransportOptions,
    transport: Transport,
}

impl std::fmt::Debug for ZosmfConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZosmfConnector")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("response_timeout", &self.response_timeout)
            .field("transport_options", &self.transport_options)
            .finish_non_exhaustive()
    }
}

impl ZosmfConnector {
    /// Create the connector and its shared transport.
    ///
    /// # Errors
    /// Returns `ConnectorError::TransportConfig` if the HTTPS client cannot be built.
    pub fn new(config: &ZosmfConfig) -> Result<Self, ConnectorError> {
        let transport_options = TransportOptions {
            credentials: None,
            trust_all_certificates: config.trust_all_certificates,
            request_timeout: config.request_timeout,
            connect_timeout: config.connect_timeout,
        };
        let transport = TransportFactory::build(&transport_options)?;
        if config.trust_all_certificates {
            warn!(
                host = %config.host,
                port = config.port,
                "z/OSMF connector accepts any TLS certificate"
            );
        }
        info!(host = %config.host, port = config.port, "z/OSMF connector configured");

        Ok(Self {
            scheme: "https",
            host: config.host.clone(),
            port: config.port,
            response_timeout: HeaderValue::from(config.response_timeout_secs),
            transport_options,
            transport,
        })
    }

    /// Point the connector at a plain-HTTP test double.
    #[cfg(test)]
    pub(crate) fn over_plain_http(mut self) -> Self {
        self.scheme = "http";
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Transport that sends Basic credentials for `username` on every request,
    /// with this connector's TLS trust policy.
    ///
    /// # Errors
    /// Returns `ConnectorError::TransportConfig` if the client cannot be built.
    pub fn client_with_password(
        &self,
        username: &str,
        password: SecretString,
    ) -> Result<Transport, ConnectorError> {
        TransportFactory::build(
            &self
                .transport_options
                .clone()
                .with_credentials(BasicCredentials::new(username, password)),
        )
    }

    /// Anonymous transport with this connector's TLS trust policy.
    ///
    /// # Errors
    /// Returns `ConnectorError::TransportConfig` if the client cannot be built.
    pub fn anonymous_client(&self) -> Result<Transport, ConnectorError> {
        TransportFactory::build(&self.transport_options)
    }
}

#[async_trait::async_trait]
impl ZConnector for ZosmfConnector {
    fn full_url_with_query(
        &self,
        relative_path: &str,
        query: Option<&str>,
    ) -> Result<Url, ConnectorError> {
        build_url(
            self.scheme,
            &self.host,
            self.port,
            &format!("{CONTEXT_ROOT}{relative_path}"),
            query,
        )
    }

    async fn request(
        &self,
        mut request: ConnectorRequest,
        principal: &Principal,
    ) -> Result<ConnectorResponse, ConnectorError> {
        request.set_header(COOKIE, principal.token().as_cookie_header())?;
        let headers = request.headers_mut();
        headers.insert(CSRF_HEADER, HeaderValue::from_static(""));
        headers.insert(RESPONSE_TIMEOUT_HEADER, self.response_timeout.clone());

        self.transport.send(request).await.inspect_err(|e| {
            error!(username = principal.username(), error = %e, "z/OSMF request failed");
        })
    }
}

#[async_trait::async_trait]
impl LoginConnector for ZosmfConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Zosmf
    }

    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionToken, ConnectorError> {
        let target = self.full_url(LOGIN_PATH)?;
        let scope = AuthScope::of(&target).ok_or_else(|| {
            ConnectorError::UrlConstruction(format!("login URL has no host: {target}"))
        })?;
        let mut auth_cache = PreemptiveAuthCache::default();
        auth_cache.insert(scope, BasicCredentials::new(username, password.clone()));

        let request = ConnectorRequest::get(target).header(CSRF_HEADER, "")?.build();
        let response = self
            .transport
            .send_preemptive(request, &auth_cache)
            .await
            .inspect_err(|e| error!(username, error = %e, "z/OSMF login request failed"))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(username, status = %status, "z/OSMF login rejected");
            return Err(ConnectorError::LoginFailed {
                status,
                body: response.text_lossy(),
            });
        }

        let token = session_token_from(&response)?;
        debug!(username, cookie = token.name(), "z/OSMF session established");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use std::sync::Once;

    use super::*;
    use httpmock::prelude::*;
    use tracing_test::traced_test;

    /// The mock server's TLS stack needs a process-wide rustls provider.
    fn install_crypto_provider() {
        static INSTALL: Once = Once::new();
        INSTALL.call_once(|| {
            rustls::crypto::aws_lc_rs::default_provider()
                .install_default()
                .unwrap();
        });
    }

    /// HTTPS connector for `server`, whose certificate is signed by a private CA.
    fn https_connector_for(server: &MockServer, trust_all_certificates: bool) -> ZosmfConnector {
        ZosmfConnector::new(&ZosmfConfig {
            trust_all_certificates,
            ..config(&server.host(), server.port())
        })
        .unwrap()
    }

    fn config(host: &str, port: u16) -> ZosmfConfig {
        ZosmfConfig {
            host: host.to_owned(),
            port,
            trust_all_certificates: true,
            request_timeout: Duration::from_secs(5),
            ..ZosmfConfig::default()
        }
    }

    fn connector_for(server: &MockServer) -> ZosmfConnector {
        ZosmfConnector::new(&config(&server.host(), server.port()))
            .unwrap()
            .over_plain_http()
    }

    fn principal(cookie: &str) -> Principal {
        Principal::new(
            SessionToken::new(cookie),
            "alice",
            SecretString::from("secret"),
            [zconnect_sdk::Role::User],
        )
    }

    #[test]
    fn test_full_url_prefixes_zosmf() {
        let connector = ZosmfConnector::new(&config("mf.example.com", 10443)).unwrap();

        let url = connector.full_url("restjobs/jobs").unwrap();
        assert_eq!(url.as_str(), "https://mf.example.com:10443/zosmf/restjobs/jobs");

        let url = connector
            .full_url_with_query("restfiles/ds", Some("dslevel=ALICE.*"))
            .unwrap();
        assert_eq!(url.path(), "/zosmf/restfiles/ds");
        assert_eq!(url.query(), Some("dslevel=ALICE.*"));
    }

    #[test]
    fn test_full_url_rejects_control_characters() {
        let connector = ZosmfConnector::new(&config("mf.example.com", 443)).unwrap();
        assert!(matches!(
            connector.full_url("restjobs/\njobs"),
            Err(ConnectorError::UrlConstruction(_))
        ));
    }

    #[test]
    fn test_full_url_cannot_escape_context_root() {
        let connector = ZosmfConnector::new(&config("mf.example.com", 443)).unwrap();
        for path in ["../restjobs/jobs", "%2e%2e/info", "restfiles/../../admin"] {
            assert!(
                matches!(
                    connector.full_url(path),
                    Err(ConnectorError::UrlConstruction(_))
                ),
                "{path}"
            );
        }
        let url = connector.full_url("restfiles/ds/ALICE.JCL").unwrap();
        assert!(url.path().starts_with("/zosmf/"));
    }

    #[test]
    fn test_kind() {
        let connector = ZosmfConnector::new(&config("mf.example.com", 443)).unwrap();
        assert_eq!(connector.kind(), ConnectorKind::Zosmf);
    }

    #[tokio::test]
    async fn test_login_sends_preemptive_basic_auth() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/zosmf/restjobs/jobs")
                .header("Authorization", "Basic YWxpY2U6c2VjcmV0")
                .header_exists("X-CSRF-ZOSMF-HEADER");
            then.status(200)
                .header("Set-Cookie", "LtpaToken2=ltpa-value; Path=/; Secure; HttpOnly")
                .json_body(serde_json::json!([]));
        });

        let token = connector_for(&server)
            .login("alice", &SecretString::from("secret"))
            .await
            .unwrap();

        assert_eq!(token.as_cookie_header(), "LtpaToken2=ltpa-value");
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn test_login_unauthorized_fails() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/zosmf/restjobs/jobs");
            then.status(401).body("unauthorized");
        });

        let err = connector_for(&server)
            .login("alice", &SecretString::from("wrong"))
            .await
            .unwrap_err();

        assert!(
            matches!(err, ConnectorError::LoginFailed { status, .. } if status == StatusCode::UNAUTHORIZED)
        );
        mock.assert();
    }

    #[tokio::test]
    async fn test_login_without_cookie_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/zosmf/restjobs/jobs");
            then.status(200);
        });

        let err = connector_for(&server)
            .login("alice", &SecretString::from("secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::MissingSessionCookie));
    }

    #[tokio::test]
    async fn test_request_sets_session_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/zosmf/restfiles/ds")
                .query_param("dslevel", "ALICE")
                .header("Cookie", "LtpaToken2=ltpa-value")
                .header_exists("X-CSRF-ZOSMF-HEADER")
                .header("X-IBM-Response-Timeout", "600")
                .header_missing("Authorization");
            then.status(200).json_body(serde_json::json!({"items": []}));
        });

        let connector = connector_for(&server);
        let principal = principal("LtpaToken2=ltpa-value");

        for _ in 0..2 {
            let url = connector
                .full_url_with_query("restfiles/ds", Some("dslevel=ALICE"))
                .unwrap();
            let response = connector
                .request(ConnectorRequest::get(url).build(), &principal)
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        mock.assert_calls(2);
    }

    #[tokio::test]
    async fn test_request_connection_refused() {
        let connector = ZosmfConnector::new(&config("127.0.0.1", 1))
            .unwrap()
            .over_plain_http();
        let url = connector.full_url("info").unwrap();

        let err = connector
            .request(ConnectorRequest::get(url).build(), &principal("LtpaToken2=x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Connection(_)));
    }

    #[tokio::test]
    async fn test_login_over_tls_with_trust_all_accepts_untrusted_certificate() {
        install_crypto_provider();
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/zosmf/restjobs/jobs")
                .header("Authorization", "Basic YWxpY2U6c2VjcmV0");
            then.status(200)
                .header("Set-Cookie", "LtpaToken2=tls-session; Path=/; Secure");
        });

        let connector = https_connector_for(&server, true);
        assert_eq!(connector.full_url("info").unwrap().scheme(), "https");

        let token = connector
            .login("alice", &SecretString::from("secret"))
            .await
            .unwrap();

        assert_eq!(token.as_cookie_header(), "LtpaToken2=tls-session");
        mock.assert();
    }

    #[tokio::test]
    async fn test_login_over_tls_without_trust_all_rejects_untrusted_certificate() {
        install_crypto_provider();
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/zosmf/restjobs/jobs");
            then.status(200).header("Set-Cookie", "LtpaToken2=tls-session");
        });

        let err = https_connector_for(&server, false)
            .login("alice", &SecretString::from("secret"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConnectorError::Connection(_) | ConnectorError::Transport(_)
        ));
        mock.assert_calls(0);
    }

    #[test]
    #[traced_test]
    fn test_trust_all_warned_once_per_connector() {
        ZosmfConnector::new(&config("mf.example.com", 443)).unwrap();

        logs_assert(|lines: &[&str]| {
            let warnings: Vec<_> = lines.iter().filter(|line| line.contains("WARN")).collect();
            match warnings.as_slice() {
                [only] if only.contains("accepts any TLS certificate") => Ok(()),
                other => Err(format!("expected one trust-all warning, got {}", other.len())),
            }
        });
    }

    #[test]
    fn test_client_factories_share_trust_policy() {
        let connector = ZosmfConnector::new(&config("mf.example.com", 443)).unwrap();
        assert!(connector.anonymous_client().is_ok());
        assert!(
            connector
                .client_with_password("alice", SecretString::from("secret"))
                .is_ok()
        );
    }
}
