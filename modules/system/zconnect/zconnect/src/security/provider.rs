use std::sync::Arc;

use tracing::{error, info, warn};
use zconnect_sdk::{
    AuthError, AuthenticatedSession, Authentication, ConnectorError, ConnectorKind,
    CredentialKind, LoginConnector, Principal, Role, UsernamePasswordCredentials,
};

use crate::config::{ConfigError, ConnectorsConfig};
use crate::connectors::{ZosmfConnector, ZssConnector};

/// Errors raised while building the provider at startup.
#[derive(Debug, thiserror::Error)]
pub enum ProviderInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to initialise {kind} connector: {source}")]
    Connector {
        kind: ConnectorKind,
        #[source]
        source: ConnectorError,
    },
}

/// Authenticates username/password credentials against the configured backend.
///
/// The backend is chosen once at construction; every successful login yields
/// a principal carrying the backend's session cookie and the `USER` role.
#[derive(Clone)]
pub struct AuthenticationProvider {
    connector: Arc<dyn LoginConnector>,
}

impl std::fmt::Debug for AuthenticationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationProvider")
            .field("connector", &self.connector.kind())
            .finish()
    }
}

impl AuthenticationProvider {
    /// Build the provider with the connector selected by `config`.
    ///
    /// # Errors
    /// Returns `ProviderInitError::Config` for an unrecognised connector
    /// selection and `ProviderInitError::Connector` if its transport cannot be built.
    pub fn from_config(config: &ConnectorsConfig) -> Result<Self, ProviderInitError> {
        let kind = config.connector_kind()?;
        let connector: Arc<dyn LoginConnector> = match kind {
            ConnectorKind::Zosmf => Arc::new(
                ZosmfConnector::new(&config.zosmf)
                    .map_err(|source| ProviderInitError::Connector { kind, source })?,
            ),
            ConnectorKind::Zss => Arc::new(
                ZssConnector::new(&config.zss)
                    .map_err(|source| ProviderInitError::Connector { kind, source })?,
            ),
        };
        info!(connector = %kind, "authentication provider ready");
        Ok(Self::with_connector(connector))
    }

    #[must_use]
    pub fn with_connector(connector: Arc<dyn LoginConnector>) -> Self {
        Self { connector }
    }

    #[must_use]
    pub fn kind(&self) -> ConnectorKind {
        self.connector.kind()
    }

    /// Connector used for logins; also the one to send authenticated requests through.
    #[must_use]
    pub fn connector(&self) -> &Arc<dyn LoginConnector> {
        &self.connector
    }

    /// Only username/password credentials are handled by this provider.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn supports(&self, kind: CredentialKind) -> bool {
        kind == CredentialKind::UsernamePassword
    }

    /// Authenticate `authentication` against the backend.
    ///
    /// Returns `Ok(None)` for an already authenticated session, without any
    /// backend call.
    ///
    /// # Errors
    /// Returns `AuthError::UnsupportedCredential` for credential kinds other
    /// than username/password and `AuthError::UserNotFound` for any login
    /// failure. The cause is logged here and kept as the error source.
    pub async fn authenticate(
        &self,
        authentication: &Authentication,
    ) -> Result<Option<AuthenticatedSession>, AuthError> {
        match authentication {
            Authentication::Authenticated(_) => Ok(None),
            Authentication::UsernamePassword(credentials) => {
                self.login(credentials).await.map(Some)
            }
            Authentication::BearerToken(_) | Authentication::Anonymous => {
                let kind = authentication.kind();
                warn!(credential = %kind, "credential kind not supported");
                Err(AuthError::UnsupportedCredential(kind))
            }
        }
    }

    async fn login(
        &self,
        credentials: &UsernamePasswordCredentials,
    ) -> Result<AuthenticatedSession, AuthError> {
        let username = credentials.username();
        let token = self
            .connector
            .login(username, credentials.password())
            .await
            .map_err(|source| {
                error!(
                    username,
                    connector = %self.connector.kind(),
                    error = %source,
                    "authentication failed"
                );
                AuthError::UserNotFound {
                    username: username.to_owned(),
                    source,
                }
            })?;

        info!(username, connector = %self.connector.kind(), "user authenticated");
        Ok(AuthenticatedSession::new(Principal::new(
            token,
            username,
            credentials.password().clone(),
            [Role::User],
        )))
    }
}
