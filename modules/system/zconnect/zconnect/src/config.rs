//! Connector configuration.
//!
//! Loaded once at startup from an optional YAML file, overridden by
//! `ZCONNECT_`-prefixed environment variables (`__` separates nesting levels,
//! e.g. `ZCONNECT_ZOSMF__HOST`).

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;
use tracing::warn;
use zconnect_sdk::ConnectorKind;

pub const ENV_PREFIX: &str = "ZCONNECT_";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Value of the `X-IBM-Response-Timeout` header sent to z/OSMF, in seconds.
pub const DEFAULT_ZOSMF_RESPONSE_TIMEOUT_SECS: u32 = 600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("unknown connector \"{0}\": expected \"zosmf\" or \"zss\"")]
    UnknownConnector(String),
}

/// Top-level configuration for the connectors module.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectorsConfig {
    /// Selected backend: `zosmf` or `zss`.
    pub connector: String,
    /// Accept any `connector` value, falling back to z/OSMF for anything but `zss`.
    pub lenient_connector_kind: bool,
    pub zosmf: ZosmfConfig,
    pub zss: ZssConfig,
}

impl Default for ConnectorsConfig {
    fn default() -> Self {
        Self {
            connector: ConnectorKind::Zosmf.as_str().to_owned(),
            lenient_connector_kind: false,
            zosmf: ZosmfConfig::default(),
            zss: ZssConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZosmfConfig {
    pub host: String,
    /// HTTPS port of the z/OSMF server.
    pub port: u16,
    /// Skip certificate and hostname verification. Insecure; for lab systems
    /// with self-signed certificates only.
    pub trust_all_certificates: bool,
    pub response_timeout_secs: u32,
    #[serde(deserialize_with = "duration_str::deserialize")]
    pub request_timeout: Duration,
    #[serde(deserialize_with = "duration_str::deserialize")]
    pub connect_timeout: Duration,
}

impl Default for ZosmfConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 443,
            trust_all_certificates: false,
            response_timeout_secs: DEFAULT_ZOSMF_RESPONSE_TIMEOUT_SECS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZssConfig {
    pub host: String,
    pub port: u16,
    #[serde(deserialize_with = "duration_str::deserialize")]
    pub request_timeout: Duration,
    #[serde(deserialize_with = "duration_str::deserialize")]
    pub connect_timeout: Duration,
}

impl Default for ZssConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 8542,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ConnectorsConfig {
    /// Load from `path` (if given) and the environment, and validate the
    /// connector selection.
    ///
    /// # Errors
    /// Returns `ConfigError::Load` if a source cannot be parsed and
    /// `ConfigError::UnknownConnector` if the selection is not recognised.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// # Errors
    /// Same as [`ConnectorsConfig::load`].
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.connector_kind()?;
        Ok(config)
    }

    /// Resolve the configured backend.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownConnector` for unrecognised values unless
    /// `lenient_connector_kind` is set.
    pub fn connector_kind(&self) -> Result<ConnectorKind, ConfigError> {
        if self.lenient_connector_kind {
            let kind = ConnectorKind::from_legacy_name(&self.connector);
            if kind.as_str() != self.connector {
                warn!(
                    configured = %self.connector,
                    selected = %kind,
                    "unrecognised connector value, falling back"
                );
            }
            return Ok(kind);
        }
        self.connector
            .parse()
            .map_err(|_| ConfigError::UnknownConnector(self.connector.clone()))
    }
}

/// Durations written as humantime strings, e.g. `"30s"` or `"1m 30s"`.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
