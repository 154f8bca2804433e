//! z/OS connectors module
//!
//! Logs users in against a z/OS backend and forwards the resulting session
//! cookie on every later request made on their behalf. Two backends are
//! supported:
//!
//! - z/OSMF over HTTPS: Basic-auth `GET /zosmf/restjobs/jobs`, LTPA cookie
//! - ZSS over plain HTTP: JSON `POST /login`, session cookie
//!
//! # Example
//!
//! ```no_run
//! use zconnect::config::ConnectorsConfig;
//! use zconnect::security::AuthenticationProvider;
//! use zconnect_sdk::{Authentication, ConnectorRequest, SecretString};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConnectorsConfig::load(Some("zconnect.yaml".as_ref()))?;
//! let provider = AuthenticationProvider::from_config(&config)?;
//!
//! let credentials = Authentication::username_password("alice", SecretString::from("secret"));
//! if let Some(session) = provider.authenticate(&credentials).await? {
//!     let connector = provider.connector();
//!     let url = connector.full_url("restjobs/jobs")?;
//!     let response = connector
//!         .request(ConnectorRequest::get(url).build(), session.principal())
//!         .await?;
//!     println!("{}", response.text_lossy());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connectors;
pub mod security;
pub mod transport;

pub use config::{ConfigError, ConnectorsConfig, ZosmfConfig, ZssConfig};
pub use connectors::{ZosmfConnector, ZssConnector};
pub use security::{AuthenticationProvider, ProviderInitError};
