//! SDK for the z/OS connectors module.
//!
//! Defines the contract shared by the backend connectors (z/OSMF and ZSS) and
//! their consumers:
//!
//! - [`ZConnector`] / [`LoginConnector`] traits
//! - [`ConnectorRequest`] / [`ConnectorResponse`] wire types
//! - [`Principal`], [`SessionToken`] and [`AuthenticatedSession`] models
//! - [`ConnectorError`] / [`AuthError`] error taxonomy

pub mod api;
pub mod error;
pub mod models;
pub mod request;
pub mod response;

pub use api::{LoginConnector, ZConnector};
pub use error::{AuthError, ConnectorError, UnknownConnectorKind};
pub use models::{
    AuthenticatedSession, Authentication, ConnectorKind, CredentialKind, Principal, Role,
    SessionToken, UsernamePasswordCredentials,
};
pub use request::{ConnectorRequest, ConnectorRequestBuilder};
pub use response::ConnectorResponse;

// Re-export commonly used types from dependencies
pub use http::{Method, StatusCode};
pub use secrecy::{ExposeSecret, SecretString};
pub use url::Url;
