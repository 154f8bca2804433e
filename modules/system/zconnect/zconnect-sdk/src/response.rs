use bytes::Bytes;
use http::{HeaderMap, HeaderName, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ConnectorError;

/// Fully buffered backend response.
#[derive(Debug, Clone)]
pub struct ConnectorResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ConnectorResponse {
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Get the HTTP status code
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the response headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name`, if present and valid UTF-8.
    #[must_use]
    pub fn first_header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Body as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON
    ///
    /// # Errors
    /// Returns `ConnectorError::Serialization` if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ConnectorError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
