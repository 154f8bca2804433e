use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use url::Url;

use crate::error::ConnectorError;

/// Outbound request addressed to an absolute backend URL.
///
/// Connectors build the URL with `full_url`, add their own session headers,
/// and send it through their transport.
#[derive(Debug, Clone)]
pub struct ConnectorRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl ConnectorRequest {
    /// Create a new request builder
    #[must_use]
    pub fn builder(method: Method, url: Url) -> ConnectorRequestBuilder {
        ConnectorRequestBuilder {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn get(url: Url) -> ConnectorRequestBuilder {
        Self::builder(Method::GET, url)
    }

    #[must_use]
    pub fn post(url: Url) -> ConnectorRequestBuilder {
        Self::builder(Method::POST, url)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set a header, replacing any existing value under the same name.
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidHeader` if `value` is not a legal header value.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<(), ConnectorError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConnectorError::InvalidHeader(format!("{name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(())
    }

    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Split the request into its parts for a transport to consume.
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, HeaderMap, Option<Bytes>, Option<Duration>) {
        (self.method, self.url, self.headers, self.body, self.timeout)
    }
}

/// Builder for [`ConnectorRequest`]
#[derive(Debug)]
pub struct ConnectorRequestBuilder {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl ConnectorRequestBuilder {
    /// Add a header
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidHeader` if the name or value is invalid.
    pub fn header<K, V>(mut self, key: K, value: V) -> Result<Self, ConnectorError>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
        K::Error: std::fmt::Display,
        V::Error: std::fmt::Display,
    {
        let key = key
            .try_into()
            .map_err(|e| ConnectorError::InvalidHeader(format!("Invalid header name: {e}")))?;
        let value = value
            .try_into()
            .map_err(|e| ConnectorError::InvalidHeader(format!("Invalid header value: {e}")))?;
        self.headers.insert(key, value);
        Ok(self)
    }

    /// Set the body to a JSON-serialized value and add Content-Type header
    ///
    /// # Errors
    /// Returns `ConnectorError::Serialization` if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, ConnectorError> {
        self.body = Some(Bytes::from(serde_json::to_vec(value)?));
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Per-request timeout; overrides the transport default.
    #[must_use]
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    #[must_use]
    pub fn build(self) -> ConnectorRequest {
        ConnectorRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url() -> Url {
        Url::parse("http://zss.example:8542/login").unwrap()
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let request = ConnectorRequest::post(url())
            .json(&json!({"username": "alice", "password": "secret"}))
            .unwrap()
            .build();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body: serde_json::Value = serde_json::from_slice(request.body().unwrap()).unwrap();
        assert_eq!(body["username"], "alice");
    }

    #[test]
    fn test_set_header_replaces_existing_value() {
        let mut request = ConnectorRequest::get(url())
            .header("Cookie", "old=1")
            .unwrap()
            .build();
        request
            .set_header(http::header::COOKIE, "SESSIONID=abc123")
            .unwrap();

        let values: Vec<_> = request.headers().get_all(http::header::COOKIE).iter().collect();
        assert_eq!(values, vec!["SESSIONID=abc123"]);
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let mut request = ConnectorRequest::get(url()).build();
        let err = request
            .set_header(http::header::COOKIE, "bad\nvalue")
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidHeader(_)));
    }

    #[test]
    fn test_defaults() {
        let request = ConnectorRequest::get(url()).build();
        assert_eq!(request.method(), Method::GET);
        assert!(request.body().is_none());
        assert!(request.timeout().is_none());
    }
}
