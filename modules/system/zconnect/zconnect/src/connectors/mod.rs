pub mod zosmf;
pub mod zss;

pub use zosmf::ZosmfConnector;
pub use zss::ZssConnector;

use http::header::SET_COOKIE;
use tracing::error;
use url::Url;
use zconnect_sdk::{ConnectorError, ConnectorResponse, SessionToken};

/// Build `{scheme}://{host}:{port}{path}[?query]`.
///
/// `path` must already carry its leading `/`. Characters that are legal in a
/// URI but not in a path or query are percent-encoded; control characters and
/// `.`/`..` segments (plain or percent-encoded) are rejected, so the result
/// never leaves the prefix the caller put in front of `path`.
pub(crate) fn build_url(
    scheme: &str,
    host: &str,
    port: u16,
    path: &str,
    query: Option<&str>,
) -> Result<Url, ConnectorError> {
    let result = try_build_url(scheme, host, port, path, query);
    if let Err(ref e) = result {
        error!(host, port, path, error = %e, "failed to build backend URL");
    }
    result
}

fn try_build_url(
    scheme: &str,
    host: &str,
    port: u16,
    path: &str,
    query: Option<&str>,
) -> Result<Url, ConnectorError> {
    if let Some(c) = path
        .chars()
        .chain(query.unwrap_or_default().chars())
        .find(char::is_ascii_control)
    {
        return Err(ConnectorError::UrlConstruction(format!(
            "illegal character U+{:04X} in path or query",
            u32::from(c)
        )));
    }

    // `\` counts as a separator in http(s) paths.
    if let Some(segment) = path.split(['/', '\\']).find(|s| is_dot_segment(s)) {
        return Err(ConnectorError::UrlConstruction(format!(
            "dot segment `{segment}` in path"
        )));
    }

    // Bare IPv6 literals need brackets in the authority.
    let authority = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    let mut url = Url::parse(&format!("{scheme}://{authority}"))?;
    url.set_path(path);
    url.set_query(query);
    Ok(url)
}

fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

/// Session cookie from the first `Set-Cookie` header of a login response.
pub(crate) fn session_token_from(
    response: &ConnectorResponse,
) -> Result<SessionToken, ConnectorError> {
    response
        .first_header(&SET_COOKIE)
        .and_then(SessionToken::from_set_cookie)
        .ok_or(ConnectorError::MissingSessionCookie)
}
