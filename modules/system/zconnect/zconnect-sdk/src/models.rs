use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::UnknownConnectorKind;

// ---------------------------------------------------------------------------
// Connector kind
// ---------------------------------------------------------------------------

/// The backend a connector talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    /// z/OS Management Facility REST services (HTTPS, Basic-auth login).
    Zosmf,
    /// Zowe System Services server (plain HTTP, JSON login).
    Zss,
}

impl ConnectorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorKind::Zosmf => "zosmf",
            ConnectorKind::Zss => "zss",
        }
    }

    /// Legacy selector semantics: exactly `"zss"` picks ZSS, every other value
    /// (including typos and the empty string) picks z/OSMF.
    #[must_use]
    pub fn from_legacy_name(name: &str) -> Self {
        if name == "zss" {
            ConnectorKind::Zss
        } else {
            ConnectorKind::Zosmf
        }
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorKind {
    type Err = UnknownConnectorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zosmf" => Ok(ConnectorKind::Zosmf),
            "zss" => Ok(ConnectorKind::Zss),
            _ => Err(UnknownConnectorKind(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Roles granted to an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    User,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
        }
    }

    /// Authority string in the `ROLE_` form expected by role-based filters.
    #[must_use]
    pub fn authority(self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Session token
// ---------------------------------------------------------------------------

/// Session cookie issued by a backend login, kept as its `name=value` pair.
///
/// The pair is what gets replayed verbatim in the `Cookie` header of every
/// subsequent request. Cookie attributes (`Path`, `Secure`, ...) are dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    cookie: String,
}

impl SessionToken {
    /// Wrap an already extracted `name=value` cookie pair.
    #[must_use]
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
        }
    }

    /// Extract the cookie pair from a `Set-Cookie` header value.
    ///
    /// Returns `None` when the value has no `name=value` pair in front.
    #[must_use]
    pub fn from_set_cookie(header: &str) -> Option<Self> {
        let pair = header.split(';').next()?.trim();
        let (name, _) = pair.split_once('=')?;
        if name.trim().is_empty() {
            return None;
        }
        Some(Self::new(pair))
    }

    /// Value to send in the `Cookie` request header.
    #[must_use]
    pub fn as_cookie_header(&self) -> &str {
        &self.cookie
    }

    /// Cookie name, e.g. `LtpaToken2`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.cookie
            .split_once('=')
            .map_or(self.cookie.as_str(), |(name, _)| name.trim())
    }

    /// Cookie value without the name.
    #[must_use]
    pub fn value(&self) -> &str {
        self.cookie
            .split_once('=')
            .map_or("", |(_, value)| value.trim())
    }
}

/// Intentionally does not display the cookie value.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({}=[REDACTED])", self.name())
    }
}

/// Intentionally does not display the cookie value.
impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=[REDACTED]", self.name())
    }
}

// ---------------------------------------------------------------------------
// Inbound credentials
// ---------------------------------------------------------------------------

/// Kind of credential handed to the authentication provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    UsernamePassword,
    BearerToken,
    Anonymous,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CredentialKind::UsernamePassword => "username_password",
            CredentialKind::BearerToken => "bearer_token",
            CredentialKind::Anonymous => "anonymous",
        })
    }
}

#[derive(Debug, Clone)]
pub struct UsernamePasswordCredentials {
    username: String,
    password: SecretString,
}

impl UsernamePasswordCredentials {
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

    #[must_use]
    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

/// Credential presented for authentication.
///
/// A session produced by an earlier successful authentication can be passed
/// back in; the provider treats it as already authenticated.
#[derive(Debug, Clone)]
pub enum Authentication {
    UsernamePassword(UsernamePasswordCredentials),
    Authenticated(AuthenticatedSession),
    BearerToken(SecretString),
    Anonymous,
}

impl Authentication {
    #[must_use]
    pub fn username_password(username: impl Into<String>, password: SecretString) -> Self {
        Authentication::UsernamePassword(UsernamePasswordCredentials::new(username, password))
    }

    /// An authenticated session is still a username/password authentication;
    /// it simply carries the resolved principal.
    #[must_use]
    pub fn kind(&self) -> CredentialKind {
        match self {
            Authentication::UsernamePassword(_) | Authentication::Authenticated(_) => {
                CredentialKind::UsernamePassword
            }
            Authentication::BearerToken(_) => CredentialKind::BearerToken,
            Authentication::Anonymous => CredentialKind::Anonymous,
        }
    }

    /// User name, if the credential carries one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Authentication::UsernamePassword(creds) => Some(creds.username()),
            Authentication::Authenticated(session) => Some(session.username()),
            Authentication::BearerToken(_) | Authentication::Anonymous => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Principal / authenticated session
// ---------------------------------------------------------------------------

/// Identity of an authenticated user together with the backend session cookie.
///
/// Built once per successful login and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Principal {
    token: SessionToken,
    username: String,
    password: SecretString,
    roles: BTreeSet<Role>,
}

impl Principal {
    #[must_use]
    pub fn new(
        token: SessionToken,
        username: impl Into<String>,
        password: SecretString,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            token,
            username: username.into(),
            password,
            roles: roles.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &SecretString {
        &self.password
    }

    #[must_use]
    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Result of a successful authentication; cheap to clone and share.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    principal: Arc<Principal>,
}

impl AuthenticatedSession {
    #[must_use]
    pub fn new(principal: Principal) -> Self {
        Self {
            principal: Arc::new(principal),
        }
    }

    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    #[must_use]
    pub fn token(&self) -> &SessionToken {
        self.principal.token()
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.principal.username()
    }

    pub fn authorities(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.principal.roles().iter().map(|role| role.authority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_from_set_cookie_drops_attributes() {
        let token =
            SessionToken::from_set_cookie("LtpaToken2=abc/def==; Path=/; Secure; HttpOnly").unwrap();
        assert_eq!(token.as_cookie_header(), "LtpaToken2=abc/def==");
        assert_eq!(token.name(), "LtpaToken2");
        assert_eq!(token.value(), "abc/def==");
    }

    #[test]
    fn test_session_token_from_set_cookie_plain_pair() {
        let token = SessionToken::from_set_cookie("SESSIONID=abc123").unwrap();
        assert_eq!(token.as_cookie_header(), "SESSIONID=abc123");
        assert_eq!(token.value(), "abc123");
    }

    #[test]
    fn test_session_token_rejects_values_without_pair() {
        assert!(SessionToken::from_set_cookie("").is_none());
        assert!(SessionToken::from_set_cookie("garbage").is_none());
        assert!(SessionToken::from_set_cookie("=value; Path=/").is_none());
    }

    #[test]
    #[allow(clippy::use_debug)]
    fn test_session_token_is_redacted() {
        let token = SessionToken::new("jwtToken=secret-value");
        assert_eq!(token.to_string(), "jwtToken=[REDACTED]");
        assert!(!format!("{token:?}").contains("secret-value"));
    }

    #[test]
    fn test_connector_kind_parse() {
        assert_eq!("zosmf".parse::<ConnectorKind>(), Ok(ConnectorKind::Zosmf));
        assert_eq!(" ZSS ".parse::<ConnectorKind>(), Ok(ConnectorKind::Zss));
        assert_eq!(
            "foo".parse::<ConnectorKind>(),
            Err(UnknownConnectorKind("foo".to_owned()))
        );
    }

    #[test]
    fn test_connector_kind_legacy_name_falls_back_to_zosmf() {
        assert_eq!(ConnectorKind::from_legacy_name("zss"), ConnectorKind::Zss);
        assert_eq!(ConnectorKind::from_legacy_name("zosmf"), ConnectorKind::Zosmf);
        assert_eq!(ConnectorKind::from_legacy_name("foo"), ConnectorKind::Zosmf);
        assert_eq!(ConnectorKind::from_legacy_name("ZSS"), ConnectorKind::Zosmf);
    }

    #[test]
    #[allow(clippy::use_debug)]
    fn test_principal_debug_hides_secrets() {
        let principal = Principal::new(
            SessionToken::new("LtpaToken2=top-secret"),
            "alice",
            SecretString::from("hunter2"),
            [Role::User],
        );
        let rendered = format!("{principal:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("top-secret"));
    }

    #[test]
    fn test_authenticated_session_authorities() {
        let session = AuthenticatedSession::new(Principal::new(
            SessionToken::new("SESSIONID=abc123"),
            "alice",
            SecretString::from("secret"),
            [Role::User, Role::User],
        ));
        assert_eq!(session.authorities().collect::<Vec<_>>(), vec!["ROLE_USER"]);
        assert!(session.principal().has_role(Role::User));
        let authentication = Authentication::Authenticated(session);
        assert_eq!(authentication.name(), Some("alice"));
        assert_eq!(authentication.kind(), CredentialKind::UsernamePassword);
    }

    #[test]
    fn test_authentication_kind_per_variant() {
        let password = Authentication::username_password("alice", SecretString::from("secret"));
        let bearer = Authentication::BearerToken(SecretString::from("eyJhbGciOi"));

        assert_eq!(password.kind(), CredentialKind::UsernamePassword);
        assert_eq!(bearer.kind(), CredentialKind::BearerToken);
        assert_eq!(Authentication::Anonymous.kind(), CredentialKind::Anonymous);
        assert_eq!(bearer.name(), None);
        assert_eq!(Authentication::Anonymous.name(), None);
    }
}
