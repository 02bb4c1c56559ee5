//! Connection target: scheme, host, port, path and request extras.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{Error, Result};

/// Transport flavour selected by the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// `ws://`, plain TCP.
    Plain,
    /// `wss://`, TLS over TCP.
    Secure,
}

impl Scheme {
    /// Port used when none is given: 80 for `ws`, 443 for `wss`.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Scheme::Plain => 80,
            Scheme::Secure => 443,
        }
    }

    /// URL scheme string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scheme::Plain => "ws",
            Scheme::Secure => "wss",
        }
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ws" => Ok(Scheme::Plain),
            "wss" => Ok(Scheme::Secure),
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to connect and what to put in the upgrade request.
///
/// Extra headers keep their insertion order. An `Endpoint` is cloned into a
/// connection when the connection is created and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    path: String,
    subprotocol: Option<String>,
    headers: Vec<(String, String)>,
}

impl Endpoint {
    /// Target `host` on the scheme's default port with path `/`.
    #[must_use]
    pub fn new(scheme: Scheme, host: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
            port: None,
            path: "/".to_string(),
            subprotocol: None,
            headers: Vec::new(),
        }
    }

    /// Parse a `ws://` or `wss://` URL.
    ///
    /// The request target is the URL path followed by `?query` when present.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the URL does not parse or has no host
    /// - [`Error::UnsupportedScheme`] for any scheme other than `ws`/`wss`
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let scheme: Scheme = url.scheme().parse()?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidUrl(format!("missing host in {input}")))?;

        let mut path = url.path().to_string();
        if path.is_empty() {
            path.push('/');
        }
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self {
            scheme,
            host: host.to_string(),
            // `Url::port` is `None` when the port equals the scheme default.
            port: url.port(),
            path,
            subprotocol: None,
            headers: Vec::new(),
        })
    }

    /// Use an explicit port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the request target.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        if self.path.is_empty() {
            self.path.push('/');
        }
        self
    }

    /// Request a subprotocol via `Sec-WebSocket-Protocol`.
    #[must_use]
    pub fn with_subprotocol(mut self, protocol: impl Into<String>) -> Self {
        self.subprotocol = Some(protocol.into());
        self
    }

    /// Append an extra request header.
    ///
    /// Headers whose name collides (case-insensitively) with a standard
    /// upgrade header or an earlier extra header are dropped when the request
    /// is built.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host as it appears in the URL (IPv6 literals keep their brackets).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host suitable for a socket connect or TLS server name.
    pub fn connect_host(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.host)
    }

    /// Port to connect to, falling back to the scheme default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(self.scheme.default_port())
    }

    /// Port given explicitly, if any.
    pub fn explicit_port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn subprotocol(&self) -> Option<&str> {
        self.subprotocol.as_deref()
    }

    /// Extra request headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Value for the `Host` request header: the host, plus `:port` when a
    /// non-default port was given.
    #[must_use]
    pub fn host_header(&self) -> String {
        match self.port {
            Some(port) if port != self.scheme.default_port() => format!("{}:{}", self.host, port),
            _ => self.host.clone(),
        }
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Endpoint::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.host_header(), self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_default_port() {
        let ep = Endpoint::parse("ws://example.com/chat").unwrap();
        assert_eq!(ep.scheme(), Scheme::Plain);
        assert_eq!(ep.host(), "example.com");
        assert_eq!(ep.port(), 80);
        assert_eq!(ep.explicit_port(), None);
        assert_eq!(ep.path(), "/chat");
        assert_eq!(ep.host_header(), "example.com");
    }

    #[test]
    fn test_parse_secure_explicit_port() {
        let ep = Endpoint::parse("wss://example.com:8443/msg/MTAwMDAx").unwrap();
        assert_eq!(ep.scheme(), Scheme::Secure);
        assert_eq!(ep.port(), 8443);
        assert_eq!(ep.host_header(), "example.com:8443");
        assert_eq!(ep.path(), "/msg/MTAwMDAx");
    }

    #[test]
    fn test_parse_default_port_written_out() {
        let ep = Endpoint::parse("wss://example.com:443/").unwrap();
        assert_eq!(ep.port(), 443);
        assert_eq!(ep.host_header(), "example.com");
    }

    #[test]
    fn test_parse_empty_path_and_query() {
        let ep = Endpoint::parse("ws://localhost:10086").unwrap();
        assert_eq!(ep.path(), "/");

        let ep = Endpoint::parse("ws://localhost/feed?token=abc&v=2").unwrap();
        assert_eq!(ep.path(), "/feed?token=abc&v=2");
    }

    #[test]
    fn test_parse_unsupported_scheme() {
        let err = Endpoint::parse("http://example.com/").unwrap_err();
        assert_eq!(err, Error::UnsupportedScheme("http".to_string()));
    }

    #[test]
    fn test_parse_invalid_url() {
        assert!(matches!(
            Endpoint::parse("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_ipv6_host() {
        let ep = Endpoint::parse("ws://[::1]:9001/").unwrap();
        assert_eq!(ep.host(), "[::1]");
        assert_eq!(ep.connect_host(), "::1");
        assert_eq!(ep.host_header(), "[::1]:9001");
    }

    #[test]
    fn test_builder_keeps_header_order() {
        let ep = Endpoint::new(Scheme::Plain, "example.com")
            .with_port(8080)
            .with_path("/ws")
            .with_subprotocol("chat")
            .with_header("X-B", "2")
            .with_header("X-A", "1");
        assert_eq!(ep.subprotocol(), Some("chat"));
        assert_eq!(
            ep.headers(),
            &[
                ("X-B".to_string(), "2".to_string()),
                ("X-A".to_string(), "1".to_string())
            ]
        );
        assert_eq!(ep.to_string(), "ws://example.com:8080/ws");
    }

    #[test]
    fn test_from_str() {
        let ep: Endpoint = "ws://example.com/".parse().unwrap();
        assert_eq!(ep.host(), "example.com");
    }
}
