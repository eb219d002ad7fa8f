//! Message address parsing and scheme classification.
//!
//! # Responsibilities
//! - Classify the scheme of a message address (`http`, `https`, `post`,
//!   `full`, `fulls`)
//! - Extract host, port and request path from the authority
//! - Supply per-scheme default ports when the address omits one
//!
//! # Design Decisions
//! - The scheme set is closed; anything else is rejected up front
//! - `full`/`fulls` mark an address whose message data is already a
//!   serialized request, so parsing them is legal but building over them
//!   is not (the builder enforces that)
//! - Authority/path splitting delegates to the `url` crate; empty paths
//!   normalize to `/` and the query string stays attached to the path

use thiserror::Error;
use url::Url;

/// Errors produced while parsing a message address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The scheme is not one the engine knows how to handle.
    #[error("unrecognized scheme in address: {0}")]
    UnrecognizedScheme(String),

    /// The address is not a well-formed `scheme://host[:port][/path]`.
    #[error("invalid address: {0}")]
    Invalid(String),
}

/// The closed set of address schemes the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain HTTP request to build and send.
    Http,
    /// HTTP over an externally terminated TLS session.
    Https,
    /// Plain HTTP, but the request must be a POST.
    Post,
    /// The message data already holds a complete plain-HTTP request.
    Full,
    /// The message data already holds a complete request for a TLS session.
    Fulls,
}

impl Scheme {
    /// Parse a scheme token. The set is closed.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        match s {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            "post" => Ok(Scheme::Post),
            "full" => Ok(Scheme::Full),
            "fulls" => Ok(Scheme::Fulls),
            other => Err(AddressError::UnrecognizedScheme(other.to_string())),
        }
    }

    /// The scheme token as it appears in an address.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Post => "post",
            Scheme::Full => "full",
            Scheme::Fulls => "fulls",
        }
    }

    /// Port assumed when the authority does not carry one.
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Https | Scheme::Fulls => 443,
            Scheme::Http | Scheme::Post | Scheme::Full => 80,
        }
    }

    /// Whether messages under this scheme travel over a TLS session.
    pub fn is_secure(&self) -> bool {
        matches!(self, Scheme::Https | Scheme::Fulls)
    }

    /// The scheme an address is rewritten to once its request is built.
    pub fn built_scheme(&self) -> Scheme {
        if self.is_secure() {
            Scheme::Fulls
        } else {
            Scheme::Full
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decomposed message address.
///
/// `path` is the origin-form request target: the path with the query
/// string still attached (`/ntables`, `/search?text=x`). An address with
/// no path yields `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Address {
    /// Parse `scheme://host[:port][/path][?query]`.
    pub fn parse(addr: &str) -> Result<Self, AddressError> {
        let url = Url::parse(addr).map_err(|e| AddressError::Invalid(format!("{}: {}", addr, e)))?;

        let scheme = Scheme::parse(url.scheme())?;

        let host = url
            .host_str()
            .ok_or_else(|| AddressError::Invalid(format!("{}: missing host", addr)))?
            .to_string();
        let port = url.port().unwrap_or_else(|| scheme.default_port());

        let mut path = url.path().to_string();
        if path.is_empty() {
            path.push('/');
        }
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Address {
            scheme,
            host,
            port,
            path,
        })
    }

    /// The `host:port` form used for the Host header and for binding.
    ///
    /// IPv6 hosts come back bracketed from the parser, so the result is
    /// always valid authority syntax.
    pub fn authority(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_address() {
        let addr = Address::parse("http://localhost:3380/ntables").unwrap();
        assert_eq!(addr.scheme, Scheme::Http);
        assert_eq!(addr.host, "localhost");
        assert_eq!(addr.port, 3380);
        assert_eq!(addr.path, "/ntables");
        assert_eq!(addr.authority(), "localhost:3380");
    }

    #[test]
    fn test_parse_post_scheme() {
        let addr = Address::parse("post://localhost:3380/ntables").unwrap();
        assert_eq!(addr.scheme, Scheme::Post);
        assert_eq!(addr.port, 3380);
    }

    #[test]
    fn test_default_ports() {
        let addr = Address::parse("http://localhost/x").unwrap();
        assert_eq!(addr.port, 80);

        let addr = Address::parse("https://localhost/x").unwrap();
        assert_eq!(addr.port, 443);
    }

    #[test]
    fn test_empty_path_normalizes_to_slash() {
        let addr = Address::parse("http://localhost:3380").unwrap();
        assert_eq!(addr.path, "/");
    }

    #[test]
    fn test_query_stays_attached_to_path() {
        let addr = Address::parse("http://localhost:3380/search?text=x&lr=213").unwrap();
        assert_eq!(addr.path, "/search?text=x&lr=213");
    }

    #[test]
    fn test_unrecognized_scheme() {
        let err = Address::parse("ftp://localhost/x").unwrap_err();
        assert_eq!(err, AddressError::UnrecognizedScheme("ftp".to_string()));
    }

    #[test]
    fn test_missing_host_is_invalid() {
        assert!(matches!(
            Address::parse("http:///x"),
            Err(AddressError::Invalid(_))
        ));
        assert!(matches!(
            Address::parse("not an address"),
            Err(AddressError::Invalid(_))
        ));
    }

    #[test]
    fn test_full_scheme_parses() {
        let addr = Address::parse("full://localhost:3380/ntables").unwrap();
        assert_eq!(addr.scheme, Scheme::Full);
        assert_eq!(addr.scheme.built_scheme(), Scheme::Full);
    }

    #[test]
    fn test_built_scheme_mapping() {
        assert_eq!(Scheme::Http.built_scheme(), Scheme::Full);
        assert_eq!(Scheme::Post.built_scheme(), Scheme::Full);
        assert_eq!(Scheme::Https.built_scheme(), Scheme::Fulls);
    }

    #[test]
    fn test_ipv6_authority_round_trips() {
        let addr = Address::parse("http://[::1]:3380/x").unwrap();
        assert_eq!(addr.port, 3380);
        assert_eq!(addr.authority(), "[::1]:3380");
    }
}
