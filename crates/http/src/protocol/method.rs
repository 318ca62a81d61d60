//! The closed set of request methods the server understands.

use crate::protocol::ParseError;
use std::fmt;
use std::str::FromStr;

/// HTTP request method.
///
/// Unlike [`http::Method`] this enumeration is closed: a request line carrying
/// any other token is rejected with [`ParseError::InvalidMethod`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Options,
    Get,
    Head,
    Post,
    Put,
    Delete,
    Trace,
    Patch,
    Connect,
}

impl Method {
    /// Number of variants, handy for per-method lookup tables.
    pub const COUNT: usize = 9;

    /// All methods in declaration order.
    pub const ALL: [Method; Method::COUNT] = [
        Method::Options,
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Trace,
        Method::Patch,
        Method::Connect,
    ];

    /// Dense index in `0..Method::COUNT`, matching the order of [`Method::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The upper-case token as it appears on the request line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
            Method::Connect => "CONNECT",
        }
    }

    /// Method tokens are case-sensitive (RFC 7230 section 3.1.1).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let method = match bytes {
            b"OPTIONS" => Method::Options,
            b"GET" => Method::Get,
            b"HEAD" => Method::Head,
            b"POST" => Method::Post,
            b"PUT" => Method::Put,
            b"DELETE" => Method::Delete,
            b"TRACE" => Method::Trace,
            b"PATCH" => Method::Patch,
            b"CONNECT" => Method::Connect,
            _ => return Err(ParseError::InvalidMethod),
        };
        Ok(method)
    }
}

impl FromStr for Method {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::from_bytes(s.as_bytes())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Options => http::Method::OPTIONS,
            Method::Get => http::Method::GET,
            Method::Head => http::Method::HEAD,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Delete => http::Method::DELETE,
            Method::Trace => http::Method::TRACE,
            Method::Patch => http::Method::PATCH,
            Method::Connect => http::Method::CONNECT,
        }
    }
}
