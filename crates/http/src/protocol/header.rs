//! Header model shared by requests and responses.
//!
//! A [`Header`] is a validated key plus an ordered, non-empty list of values. Headers read
//! off the wire keep the raw value and only split it on `,` the first time the values are
//! asked for; most headers are never inspected by the handler, so the split is usually
//! never paid for.

use crate::ensure;
use crate::protocol::ParseError;
use http::HeaderName;
use httparse::{Error, Status};
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::fmt;

#[derive(Clone)]
pub struct Header {
    key: String,
    raw_value: Option<String>,
    values: OnceCell<Vec<String>>,
}

impl Header {
    /// Parses a `Key: v1, v2` header line. The value part is kept as-is until first access.
    pub fn parse_line(line: &str) -> Result<Self, ParseError> {
        let mut block = String::with_capacity(line.len() + 4);
        block.push_str(line);
        block.push_str("\r\n\r\n");

        let mut headers = [httparse::EMPTY_HEADER; 1];
        match httparse::parse_headers(block.as_bytes(), &mut headers) {
            Ok(Status::Complete((_, [field]))) => Self::from_raw(field.name, &String::from_utf8_lossy(field.value)),
            Ok(_) => Err(ParseError::invalid_header(format!("not a single header line: {line:?}"))),
            Err(Error::TooManyHeaders) => Err(ParseError::invalid_header(format!("line break inside {line:?}"))),
            Err(e) => Err(ParseError::invalid_header(format!("{line:?}: {e}"))),
        }
    }

    /// Creates a header from a field already split by the request parser. The value is
    /// kept as-is, outer whitespace aside, until first access.
    pub fn from_raw(key: &str, raw_value: &str) -> Result<Self, ParseError> {
        validate_key(key)?;
        Ok(Self { key: key.to_string(), raw_value: Some(raw_value.trim().to_string()), values: OnceCell::new() })
    }

    /// Creates a header holding exactly one value, commas included.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, ParseError> {
        Self::with_values(key, vec![value.into()])
    }

    /// Creates a header from an explicit, non-empty list of values.
    pub fn with_values(key: impl Into<String>, values: Vec<String>) -> Result<Self, ParseError> {
        let key = key.into();
        validate_key(&key)?;
        ensure!(!values.is_empty(), ParseError::invalid_header(format!("header {key} needs at least one value")));
        for value in &values {
            validate_value(&key, value)?;
        }
        Ok(Self { key, raw_value: None, values: OnceCell::with_value(values) })
    }

    /// Creates a header from compile-time constants.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not a valid token or `value` contains a line break, the same
    /// contract as [`http::HeaderValue::from_static`].
    pub fn from_static(key: &'static str, value: &'static str) -> Self {
        match Self::new(key, value) {
            Ok(header) => header,
            Err(e) => panic!("invalid static header {key}: {e}"),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Case-insensitive key comparison.
    #[inline]
    pub fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }

    /// The comma separated values, trimmed. Split lazily for headers read off the wire.
    pub fn values(&self) -> &[String] {
        self.values.get_or_init(|| match &self.raw_value {
            Some(raw) => raw.split(',').map(|v| v.trim().to_string()).collect(),
            None => Vec::new(),
        })
    }

    /// The first value.
    pub fn value(&self) -> &str {
        self.values().first().map(String::as_str).unwrap_or_default()
    }

    /// The value as it goes on the wire: the raw text for parsed headers, the values joined
    /// by `", "` otherwise.
    pub fn raw_value(&self) -> Cow<'_, str> {
        match &self.raw_value {
            Some(raw) => Cow::Borrowed(raw.as_str()),
            None => match self.values() {
                [single] => Cow::Borrowed(single.as_str()),
                values => Cow::Owned(values.join(", ")),
            },
        }
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header").field("key", &self.key).field("value", &self.raw_value()).finish()
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.key.eq_ignore_ascii_case(&other.key) && self.values() == other.values()
    }
}

fn validate_key(key: &str) -> Result<(), ParseError> {
    // HeaderName accepts exactly the RFC 7230 token characters
    ensure!(!key.is_empty(), ParseError::invalid_header("empty header name"));
    HeaderName::from_bytes(key.as_bytes()).map_err(|e| ParseError::invalid_header(format!("{key:?}: {e}")))?;
    Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<(), ParseError> {
    ensure!(
        !value.bytes().any(|b| b == b'\r' || b == b'\n'),
        ParseError::invalid_header(format!("value of {key} contains a line break"))
    );
    Ok(())
}

/// Ordered header collection with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    inner: Vec<Header>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: Vec::with_capacity(capacity) }
    }

    /// First header with the given key.
    pub fn get(&self, key: &str) -> Option<&Header> {
        self.inner.iter().find(|h| h.is(key))
    }

    /// Every header with the given key, in arrival order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Header> + 'a {
        self.inner.iter().filter(move |h| h.is(key))
    }

    /// First value of the first header with the given key.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(Header::value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Adds a header, keeping any existing headers with the same key.
    pub fn append(&mut self, header: Header) {
        self.inner.push(header);
    }

    /// Adds a header, replacing every existing header with the same key.
    pub fn insert(&mut self, header: Header) {
        match self.inner.iter().position(|h| h.is(header.key())) {
            Some(index) => {
                self.inner[index] = header;
                let key = self.inner[index].key.clone();
                let mut seen = 0usize;
                self.inner.retain(|h| {
                    if !h.is(&key) {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => self.inner.push(header),
        }
    }

    /// Removes every header with the given key, returning whether any was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.inner.len();
        self.inner.retain(|h| !h.is(key));
        before != self.inner.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Self {
        Self { inner: iter.into_iter().collect() }
    }
}
