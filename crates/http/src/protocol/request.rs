//! The request view handed to handlers.
//!
//! A [`Request`] is assembled by the connection once the request line, the header block and
//! the body have been read. The only thing filled in afterwards is the set of path
//! parameters, which depends on the route that matched.

use crate::protocol::{Header, Headers, Method, QueryString};
use bytes::Bytes;
use percent_encoding::percent_decode_str;

/// The first line of a request: `METHOD SP target SP version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub target: String,
    pub version: String,
}

impl RequestLine {
    /// Splits the target at the first `?` into the path and the raw query string.
    pub fn split_target(&self) -> (&str, &str) {
        self.target.split_once('?').unwrap_or((self.target.as_str(), ""))
    }
}

/// Path parameters bound by the matched route, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for PathParams {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self { params: iter.into_iter().collect() }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: String,
    path: String,
    version: String,
    query: QueryString,
    headers: Headers,
    path_params: PathParams,
    body: Bytes,
}

impl Request {
    /// Creates a request for `target` with no headers and an empty body, `HTTP/1.1` assumed.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self::from_parts(RequestLine { method, target: target.into(), version: "HTTP/1.1".to_string() }, Headers::new(), Bytes::new())
    }

    pub fn from_parts(line: RequestLine, headers: Headers, body: Bytes) -> Self {
        let (path, query) = line.split_target();
        let path = percent_decode_str(path).decode_utf8_lossy().into_owned();
        let query = QueryString::new(query);
        Self {
            method: line.method,
            path,
            query,
            target: line.target,
            version: line.version,
            headers,
            path_params: PathParams::empty(),
            body,
        }
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.append(header);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Attaches the parameters captured by the matched route.
    pub fn with_path_params(mut self, path_params: PathParams) -> Self {
        self.path_params = path_params;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The request target exactly as received, query string included.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The percent-decoded path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn query(&self) -> &QueryString {
        &self.query
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&Header> {
        self.headers.get(key)
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as UTF-8 text, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_target() {
        let line = RequestLine { method: Method::Get, target: "/search?q=a?b".into(), version: "HTTP/1.1".into() };
        assert_eq!(line.split_target(), ("/search", "q=a?b"));

        let line = RequestLine { method: Method::Get, target: "/plain".into(), version: "HTTP/1.1".into() };
        assert_eq!(line.split_target(), ("/plain", ""));
    }

    #[test]
    fn test_request_decodes_path_and_query() {
        let request = Request::new(Method::Get, "/users/john%20doe?query=java%2Fscript");
        assert_eq!(request.path(), "/users/john doe");
        assert_eq!(request.target(), "/users/john%20doe?query=java%2Fscript");
        assert_eq!(request.query().get("query"), Some("java/script"));
    }

    #[test]
    fn test_path_params() {
        let params: PathParams = [("id".to_string(), "".to_string()), ("name".to_string(), "x".to_string())].into_iter().collect();
        let request = Request::new(Method::Get, "/user/").with_path_params(params);
        assert_eq!(request.path_param("id"), Some(""));
        assert_eq!(request.path_param("name"), Some("x"));
        assert_eq!(request.path_param("missing"), None);
        assert_eq!(request.path_params().len(), 2);
    }
}
