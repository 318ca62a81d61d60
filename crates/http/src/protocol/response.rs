//! The response model produced by handlers and consumed once by the connection.

use crate::protocol::{Header, Headers, ParseError, ResponseBody};
use bytes::Bytes;
use http::StatusCode;

/// Status and headers of a response, what the encoder writes before the body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: Headers,
}

impl ResponseHead {
    /// `HTTP/1.1 <code> <reason>`, without the line terminator.
    pub fn status_line(&self) -> String {
        format!("HTTP/1.1 {} {}", self.status.as_str(), self.status.canonical_reason().unwrap_or("Unknown"))
    }
}

#[derive(Debug)]
pub struct Response {
    head: ResponseHead,
    body: ResponseBody,
}

impl Response {
    /// An empty-bodied response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self { head: ResponseHead { status, headers: Headers::new() }, body: ResponseBody::empty() }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// A `text/plain; charset=utf-8` response.
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self::bytes(status, mime::TEXT_PLAIN_UTF_8.as_ref(), Bytes::from(text.into()))
    }

    /// A byte-array response with the given content type.
    pub fn bytes(status: StatusCode, content_type: &str, bytes: impl Into<Bytes>) -> Self {
        let mut response = Self::new(status).with_body(ResponseBody::once(bytes.into()));
        if let Ok(header) = Header::new(http::header::CONTENT_TYPE.as_str(), content_type) {
            response.head.headers.insert(header);
        }
        response
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.head.status = status;
        self
    }

    /// Appends a header.
    pub fn header(mut self, header: Header) -> Self {
        self.head.headers.append(header);
        self
    }

    /// Appends a header built from a key and a single value.
    pub fn try_header(self, key: &str, value: impl Into<String>) -> Result<Self, ParseError> {
        Ok(self.header(Header::new(key, value)?))
    }

    pub fn with_body(mut self, body: impl Into<ResponseBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.head.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.head.status = status;
    }

    pub fn headers(&self) -> &Headers {
        &self.head.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.head.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// The number of body bytes that will be written, when known up front.
    pub fn length_hint(&self) -> Option<u64> {
        self.body.length_hint()
    }

    pub fn into_parts(self) -> (ResponseHead, ResponseBody) {
        (self.head, self.body)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let response = Response::ok();
        assert_eq!(response.into_parts().0.status_line(), "HTTP/1.1 200 OK");

        let response = Response::new(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.into_parts().0.status_line(), "HTTP/1.1 405 Method Not Allowed");

        let response = Response::new(StatusCode::from_u16(599).unwrap());
        assert_eq!(response.into_parts().0.status_line(), "HTTP/1.1 599 Unknown");
    }

    #[test]
    fn test_text_response() {
        let response = Response::text(StatusCode::BAD_REQUEST, "bad id").try_header("X-Trace", "1").unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers().value("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(response.headers().value("x-trace"), Some("1"));
        assert_eq!(response.length_hint(), Some(6));
    }
}
