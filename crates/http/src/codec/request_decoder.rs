//! HTTP request decoder
//!
//! The head of a request (request line plus header block) is parsed in one go with
//! `httparse` once it is fully buffered, then handed out item by item:
//!
//! 1. `RequestLine`: the method mapped onto [`Method`], the target and the version
//! 2. `Header`: one [`Header`] per header field, value left unsplit
//! 3. `HeadersEnd`: the payload size taken from `Content-Length`
//! 4. `Payload`: exactly `Content-Length` bytes as they arrive, then `Eof`
//!
//! Anything the peer sends after that is discarded. A failure found after the request
//! line (a bad `Content-Length`, a chunked or oversized body) is reported after the items
//! that precede it, so the request can still be routed first.

use std::cmp;
use std::collections::VecDeque;

use crate::ensure;
use crate::protocol::{Header, Method, ParseError, PayloadItem, PayloadSize, RequestItem, RequestLine};
use bytes::{Buf, BytesMut};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the request line plus the header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Default upper bound for a request body
pub const DEFAULT_MAX_BODY_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    Body { remaining: u64 },
    Done,
}

#[derive(Debug)]
pub struct RequestDecoder {
    state: State,
    pending: VecDeque<RequestItem>,
    failure: Option<ParseError>,
    content_length: Option<u64>,
    transfer_encoding: Option<String>,
    max_body_bytes: u64,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::with_max_body_bytes(DEFAULT_MAX_BODY_BYTES)
    }

    pub fn with_max_body_bytes(max_body_bytes: u64) -> Self {
        Self {
            state: State::Head,
            pending: VecDeque::new(),
            failure: None,
            content_length: None,
            transfer_encoding: None,
            max_body_bytes,
        }
    }

    /// Whether the whole request, body included, has been decoded and handed out.
    pub fn is_done(&self) -> bool {
        self.state == State::Done && self.pending.is_empty() && self.failure.is_none()
    }

    fn next_pending(&mut self) -> Result<Option<RequestItem>, ParseError> {
        if let Some(item) = self.pending.pop_front() {
            return Ok(Some(item));
        }
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Parses the request head once it is complete. Returns whether it was.
    fn parse_head(&mut self, src: &mut BytesMut) -> Result<bool, ParseError> {
        // RFC 7230 section 3.5: ignore empty lines before the request line
        let blank = src.iter().take_while(|b| matches!(b, b'\r' | b'\n')).count();
        src.advance(blank);
        if src.is_empty() {
            return Ok(false);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let parsed_result = req.parse(&src[..]).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            Error::HeaderName | Error::HeaderValue => ParseError::invalid_header(e),
            e => ParseError::invalid_request_line(e),
        })?;

        let head_size = match parsed_result {
            Status::Complete(head_size) => head_size,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(false);
            }
        };
        trace!(head_size, "parsed request head");
        ensure!(head_size <= MAX_HEADER_BYTES, ParseError::too_large_header(head_size, MAX_HEADER_BYTES));

        let method = Method::from_bytes(req.method.unwrap_or_default().as_bytes())?;
        let target = req.path.ok_or_else(|| ParseError::invalid_request_line("missing request target"))?;
        let version = match req.version {
            Some(0) => "HTTP/1.0",
            Some(1) => "HTTP/1.1",
            other => return Err(ParseError::invalid_request_line(format!("unsupported version {other:?}"))),
        };
        self.pending.push_back(RequestItem::RequestLine(RequestLine {
            method,
            target: target.to_string(),
            version: version.to_string(),
        }));

        let mut failure = None;
        for field in req.headers.iter() {
            let header = match Header::from_raw(field.name, &String::from_utf8_lossy(field.value)) {
                Ok(header) => header,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            if let Err(e) = self.watch_header(&header) {
                failure = Some(e);
                break;
            }
            self.pending.push_back(RequestItem::Header(header));
        }

        src.advance(head_size);

        match failure.map_or_else(|| self.finish_headers(), Err) {
            Ok(headers_end) => self.pending.push_back(headers_end),
            Err(e) => {
                self.state = State::Done;
                self.failure = Some(e);
            }
        }
        Ok(true)
    }

    fn watch_header(&mut self, header: &Header) -> Result<(), ParseError> {
        if header.is(http::header::CONTENT_LENGTH.as_str()) {
            let length = header
                .raw_value()
                .parse::<u64>()
                .map_err(|e| ParseError::invalid_content_length(format!("{:?}: {e}", header.raw_value())))?;
            if let Some(existing) = self.content_length {
                ensure!(existing == length, ParseError::invalid_content_length("conflicting content-length headers"));
            }
            self.content_length = Some(length);
        } else if header.is(http::header::TRANSFER_ENCODING.as_str()) {
            let encoding = header.raw_value();
            if !encoding.eq_ignore_ascii_case("identity") {
                self.transfer_encoding = Some(encoding.into_owned());
            }
        }
        Ok(())
    }

    fn finish_headers(&mut self) -> Result<RequestItem, ParseError> {
        if let Some(encoding) = self.transfer_encoding.take() {
            return Err(ParseError::unsupported_transfer_encoding(encoding));
        }

        match self.content_length {
            Some(length) if length > self.max_body_bytes => Err(ParseError::too_large_body(length, self.max_body_bytes)),
            Some(length) if length > 0 => {
                self.state = State::Body { remaining: length };
                Ok(RequestItem::HeadersEnd(PayloadSize::Length(length)))
            }
            _ => {
                self.state = State::Done;
                Ok(RequestItem::HeadersEnd(PayloadSize::Empty))
            }
        }
    }

    fn decode_body(&mut self, remaining: u64, src: &mut BytesMut) -> Option<RequestItem> {
        if remaining == 0 {
            self.state = State::Done;
            return Some(RequestItem::Payload(PayloadItem::Eof));
        }

        if src.is_empty() {
            return None;
        }

        let len = cmp::min(remaining, src.len() as u64);
        let bytes = src.split_to(len as usize).freeze();
        trace!(size = bytes.len(), remaining = remaining - len, "decoded body chunk");
        self.state = State::Body { remaining: remaining - len };
        Some(RequestItem::Payload(PayloadItem::Chunk(bytes)))
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RequestDecoder {
    type Item = RequestItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.next_pending()? {
            return Ok(Some(item));
        }

        match self.state {
            State::Head => {
                if self.parse_head(src)? {
                    self.next_pending()
                } else {
                    Ok(None)
                }
            }
            State::Body { remaining } => Ok(self.decode_body(remaining, src)),
            State::Done => {
                src.clear();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }

        match self.state {
            // the peer hung up before sending anything, or only blank lines
            State::Head if src.iter().all(u8::is_ascii_whitespace) => {
                src.clear();
                Ok(None)
            }
            // end of stream terminates the head like an empty line
            State::Head => {
                let terminator: &[u8] = if src.ends_with(b"\n") { b"\r\n" } else { b"\r\n\r\n" };
                src.extend_from_slice(terminator);
                match self.decode(src)? {
                    Some(item) => Ok(Some(item)),
                    None => {
                        self.state = State::Done;
                        src.clear();
                        Err(ParseError::invalid_request_line("connection closed in the middle of the request head"))
                    }
                }
            }
            State::Body { remaining } => {
                self.state = State::Done;
                Err(ParseError::invalid_body(format!("connection closed with {remaining} body bytes missing")))
            }
            State::Done => Ok(None),
        }
    }
}
