//! HTTP codec module for encoding and decoding HTTP messages
//!
//! Both halves plug into `tokio_util::codec` so the connection can drive them through
//! `FramedRead` and `FramedWrite`, which take care of partial reads and buffered writes.
//!
//! - [`RequestDecoder`]: parses the request head with `httparse`, then yields the request line, each
//!   header line, the end of the header block and the `Content-Length` body in chunks
//! - [`ResponseEncoder`]: writes the status line, the `Server` and `Date` headers, the
//!   response headers and `Content-Length`, then the body while holding it to its length
//!
//! # Example
//!
//! ```
//! use switchyard_http::codec::RequestDecoder;
//! use switchyard_http::protocol::RequestItem;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(&b"GET /users/42 HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]);
//! let item = decoder.decode(&mut buffer).unwrap();
//! assert!(matches!(item, Some(RequestItem::RequestLine(_))));
//! ```

mod payload_encoder;
mod request_decoder;
mod response_encoder;

pub use request_decoder::DEFAULT_MAX_BODY_BYTES;
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
