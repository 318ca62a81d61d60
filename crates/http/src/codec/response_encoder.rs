//! HTTP response encoder
//!
//! Serializes a [`ResponseFrame`] as
//!
//! ```text
//! HTTP/1.1 <code> <reason>\r\n
//! Server: <server>\r\n
//! Date: <date>\r\n
//! <response headers>\r\n
//! Content-Length: <n>\r\n
//! \r\n
//! ```
//!
//! followed by the body chunks. `Content-Length` always comes from the payload size, a
//! `Content-Length` or `Transfer-Encoding` set by the handler is dropped. Close-delimited
//! payloads get no `Content-Length` at all.

use crate::codec::payload_encoder::PayloadEncoder;
use crate::protocol::{Message, ResponseFrame, SendError};
use bytes::{Buf, BufMut, BytesMut};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

#[derive(Debug, Default)]
pub struct ResponseEncoder {
    payload_encoder: Option<PayloadEncoder>,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: Buf> Encoder<Message<ResponseFrame, D>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<ResponseFrame, D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header(frame) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive response head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                self.payload_encoder = Some(PayloadEncoder::new(frame.payload_size));
                encode_head(frame, dst)
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("expect response header but receive payload item");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let result = payload_encoder.encode(payload_item, dst);

                if payload_encoder.is_finish() {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}

fn encode_head(frame: ResponseFrame, dst: &mut BytesMut) -> Result<(), SendError> {
    let ResponseFrame { head, server, date, payload_size } = frame;

    dst.reserve(INIT_HEADER_SIZE);
    write!(FastWrite(dst), "{}\r\n", head.status_line())?;

    if !server.is_empty() {
        put_header(dst, b"Server", &server);
    }
    if !date.is_empty() {
        put_header(dst, b"Date", &date);
    }

    for header in head.headers.iter() {
        if header.is(http::header::CONTENT_LENGTH.as_str()) || header.is(http::header::TRANSFER_ENCODING.as_str()) {
            continue;
        }
        put_header(dst, header.key().as_bytes(), header.raw_value().as_bytes());
    }

    if let Some(length) = payload_size.content_length() {
        write!(FastWrite(dst), "Content-Length: {length}\r\n")?;
    }
    dst.put_slice(b"\r\n");
    Ok(())
}

#[inline]
fn put_header(dst: &mut BytesMut, key: &[u8], value: &[u8]) {
    dst.put_slice(key);
    dst.put_slice(b": ");
    dst.put_slice(value);
    dst.put_slice(b"\r\n");
}

/// Fast writer implementation for writing to BytesMut.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Header, PayloadItem, PayloadSize, Response, StatusCode};
    use bytes::Bytes;

    fn frame(response: Response, payload_size: PayloadSize) -> ResponseFrame {
        let (head, _body) = response.into_parts();
        ResponseFrame {
            head,
            server: Bytes::from_static(b"switchyard/test"),
            date: Bytes::from_static(b"Thu, 01 Jan 1970 00:00:00 GMT"),
            payload_size,
        }
    }

    #[test]
    fn test_encode_hello() {
        let response = Response::ok().header(Header::from_static("Content-Type", "text/plain"));
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header(frame(response, PayloadSize::Length(5))), &mut dst).unwrap();
        encoder.encode(Message::<ResponseFrame, _>::Payload(PayloadItem::Chunk(Bytes::from_static(b"hello"))), &mut dst).unwrap();
        encoder.encode(Message::<ResponseFrame, Bytes>::Payload(PayloadItem::Eof), &mut dst).unwrap();

        assert_eq!(
            std::str::from_utf8(&dst).unwrap(),
            "HTTP/1.1 200 OK\r\n\
             Server: switchyard/test\r\n\
             Date: Thu, 01 Jan 1970 00:00:00 GMT\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: 5\r\n\
             \r\n\
             hello"
        );
    }

    #[test]
    fn test_encode_drops_handler_content_length() {
        let response = Response::new(StatusCode::NOT_FOUND).header(Header::from_static("Content-Length", "99"));
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header(frame(response, PayloadSize::Empty)), &mut dst).unwrap();
        let text = std::str::from_utf8(&dst).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.ends_with("Content-Length: 0\r\n\r\n"));
        assert!(!text.contains("99"));
    }

    #[test]
    fn test_encode_until_close_has_no_length() {
        let response = Response::ok();
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header(frame(response, PayloadSize::UntilClose)), &mut dst).unwrap();
        assert!(!std::str::from_utf8(&dst).unwrap().contains("Content-Length"));
    }

    #[test]
    fn test_payload_before_head_is_rejected() {
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();
        let result = encoder.encode(Message::<ResponseFrame, Bytes>::Payload(PayloadItem::Eof), &mut dst);
        assert!(result.is_err());
    }
}
