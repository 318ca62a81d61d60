use crate::protocol::{Header, RequestLine, ResponseHead};
use bytes::{Buf, Bytes};

/// One unit produced by the request decoder, in wire order.
///
/// A well-formed request yields exactly one `RequestLine`, zero or more `Header`s,
/// one `HeadersEnd` and, when the request has a body, `Payload` chunks closed by
/// [`PayloadItem::Eof`].
#[derive(Debug)]
pub enum RequestItem {
    RequestLine(RequestLine),
    Header(Header),
    HeadersEnd(PayloadSize),
    Payload(PayloadItem),
}

/// Represents a HTTP message that can either be a header or payload.
///
/// The encoder side uses it with [`ResponseFrame`] as the header type.
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    /// Contains the header information of type `T`
    Header(T),
    /// Contains a chunk of payload data or EOF marker
    Payload(PayloadItem<Data>),
}

/// Everything the encoder needs to write the head of a response.
#[derive(Debug, Clone)]
pub struct ResponseFrame {
    pub head: ResponseHead,
    /// Value of the `Server` header.
    pub server: Bytes,
    /// Value of the `Date` header.
    pub date: Bytes,
    pub payload_size: PayloadSize,
}

/// Represents an item in the HTTP message payload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

/// Represents the size information of an HTTP payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload of unknown length, delimited by closing the connection
    UntilClose,
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    /// The `Content-Length` to advertise, `None` for close-delimited payloads.
    #[inline]
    pub fn content_length(&self) -> Option<u64> {
        match self {
            PayloadSize::Length(n) => Some(*n),
            PayloadSize::Empty => Some(0),
            PayloadSize::UntilClose => None,
        }
    }

    pub fn from_hint(hint: Option<u64>) -> Self {
        match hint {
            Some(0) => PayloadSize::Empty,
            Some(n) => PayloadSize::Length(n),
            None => PayloadSize::UntilClose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_size_from_hint() {
        assert_eq!(PayloadSize::from_hint(Some(0)), PayloadSize::Empty);
        assert_eq!(PayloadSize::from_hint(Some(5)), PayloadSize::Length(5));
        assert_eq!(PayloadSize::from_hint(None), PayloadSize::UntilClose);

        assert_eq!(PayloadSize::Empty.content_length(), Some(0));
        assert_eq!(PayloadSize::UntilClose.content_length(), None);
    }
}
