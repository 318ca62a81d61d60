//! Response bodies.
//!
//! Every [`ResponseBody`] implements [`http_body::Body`]. Its `size_hint` is the body-length
//! hint the connection turns into `Content-Length`; only the event-stream style
//! [`ResponseBody::stream`] variant reports no exact size and is written until it ends.

use crate::protocol::SendError;
use bytes::Bytes;
use futures::StreamExt;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::combinators::UnsyncBoxBody;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

const FILE_CHUNK_SIZE: usize = 64 * 1024;

pub struct ResponseBody {
    inner: Kind,
}

enum Kind {
    Once(Option<Bytes>),
    File { stream: ReaderStream<File>, remaining: u64 },
    Stream(UnsyncBoxBody<Bytes, SendError>),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self { inner: Kind::Once(Some(bytes)) } }
    }

    /// Streams `len` bytes of `file`. `len` is the body-length hint, usually taken from the
    /// file's metadata right after opening it.
    pub fn file(file: File, len: u64) -> Self {
        Self { inner: Kind::File { stream: ReaderStream::with_capacity(file, FILE_CHUNK_SIZE), remaining: len } }
    }

    /// A body of unknown length, written until the inner body ends or the peer goes away.
    pub fn stream<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes, Error = SendError> + Send + 'static,
    {
        Self { inner: Kind::Stream(UnsyncBoxBody::new(body)) }
    }

    /// The exact number of bytes this body will produce, if known.
    pub fn length_hint(&self) -> Option<u64> {
        self.size_hint().exact()
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Kind::Once(bytes) => f.debug_tuple("Once").field(bytes).finish(),
            Kind::File { remaining, .. } => f.debug_struct("File").field("remaining", remaining).finish(),
            Kind::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(value: Vec<u8>) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<Bytes> for ResponseBody {
    fn from(value: Bytes) -> Self {
        Self::once(value)
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Self::once(Bytes::from_static(value.as_bytes()))
    }
}

impl From<()> for ResponseBody {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = SendError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().inner {
            Kind::Once(option_bytes) => Poll::Ready(option_bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::File { stream, remaining } => {
                if *remaining == 0 {
                    return Poll::Ready(None);
                }
                match ready!(stream.poll_next_unpin(cx)) {
                    Some(Ok(bytes)) => {
                        *remaining = remaining.saturating_sub(bytes.len() as u64);
                        Poll::Ready(Some(Ok(Frame::data(bytes))))
                    }
                    Some(Err(e)) => Poll::Ready(Some(Err(SendError::io(e)))),
                    None => Poll::Ready(None),
                }
            }
            Kind::Stream(box_body) => Pin::new(box_body).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            Kind::Once(option_bytes) => option_bytes.is_none(),
            Kind::File { remaining, .. } => *remaining == 0,
            Kind::Stream(box_body) => box_body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Kind::Once(None) => SizeHint::with_exact(0),
            Kind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::File { remaining, .. } => SizeHint::with_exact(*remaining),
            Kind::Stream(box_body) => box_body.size_hint(),
        }
    }
}
