use crate::protocol::{PayloadItem, PayloadSize, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

/// Writes response body chunks, holding the body to the length the head advertised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PayloadEncoder {
    kind: Kind,
    finished: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// `Content-Length` body, counting down the bytes still owed
    Length(u64),
    /// body delimited by closing the connection
    UntilClose,
    /// no body at all
    NoBody,
}

impl PayloadEncoder {
    pub(crate) fn new(payload_size: PayloadSize) -> Self {
        let kind = match payload_size {
            PayloadSize::Length(0) | PayloadSize::Empty => Kind::NoBody,
            PayloadSize::Length(length) => Kind::Length(length),
            PayloadSize::UntilClose => Kind::UntilClose,
        };
        Self { kind, finished: false }
    }

    pub(crate) fn is_finish(&self) -> bool {
        self.finished
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                if !bytes.has_remaining() {
                    return Ok(());
                }
                let size = bytes.remaining() as u64;
                match &mut self.kind {
                    Kind::Length(remaining) => {
                        if size > *remaining {
                            return Err(SendError::invalid_body(format!(
                                "body chunk of {size} bytes exceeds the {remaining} bytes left of its length hint"
                            )));
                        }
                        *remaining -= size;
                    }
                    Kind::UntilClose => {}
                    Kind::NoBody => return Err(SendError::invalid_body(format!("{size} body bytes for a response without body"))),
                }
                dst.extend_from_slice(bytes.chunk());
                Ok(())
            }
            PayloadItem::Eof => {
                self.finished = true;
                match self.kind {
                    Kind::Length(remaining) if remaining > 0 => {
                        Err(SendError::invalid_body(format!("body ended {remaining} bytes short of its length hint")))
                    }
                    _ => Ok(()),
                }
            }
        }
    }
}
