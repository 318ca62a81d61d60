use crate::sse::SseEndpoint;
use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};
use switchyard_http::protocol::SendError;
use tokio::sync::mpsc::Receiver;

/// The response body of one event-stream client.
///
/// Yields encoded frames as they are broadcast. It ends only once the endpoint has dropped
/// the client for falling behind. Dropping it, which
/// the connection does once the peer hangs up or a write fails, disconnects the client.
#[derive(Debug)]
pub struct EventStream {
    receiver: Receiver<Bytes>,
    guard: DisconnectGuard,
}

impl EventStream {
    pub(crate) fn new(receiver: Receiver<Bytes>, endpoint: Weak<SseEndpoint>, client_id: u64) -> Self {
        Self { receiver, guard: DisconnectGuard { endpoint, client_id } }
    }

    pub fn client_id(&self) -> u64 {
        self.guard.client_id
    }

    /// Stops accepting frames: the next broadcast to this client fails and drops it.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl Body for EventStream {
    type Data = Bytes;
    type Error = SendError;

    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.receiver.poll_recv(cx).map(|frame| frame.map(|bytes| Ok(Frame::data(bytes))))
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::default()
    }
}

#[derive(Debug)]
struct DisconnectGuard {
    endpoint: Weak<SseEndpoint>,
    client_id: u64,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if let Some(endpoint) = self.endpoint.upgrade() {
            endpoint.disconnect(self.client_id);
        }
    }
}
