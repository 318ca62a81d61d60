use crate::sse::{EventStream, SseError, SseMessage};
use arc_swap::ArcSwap;
use bytes::Bytes;
use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use switchyard_http::protocol::Request;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Sender};
use tracing::{debug, info};

type ActiveListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Frames a client may have queued before it counts as stalled.
pub const DEFAULT_QUEUE_FRAMES: usize = 256;

/// A connected event-stream client: the request it connected with and the channel feeding
/// its connection.
pub struct SseClient {
    id: u64,
    request: Request,
    sender: Sender<Bytes>,
}

impl SseClient {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The request the client connected with, path parameters and query string included.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Queues one frame for the client's connection, which writes and flushes it. Fails when
    /// the connection is gone or has fallen a full queue behind.
    pub fn send(&self, message: &SseMessage) -> Result<(), SseError> {
        self.sender.try_send(message.encode()).map_err(|e| match e {
            TrySendError::Full(_) => SseError::Lagging { client_id: self.id },
            TrySendError::Closed(_) => SseError::Disconnected { client_id: self.id },
        })
    }
}

impl fmt::Debug for SseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseClient").field("id", &self.id).field("path", &self.request.path()).finish()
    }
}

/// The clients of one event-stream route.
///
/// Readers (`broadcast`, `clients`) work on a snapshot of the client list and never block.
/// `connect` and `disconnect` swap in a new list under a lock, which is also held while the
/// active-state listeners run: listeners see transitions in order and may call back into
/// the endpoint from the same thread.
pub struct SseEndpoint {
    path: String,
    clients: ArcSwap<Vec<Arc<SseClient>>>,
    lifecycle: ReentrantMutex<()>,
    listeners: Mutex<Vec<ActiveListener>>,
    next_id: AtomicU64,
    queue_frames: usize,
}

impl SseEndpoint {
    pub fn new(path: impl Into<String>) -> Arc<Self> {
        Self::with_queue_capacity(path, DEFAULT_QUEUE_FRAMES)
    }

    /// Like [`SseEndpoint::new`], with room for `queue_frames` undelivered frames per client.
    pub fn with_queue_capacity(path: impl Into<String>, queue_frames: usize) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            clients: ArcSwap::from_pointee(Vec::new()),
            lifecycle: ReentrantMutex::new(()),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            queue_frames: queue_frames.max(1),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Registers a listener called with `true` when the first client connects and with
    /// `false` when the last one leaves. It is not called for any other change.
    pub fn on_active_change<F>(&self, listener: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.listeners.lock().push(Arc::new(listener));
    }

    pub fn client_count(&self) -> usize {
        self.clients.load().len()
    }

    pub fn is_active(&self) -> bool {
        !self.clients.load().is_empty()
    }

    /// A snapshot of the connected clients.
    pub fn clients(&self) -> Arc<Vec<Arc<SseClient>>> {
        self.clients.load_full()
    }

    /// Adds a client and returns the body its connection should stream.
    pub fn connect(self: &Arc<Self>, request: Request) -> EventStream {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.queue_frames);
        let client = Arc::new(SseClient { id, request, sender });

        let _lifecycle = self.lifecycle.lock();
        let current = self.clients.load_full();
        let mut clients = Vec::with_capacity(current.len() + 1);
        clients.extend(current.iter().cloned());
        clients.push(client);
        self.clients.store(Arc::new(clients));
        debug!(path = %self.path, client_id = id, clients = current.len() + 1, "sse client connected");

        if current.is_empty() {
            self.notify_active(true);
        }

        EventStream::new(receiver, Arc::downgrade(self), id)
    }

    /// Removes a client. Returns false when it was already gone.
    pub fn disconnect(&self, client_id: u64) -> bool {
        let _lifecycle = self.lifecycle.lock();
        let current = self.clients.load_full();
        if !current.iter().any(|client| client.id == client_id) {
            return false;
        }

        let clients = current.iter().filter(|client| client.id != client_id).cloned().collect::<Vec<_>>();
        let now_empty = clients.is_empty();
        debug!(path = %self.path, client_id, clients = clients.len(), "sse client disconnected");
        self.clients.store(Arc::new(clients));

        if now_empty {
            self.notify_active(false);
        }
        true
    }

    /// Sends one message to every connected client, built per client by `message_fn`.
    ///
    /// Clients that can't be written to, closed or with a full queue, are dropped once the
    /// pass is over; the others still get their message. A dropped client's stream ends after
    /// the frames already queued, which closes its connection. Returns how many clients the
    /// message was delivered to.
    pub fn broadcast<F>(&self, mut message_fn: F) -> usize
    where
        F: FnMut(&SseClient) -> SseMessage,
    {
        let clients = self.clients.load_full();
        if clients.is_empty() {
            return 0;
        }

        let mut failed = Vec::new();
        for client in clients.iter() {
            let message = message_fn(client);
            if let Err(e) = client.send(&message) {
                debug!(path = %self.path, cause = %e, "dropping sse client");
                failed.push(client.id);
            }
        }

        for client_id in &failed {
            self.disconnect(*client_id);
        }

        clients.len() - failed.len()
    }

    fn notify_active(&self, active: bool) {
        info!(path = %self.path, active, "sse endpoint activity changed");
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(active);
        }
    }
}

impl fmt::Debug for SseEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseEndpoint").field("path", &self.path).field("clients", &self.client_count()).finish()
    }
}
