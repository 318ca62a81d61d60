//! Server-sent events.
//!
//! An [`SseEndpoint`] owns the clients of one event-stream route. Each client is a
//! connection whose response body is an [`EventStream`]; [`SseEndpoint::broadcast`] queues a
//! frame for every client and each connection task writes and flushes its own frames, so a
//! slow peer never holds up the broadcast or the other clients.
//!
//! Each client has a bounded frame queue. A client leaves when its connection ends (the peer
//! hanging up or a failed write) or when a broadcast finds its queue closed or full.
//!
//! ```no_run
//! use std::time::Duration;
//! use switchyard_web::router::Router;
//! use switchyard_web::sse::{SseEndpoint, SseMessage};
//!
//! let clock = SseEndpoint::new("/clock");
//! clock.on_active_change(|active| tracing::info!(active, "clock listeners changed"));
//! let router = Router::builder().sse("/clock", &clock).build().unwrap();
//!
//! let ticker = clock.clone();
//! tokio::spawn(async move {
//!     loop {
//!         tokio::time::sleep(Duration::from_secs(1)).await;
//!         ticker.broadcast(|_client| SseMessage::data("tick"));
//!     }
//! });
//! ```

mod endpoint;
mod handler;
mod message;
mod registry;
mod stream;

pub use endpoint::DEFAULT_QUEUE_FRAMES;
pub use endpoint::SseClient;
pub use endpoint::SseEndpoint;
pub use handler::SseHandler;
pub use message::SseMessage;
pub use registry::SseRegistry;
pub use stream::EventStream;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SseError {
    #[error("sse client {client_id} is disconnected")]
    Disconnected { client_id: u64 },

    #[error("sse client {client_id} stopped reading, its queue is full")]
    Lagging { client_id: u64 },
}
