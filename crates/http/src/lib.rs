//! The wire half of the switchyard HTTP server.
//!
//! This crate knows how to read one HTTP/1.1 request off a byte stream and write one
//! response back. It does not know about route tables, files or event streams: those
//! live in `switchyard-web`, which plugs into the [`handler::Handler`] seam defined here.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use switchyard_http::connection::{ConnectionSettings, HttpConnection};
//! use switchyard_http::date::{DEFAULT_UPDATE_INTERVAL, DateService};
//! use switchyard_http::handler::make_handler;
//! use switchyard_http::protocol::{HandlerError, Request, Response, StatusCode};
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let settings = Arc::new(ConnectionSettings::new("switchyard", DateService::start(DEFAULT_UPDATE_INTERVAL)));
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         let settings = settings.clone();
//!
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer, settings);
//!             match connection.process(handler).await {
//!                 Ok(_) => info!("finished process, connection shutdown"),
//!                 Err(e) => error!("service has error, cause {}, connection shutdown", e),
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request) -> Result<Response, HandlerError> {
//!     info!(path = request.path(), "receiving request");
//!     Ok(Response::text(StatusCode::OK, "Hello World!\r\n"))
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: requests, responses, headers, methods and the error types
//! - [`codec`]: the request decoder and response encoder driven by `tokio_util::codec`
//! - [`connection`]: one request/response exchange per connection
//! - [`handler`]: the trait a dispatcher implements to answer requests
//! - [`date`]: the shared `Date` header value
//!
//! # Limitations
//!
//! - HTTP/1.1 only, one request per connection, no keep-alive
//! - `Content-Length` request bodies only, chunked requests are answered with `501`
//! - No TLS
//! - Request and header lines up to 8 KiB, at most 64 headers

pub mod codec;
pub mod connection;
pub mod date;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
