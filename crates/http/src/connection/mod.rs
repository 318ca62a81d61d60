//! HTTP connection handling module
//!
//! [`HttpConnection`] runs exactly one request/response exchange on a socket:
//!
//! ```text
//! AwaitRequestLine -> AwaitHeaders -> Routed -> WritingResponse -> Closed
//! ```
//!
//! There is no keep-alive; the write half is shut down once the response is out, however
//! the exchange ended. There is no read or write deadline either: a peer that stalls keeps
//! its connection task parked until it goes away.

mod http_connection;
mod settings;

pub use http_connection::HttpConnection;
pub use settings::ConnectionSettings;
