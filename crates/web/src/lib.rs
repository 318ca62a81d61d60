//! Routing, the server shell and server-sent events for switchyard.
//!
//! ```no_run
//! use switchyard_web::router::{Router, get};
//! use switchyard_web::{Server, handler_fn};
//! use switchyard_http::protocol::Request;
//!
//! async fn hello(request: Request) -> String {
//!     format!("hello {}", request.path_param("name").unwrap_or("world"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::builder().route("/hello/:name", get(handler_fn(hello))).build()?;
//!     Server::builder().router(router).bind("127.0.0.1:3000").build()?.run().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod handler;
mod responder;
mod server;

pub mod converter;
pub mod files;
pub mod router;
pub mod sse;

pub use config::ServerConfig;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use handler::handler_fn;
pub use responder::Responder;
pub use router::Router;
pub use server::Server;
pub use server::ServerBuilder;
pub use server::ServerError;
pub use server::ServerHandle;
