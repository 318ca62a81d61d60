//! The acceptor shell.
//!
//! [`Server::start`] binds the listener and spawns the accept loop, which spawns one task
//! per connection. Each connection runs a single [`HttpConnection`] exchange against the
//! route table and is shut down when it ends, however it ends.
//!
//! [`ServerHandle::stop`] only stops accepting: the listener is closed, connections already
//! accepted, event streams included, run until they finish on their own.

use crate::config::ServerConfig;
use crate::router::{RouteMatch, RouteResolution, Router};
use async_trait::async_trait;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use switchyard_http::connection::{ConnectionSettings, HttpConnection};
use switchyard_http::date::DateService;
use switchyard_http::handler::Handler;
use switchyard_http::protocol::{HandlerError, Header, Method, Request, Response, StatusCode};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("router must be set")]
    MissingRouter,

    #[error("address {address:?} doesn't resolve: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("address {address:?} resolves to nothing")]
    MissingAddress { address: String },

    #[error("can't bind {address:?}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Default)]
pub struct ServerBuilder {
    router: Option<Router>,
    bind: Option<String>,
    config: ServerConfig,
}

impl ServerBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Overrides [`ServerConfig::bind`].
    pub fn bind(mut self, address: impl Into<String>) -> Self {
        self.bind = Some(address.into());
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Server, ServerError> {
        let router = self.router.ok_or(ServerError::MissingRouter)?;
        let mut config = self.config;
        if let Some(bind) = self.bind {
            config.bind = bind;
        }

        let address = config
            .bind
            .to_socket_addrs()
            .map_err(|source| ServerError::InvalidAddress { address: config.bind.clone(), source })?
            .collect::<Vec<_>>();
        if address.is_empty() {
            return Err(ServerError::MissingAddress { address: config.bind });
        }

        Ok(Server { router, address, config })
    }
}

/// A configured server, ready to [`start`](Server::start).
#[derive(Debug)]
pub struct Server {
    router: Router,
    address: Vec<SocketAddr>,
    config: ServerConfig,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds the listener and starts accepting in a background task.
    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let tcp_listener = TcpListener::bind(self.address.as_slice())
            .await
            .map_err(|source| ServerError::Bind { address: self.config.bind.clone(), source })?;
        let local_addr =
            tcp_listener.local_addr().map_err(|source| ServerError::Bind { address: self.config.bind.clone(), source })?;
        info!(%local_addr, "start listening");

        let settings = Arc::new(
            ConnectionSettings::new(self.config.server_name.clone(), DateService::start(self.config.date_refresh_interval()))
                .with_max_body_bytes(self.config.max_body_bytes),
        );

        let (stop_sender, stop_receiver) = watch::channel(false);
        let (done_sender, done_receiver) = watch::channel(false);

        tokio::spawn(accept_loop(tcp_listener, Arc::new(self), settings, stop_receiver, done_sender));

        Ok(ServerHandle { local_addr, stop_sender, done_receiver })
    }

    /// Starts the server and serves until the returned future is dropped, which stops it.
    /// Use [`Server::start`] to get a [`ServerHandle`] instead.
    pub async fn run(self) -> Result<(), ServerError> {
        let handle = self.start().await?;
        handle.stopped().await;
        Ok(())
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Pause after a failed accept before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

async fn accept_loop(
    tcp_listener: TcpListener,
    server: Arc<Server>,
    settings: Arc<ConnectionSettings>,
    mut stop_receiver: watch::Receiver<bool>,
    done_sender: watch::Sender<bool>,
) {
    loop {
        let (tcp_stream, remote_addr) = tokio::select! {
            biased;
            // a dropped handle stops the server too
            _ = async { stop_receiver.wait_for(|stop| *stop).await.map(|_| ()) } => break,
            accepted = tcp_listener.accept() => match accepted {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    // errors like EMFILE persist for a while, don't spin on them
                    warn!(cause = %e, "failed to accept");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            },
        };

        let server = Arc::clone(&server);
        let settings = Arc::clone(&settings);

        tokio::spawn(async move {
            let (reader, writer) = tcp_stream.into_split();
            let connection = HttpConnection::new(reader, writer, settings);
            match connection.process(server).await {
                Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
                Err(e) => error!(%remote_addr, cause = %e, "connection failed, connection shutdown"),
            }
        });
    }

    drop(tcp_listener);
    info!("stop listening");
    done_sender.send_replace(true);
}

#[async_trait]
impl Handler for Server {
    type Route = RouteMatch;

    fn route(&self, method: Method, path: &str) -> Result<RouteMatch, Response> {
        match self.router.resolve(method, path) {
            RouteResolution::Matched(matched) => Ok(matched),
            RouteResolution::MethodNotAllowed { allowed } => Err(method_not_allowed(&allowed)),
            RouteResolution::NotFound => Err(Response::new(StatusCode::NOT_FOUND)),
        }
    }

    async fn call(&self, route: RouteMatch, request: Request) -> Result<Response, HandlerError> {
        let (handler, params) = route.into_parts();
        handler.invoke(request.with_path_params(params)).await
    }
}

fn method_not_allowed(allowed: &[Method]) -> Response {
    let response = Response::new(StatusCode::METHOD_NOT_ALLOWED);
    let allow = allowed.iter().map(|method| method.as_str().to_string()).collect::<Vec<_>>();
    match Header::with_values(http::header::ALLOW.as_str(), allow) {
        Ok(header) => response.header(header),
        Err(e) => {
            warn!(cause = %e, "can't build allow header");
            response
        }
    }
}

/// Controls a started server. Dropping it stops the server like [`ServerHandle::stop`].
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop_sender: watch::Sender<bool>,
    done_receiver: watch::Receiver<bool>,
}

impl ServerHandle {
    /// The bound address, with the actual port when the server was bound to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections. Calling it again does nothing.
    pub fn stop(&self) {
        if !self.stop_sender.send_replace(true) {
            info!(local_addr = %self.local_addr, "stopping server");
        }
    }

    /// Waits for the accept loop to exit and the listener to be closed.
    pub async fn stopped(&self) {
        let mut done_receiver = self.done_receiver.clone();
        // an error means the accept loop is gone, which is what we wait for anyway
        let _ = done_receiver.wait_for(|done| *done).await;
    }

    pub fn is_stopped(&self) -> bool {
        *self.done_receiver.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_fn;
    use crate::router::get;

    async fn hello(_request: Request) -> &'static str {
        "hello"
    }

    fn router() -> Router {
        Router::builder().route("/hello", get(handler_fn(hello))).build().unwrap()
    }

    #[test]
    fn test_build_requires_router() {
        assert!(matches!(Server::builder().bind("127.0.0.1:0").build(), Err(ServerError::MissingRouter)));
    }

    #[test]
    fn test_build_rejects_bad_address() {
        let result = Server::builder().router(router()).bind("not an address").build();
        assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
    }

    #[test]
    fn test_route_misses() {
        let server = Server::builder().router(router()).bind("127.0.0.1:0").build().unwrap();

        let Err(response) = server.route(Method::Post, "/hello") else {
            panic!("expected a 405");
        };
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().value("allow"), Some("GET"));
        assert_eq!(response.length_hint(), Some(0));

        let Err(response) = server.route(Method::Get, "/nope") else {
            panic!("expected a 404");
        };
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.length_hint(), Some(0));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let server = Server::builder().router(router()).bind("127.0.0.1:0").build().unwrap();
        let handle = server.start().await.unwrap();
        assert_ne!(handle.local_addr().port(), 0);

        handle.stop();
        handle.stop();
        handle.stopped().await;
        assert!(handle.is_stopped());
        handle.stop();
        handle.stopped().await;
    }
}
