use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{FutureExt, SinkExt, StreamExt};
use http_body_util::BodyExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::connection::ConnectionSettings;
use crate::handler::Handler;
use crate::protocol::{
    HandlerError, Headers, HttpError, Message, ParseError, PayloadItem, PayloadSize, Request, RequestItem, Response, ResponseBody,
    ResponseFrame, SendError, StatusCode,
};

/// One HTTP/1.1 exchange over a pair of byte streams.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    settings: Arc<ConnectionSettings>,
    read_closed: bool,
}

impl<R, W> fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection").field("settings", &self.settings).field("read_closed", &self.read_closed).finish_non_exhaustive()
    }
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, settings: Arc<ConnectionSettings>) -> Self {
        let decoder = RequestDecoder::with_max_body_bytes(settings.max_body_bytes);
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            settings,
            read_closed: false,
        }
    }

    /// Runs the exchange to completion and shuts the write half down.
    ///
    /// Routing misses, handler errors and handler panics all end up as responses; only
    /// protocol and transport failures are returned as errors, after a best-effort
    /// response for the former.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
    {
        let result = self.do_process(handler.as_ref()).await;

        if let Err(e) = self.framed_write.get_mut().shutdown().await {
            debug!(cause = %e, "shutdown connection error");
        }

        result
    }

    async fn do_process<H>(&mut self, handler: &H) -> Result<(), HttpError>
    where
        H: Handler,
    {
        let request_line = match self.next_item().await {
            Some(Ok(RequestItem::RequestLine(request_line))) => request_line,
            Some(Ok(_)) => return self.reject(ParseError::invalid_request_line("expect request line")).await,
            Some(Err(e)) => return self.reject(e).await,
            None => {
                debug!("peer closed before sending a request");
                return Ok(());
            }
        };

        let route = {
            let (path, _query) = request_line.split_target();
            handler.route(request_line.method, path)
        };

        let route = match route {
            Ok(route) => route,
            Err(response) => {
                debug!(method = %request_line.method, target = %request_line.target, status = %response.status(), "no route");
                self.drain_request().await;
                return self.send_response(response).await;
            }
        };

        let (headers, body) = match self.read_headers_and_body().await {
            Ok(headers_and_body) => headers_and_body,
            Err(e) => return self.reject(e).await,
        };

        let request = Request::from_parts(request_line, headers, body);
        let response = invoke(handler, route, request).await;

        self.send_response(response).await
    }

    async fn next_item(&mut self) -> Option<Result<RequestItem, ParseError>> {
        let item = self.framed_read.next().await;
        if item.is_none() {
            self.read_closed = true;
        }
        item
    }

    async fn read_headers_and_body(&mut self) -> Result<(Headers, Bytes), ParseError> {
        let mut headers = Headers::with_capacity(16);
        let mut body = BytesMut::new();

        loop {
            match self.next_item().await {
                Some(Ok(RequestItem::Header(header))) => headers.append(header),
                Some(Ok(RequestItem::HeadersEnd(PayloadSize::Length(length)))) => {
                    body.reserve(usize::try_from(length).unwrap_or_default());
                }
                Some(Ok(RequestItem::HeadersEnd(_))) | Some(Ok(RequestItem::Payload(PayloadItem::Eof))) | None => {
                    if self.framed_read.decoder().is_done() || self.read_closed {
                        return Ok((headers, body.freeze()));
                    }
                }
                Some(Ok(RequestItem::Payload(PayloadItem::Chunk(bytes)))) => body.extend_from_slice(&bytes),
                Some(Ok(RequestItem::RequestLine(_))) => return Err(ParseError::invalid_header("unexpected request line")),
                Some(Err(e)) => return Err(e),
            }
        }
    }

    /// Reads and discards the rest of a request that won't be handled.
    async fn drain_request(&mut self) {
        while !self.framed_read.decoder().is_done() {
            match self.next_item().await {
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(cause = %e, "error while draining an unrouted request");
                    return;
                }
                None => return,
            }
        }
    }

    /// Answers a request that could not be read. Transport errors get no response.
    async fn reject(&mut self, e: ParseError) -> Result<(), HttpError> {
        if !e.is_io() {
            let response = Response::text(status_for_parse_error(&e), e.to_string());
            if let Err(send_error) = self.send_response(response).await {
                debug!(cause = %send_error, "can't send error response");
            }
        }
        Err(e.into())
    }

    async fn send_response(&mut self, response: Response) -> Result<(), HttpError> {
        let (head, body) = response.into_parts();
        let payload_size = PayloadSize::from_hint(body.length_hint());

        let frame = ResponseFrame { head, server: self.settings.server.clone(), date: self.settings.date.http_date(), payload_size };

        // using send instead of feed: the head is flushed on its own before any body byte
        self.framed_write.send(Message::<_, Bytes>::Header(frame)).await?;

        match payload_size {
            PayloadSize::UntilClose => self.stream_body(body).await,
            PayloadSize::Length(_) | PayloadSize::Empty => self.write_body(body).await,
        }
    }

    async fn write_body(&mut self, mut body: ResponseBody) -> Result<(), HttpError> {
        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    let Ok(bytes) = frame.into_data() else {
                        continue;
                    };
                    self.framed_write.feed(Message::<ResponseFrame, Bytes>::Payload(PayloadItem::Chunk(bytes))).await?;
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                None => {
                    self.framed_write.feed(Message::<ResponseFrame, Bytes>::Payload(PayloadItem::Eof)).await?;
                    SinkExt::<Message<ResponseFrame, Bytes>>::flush(&mut self.framed_write).await?;
                    return Ok(());
                }
            }
        }
    }

    /// Writes a body of unknown length, flushing every chunk, until the body ends or the
    /// peer closes its side.
    async fn stream_body(&mut self, mut body: ResponseBody) -> Result<(), HttpError> {
        loop {
            select! {
                frame = body.frame() => match frame {
                    Some(Ok(frame)) => {
                        let Ok(bytes) = frame.into_data() else {
                            continue;
                        };
                        self.framed_write.send(Message::<ResponseFrame, Bytes>::Payload(PayloadItem::Chunk(bytes))).await?;
                    }
                    Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                    None => {
                        self.framed_write.send(Message::<ResponseFrame, Bytes>::Payload(PayloadItem::Eof)).await?;
                        return Ok(());
                    }
                },
                item = self.framed_read.next(), if !self.read_closed => match item {
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(cause = %e, "peer failed while streaming, stop streaming");
                        return Ok(());
                    }
                    None => {
                        debug!("peer closed while streaming, stop streaming");
                        return Ok(());
                    }
                },
            }
        }
    }
}

async fn invoke<H: Handler>(handler: &H, route: H::Route, request: Request) -> Response {
    let method = request.method();
    let path = request.path().to_string();

    match AssertUnwindSafe(handler.call(route, request)).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(HandlerError::BadRequest(message))) => {
            debug!(%method, %path, %message, "handler rejected the request");
            Response::text(StatusCode::BAD_REQUEST, message)
        }
        Ok(Err(HandlerError::Internal { source })) => {
            error!(%method, %path, cause = ?source, "handler failed");
            Response::text(StatusCode::INTERNAL_SERVER_ERROR, source.to_string())
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(%method, %path, %message, "handler panicked");
            Response::text(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        warn!("handler panicked with a non-string payload");
        "internal server error".to_string()
    }
}

fn status_for_parse_error(e: &ParseError) -> StatusCode {
    match e {
        ParseError::TooLargeHeader { .. } | ParseError::TooManyHeaders { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
        ParseError::TooLargeBody { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ParseError::UnsupportedTransferEncoding { .. } => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::BAD_REQUEST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::DateService;
    use crate::handler::make_handler;
    use crate::protocol::{Header, Method};
    use async_trait::async_trait;
    use indoc::indoc;
    use tokio::io::{AsyncReadExt, duplex};

    const DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

    fn settings() -> Arc<ConnectionSettings> {
        Arc::new(ConnectionSettings::new("switchyard/test", DateService::fixed(DATE)).with_max_body_bytes(16))
    }

    /// Writes `input` as the client, closes the client's write side and returns everything
    /// the server answered.
    async fn exchange<H: Handler + 'static>(input: &[u8], handler: H) -> (String, Result<(), HttpError>) {
        let (client, server) = duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (mut client_read, mut client_write) = tokio::io::split(client);

        client_write.write_all(input).await.unwrap();
        client_write.shutdown().await.unwrap();

        let connection = HttpConnection::new(server_read, server_write, settings());
        let result = connection.process(Arc::new(handler)).await;

        let mut output = Vec::new();
        client_read.read_to_end(&mut output).await.unwrap();
        (String::from_utf8(output).unwrap(), result)
    }

    /// Routes `/hello` for GET only, everything else is a 404.
    struct HelloRouter;

    #[async_trait]
    impl Handler for HelloRouter {
        type Route = ();

        fn route(&self, method: Method, path: &str) -> Result<(), Response> {
            match (method, path) {
                (Method::Get, "/hello") => Ok(()),
                (_, "/hello") => Err(Response::new(StatusCode::METHOD_NOT_ALLOWED)),
                _ => Err(Response::new(StatusCode::NOT_FOUND)),
            }
        }

        async fn call(&self, _route: (), _request: Request) -> Result<Response, HandlerError> {
            Ok(Response::ok().header(Header::from_static("Content-Type", "text/plain")).with_body("hello"))
        }
    }

    #[tokio::test]
    async fn test_hello_wire_format() {
        let (output, result) = exchange(b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n", HelloRouter).await;
        result.unwrap();
        assert_eq!(
            output,
            indoc! {"
                HTTP/1.1 200 OK\r
                Server: switchyard/test\r
                Date: Thu, 01 Jan 1970 00:00:00 GMT\r
                Content-Type: text/plain\r
                Content-Length: 5\r
                \r
                hello"}
        );
    }

    #[tokio::test]
    async fn test_route_miss_has_no_body() {
        let (output, result) = exchange(b"GET /missing HTTP/1.1\r\nHost: localhost\r\n\r\n", HelloRouter).await;
        result.unwrap();
        assert!(output.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(output.ends_with("Content-Length: 0\r\n\r\n"));

        let (output, _) = exchange(b"POST /hello HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc", HelloRouter).await;
        assert!(output.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    }

    #[tokio::test]
    async fn test_peer_closed_before_request() {
        let (output, result) = exchange(b"", HelloRouter).await;
        result.unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_method_gets_best_effort_400() {
        let (output, result) = exchange(b"BREW /pot HTTP/1.1\r\n\r\n", HelloRouter).await;
        assert!(matches!(result, Err(HttpError::RequestError { source: ParseError::InvalidMethod })));
        assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn test_request_body_and_headers_reach_handler() {
        let handler = make_handler(|request: Request| async move {
            let name = request.path_param("name").unwrap_or("-").to_string();
            let agent = request.headers().value("user-agent").unwrap_or_default().to_string();
            let body = request.body_str().unwrap_or_default().to_string();
            let query = request.query().get("q").unwrap_or_default().to_string();
            Ok::<_, HandlerError>(Response::text(StatusCode::OK, format!("{name}|{agent}|{body}|{query}")))
        });

        let input = b"POST /echo?q=a%2Fb HTTP/1.1\r\nUser-Agent: test\r\nContent-Length: 4\r\n\r\nping";
        let (output, result) = exchange(input, handler).await;
        result.unwrap();
        assert!(output.ends_with("\r\n\r\n-|test|ping|a/b"));
    }

    #[tokio::test]
    async fn test_body_over_limit_gets_413() {
        let handler = make_handler(|_request: Request| async move { Ok::<_, HandlerError>(Response::ok()) });
        let input = b"POST /echo HTTP/1.1\r\nContent-Length: 17\r\n\r\n01234567890123456";
        let (output, result) = exchange(input, handler).await;
        assert!(result.is_err());
        assert!(output.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[tokio::test]
    async fn test_handler_errors_become_responses() {
        let handler = make_handler(|_request: Request| async move { Err::<Response, _>(HandlerError::bad_request("id must be a number")) });
        let (output, result) = exchange(b"GET /bad HTTP/1.1\r\n\r\n", handler).await;
        result.unwrap();
        assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(output.ends_with("\r\n\r\nid must be a number"));

        let handler = make_handler(|_request: Request| async move { Err::<Response, _>(HandlerError::internal("database unavailable")) });
        let (output, result) = exchange(b"GET /boom HTTP/1.1\r\n\r\n", handler).await;
        result.unwrap();
        assert!(output.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(output.ends_with("\r\n\r\ndatabase unavailable"));
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_500() {
        let handler = make_handler(|request: Request| async move {
            assert_ne!(request.path(), "/panic", "handler exploded");
            Ok::<_, HandlerError>(Response::ok())
        });
        let (output, result) = exchange(b"GET /panic HTTP/1.1\r\n\r\n", handler).await;
        result.unwrap();
        assert!(output.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(output.contains("handler exploded"));
    }

    #[tokio::test]
    async fn test_chunked_request_gets_501() {
        let handler = make_handler(|_request: Request| async move { Ok::<_, HandlerError>(Response::ok()) });
        let input = b"POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n";
        let (output, result) = exchange(input, handler).await;
        assert!(result.is_err());
        assert!(output.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
    }
}
