use crate::handler::RequestHandler;
use crate::sse::SseEndpoint;
use async_trait::async_trait;
use std::sync::Arc;
use switchyard_http::protocol::{HandlerError, Header, Request, Response, ResponseBody, StatusCode};

/// Answers a request with an open event stream and registers it with the endpoint.
#[derive(Debug)]
pub struct SseHandler {
    endpoint: Arc<SseEndpoint>,
}

impl SseHandler {
    pub fn new(endpoint: Arc<SseEndpoint>) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl RequestHandler for SseHandler {
    async fn invoke(&self, request: Request) -> Result<Response, HandlerError> {
        let stream = self.endpoint.connect(request);
        Ok(Response::new(StatusCode::OK)
            .header(Header::from_static("Content-Type", "text/event-stream"))
            .header(Header::from_static("Cache-Control", "no-cache"))
            .with_body(ResponseBody::stream(stream)))
    }
}
