use crate::sse::{EventStream, SseClient, SseEndpoint, SseMessage};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use switchyard_http::protocol::Request;
use tracing::debug;

/// Event-stream endpoints by path, so application code can broadcast to an endpoint by
/// name instead of holding on to it.
#[derive(Debug, Default)]
pub struct SseRegistry {
    endpoints: RwLock<HashMap<String, Arc<SseEndpoint>>>,
}

impl SseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The endpoint registered under `path`, created on first use.
    pub fn endpoint(&self, path: &str) -> Arc<SseEndpoint> {
        if let Some(endpoint) = self.endpoints.read().get(path) {
            return Arc::clone(endpoint);
        }

        let mut endpoints = self.endpoints.write();
        Arc::clone(endpoints.entry(path.to_string()).or_insert_with(|| SseEndpoint::new(path)))
    }

    pub fn get(&self, path: &str) -> Option<Arc<SseEndpoint>> {
        self.endpoints.read().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.endpoints.read().keys().cloned().collect()
    }

    pub fn on_connect(&self, path: &str, request: Request) -> EventStream {
        self.endpoint(path).connect(request)
    }

    pub fn on_disconnect(&self, path: &str, client_id: u64) -> bool {
        self.get(path).is_some_and(|endpoint| endpoint.disconnect(client_id))
    }

    /// Broadcasts to the endpoint at `path`; an unknown endpoint has no clients.
    pub fn broadcast<F>(&self, path: &str, message_fn: F) -> usize
    where
        F: FnMut(&SseClient) -> SseMessage,
    {
        match self.get(path) {
            Some(endpoint) => endpoint.broadcast(message_fn),
            None => {
                debug!(path, "broadcast to unknown sse endpoint");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_http::protocol::Method;

    #[test]
    fn test_endpoint_is_shared_per_path() {
        let registry = SseRegistry::new();
        let first = registry.endpoint("/events");
        let second = registry.endpoint("/events");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.get("/other").is_none());
        assert_eq!(registry.paths(), vec!["/events".to_string()]);
    }

    #[test]
    fn test_connect_broadcast_disconnect() {
        let registry = SseRegistry::new();
        assert_eq!(registry.broadcast("/events", |_| SseMessage::data("nobody")), 0);

        let stream = registry.on_connect("/events", Request::new(Method::Get, "/events"));
        assert_eq!(registry.broadcast("/events", |_| SseMessage::data("ping")), 1);

        assert!(registry.on_disconnect("/events", stream.client_id()));
        assert!(!registry.on_disconnect("/events", stream.client_id()));
        assert_eq!(registry.broadcast("/events", |_| SseMessage::data("ping")), 0);
    }
}
