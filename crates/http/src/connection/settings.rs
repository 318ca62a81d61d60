use crate::codec::DEFAULT_MAX_BODY_BYTES;
use crate::date::DateService;
use bytes::Bytes;

/// Per-server values every connection needs while writing a response.
#[derive(Debug)]
pub struct ConnectionSettings {
    /// Value of the `Server` header, left out when empty.
    pub server: Bytes,
    pub date: DateService,
    /// Requests announcing a larger `Content-Length` are answered with `413`.
    pub max_body_bytes: u64,
}

impl ConnectionSettings {
    pub fn new(server: impl Into<Bytes>, date: DateService) -> Self {
        Self { server: server.into(), date, max_body_bytes: DEFAULT_MAX_BODY_BYTES }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}
