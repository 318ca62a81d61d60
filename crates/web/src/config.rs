use serde::Deserialize;
use std::time::Duration;
use switchyard_http::codec::DEFAULT_MAX_BODY_BYTES;
use switchyard_http::date::DEFAULT_UPDATE_INTERVAL;

/// Server settings. Every field has a default, so a partial document deserializes.
///
/// ```
/// use switchyard_web::ServerConfig;
///
/// let config: ServerConfig = serde_json::from_str(r#"{ "bind": "0.0.0.0:9000" }"#).unwrap();
/// assert_eq!(config.bind, "0.0.0.0:9000");
/// assert_eq!(config.max_body_bytes, 2 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on, anything `ToSocketAddrs` understands.
    pub bind: String,
    /// Value of the `Server` response header, left out when empty.
    pub server_name: String,
    /// Larger request bodies are answered with `413`.
    pub max_body_bytes: u64,
    /// How often the `Date` header value is refreshed, in milliseconds.
    pub date_refresh_millis: u64,
}

impl ServerConfig {
    pub fn date_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.date_refresh_millis.max(1))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            server_name: concat!("switchyard/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            date_refresh_millis: u64::try_from(DEFAULT_UPDATE_INTERVAL.as_millis()).unwrap_or(800),
        }
    }
}
