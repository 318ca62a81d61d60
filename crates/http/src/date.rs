//! HTTP date header value management service.
//!
//! Formatting an RFC 7231 date on every response is wasted work when the value only
//! changes once a second. [`DateService`] keeps the formatted value in an [`ArcSwap`] and a
//! background task refreshes it, so connections only clone a [`Bytes`].

use arc_swap::ArcSwap;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default refresh period of the shared date value.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(800);

pub struct DateService {
    current: Arc<ArcSwap<Bytes>>,
    handle: Option<JoinHandle<()>>,
}

impl DateService {
    /// Starts the background refresh task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime, like [`tokio::spawn`].
    pub fn start(update_interval: Duration) -> Self {
        let current = Arc::new(ArcSwap::from_pointee(format_now()));
        let current_arc = Arc::clone(&current);

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(update_interval).await;
                current_arc.store(Arc::new(format_now()));
            }
        });

        Self { current, handle: Some(handle) }
    }

    /// A service that always reports the same value, mostly useful in tests.
    pub fn fixed(value: impl Into<Bytes>) -> Self {
        Self { current: Arc::new(ArcSwap::from_pointee(value.into())), handle: None }
    }

    /// The current `Date` header value.
    pub fn http_date(&self) -> Bytes {
        self.current.load().as_ref().clone()
    }
}

impl fmt::Debug for DateService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DateService").field("current", &self.http_date()).finish()
    }
}

/// Stops the refresh task together with the service.
impl Drop for DateService {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn format_now() -> Bytes {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    Bytes::from_owner(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_date_value_looks_like_imf_fixdate() {
        let service = DateService::start(DEFAULT_UPDATE_INTERVAL);
        let date = service.http_date();
        let date = std::str::from_utf8(&date).unwrap();
        // e.g. "Sun, 06 Nov 1994 08:49:37 GMT"
        assert!(date.trim_end().ends_with("GMT"));
        assert!(!date.starts_with("Date"));
    }

    #[test]
    fn test_fixed() {
        let service = DateService::fixed("Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(service.http_date(), Bytes::from_static(b"Thu, 01 Jan 1970 00:00:00 GMT"));
    }
}
