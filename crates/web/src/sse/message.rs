use bytes::Bytes;
use std::fmt::Write;
use std::time::Duration;

/// One server-sent event.
///
/// Encoded as, in this order and each only when set: `: comment` lines, `event:`, `id:`, one
/// `data:` line per line of the payload, `retry:` in milliseconds, then a blank line.
///
/// ```
/// use switchyard_web::sse::SseMessage;
///
/// let message = SseMessage::data("ping").event("tick").id("7");
/// assert_eq!(message.encode(), "event: tick\nid: 7\ndata: ping\n\n");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseMessage {
    comment: Option<String>,
    event: Option<String>,
    id: Option<String>,
    data: Option<String>,
    retry: Option<Duration>,
}

impl SseMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(data: impl Into<String>) -> Self {
        Self::new().with_data(data)
    }

    /// A comment-only message, ignored by clients. Useful as a keep-alive.
    pub fn comment(comment: impl Into<String>) -> Self {
        Self { comment: Some(comment.into()), ..Self::default() }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn retry(mut self, retry: Duration) -> Self {
        self.retry = Some(retry);
        self
    }

    /// The wire frame. Lines end with a bare `\n` rather than `\r\n`, which every
    /// `EventSource` accepts.
    pub fn encode(&self) -> Bytes {
        let mut frame = String::with_capacity(self.data.as_ref().map_or(0, String::len) + 32);

        if let Some(comment) = &self.comment {
            for line in lines(comment) {
                let _ = writeln!(frame, ": {line}");
            }
        }
        if let Some(event) = &self.event {
            let _ = writeln!(frame, "event: {}", single_line(event));
        }
        if let Some(id) = &self.id {
            let _ = writeln!(frame, "id: {}", single_line(id));
        }
        if let Some(data) = &self.data {
            for line in lines(data) {
                let _ = writeln!(frame, "data: {line}");
            }
        }
        if let Some(retry) = self.retry {
            let _ = writeln!(frame, "retry: {}", retry.as_millis());
        }

        frame.push('\n');
        Bytes::from(frame)
    }
}

fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
}

// event names and ids can't span lines, a line break would start a new field
fn single_line(text: &str) -> &str {
    text.split(['\r', '\n']).next().unwrap_or_default()
}
