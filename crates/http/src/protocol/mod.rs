//! Core HTTP protocol types.
//!
//! - **Model**: [`Method`], [`Header`]/[`Headers`], [`QueryString`], [`Request`],
//!   [`Response`] with its [`ResponseBody`]
//! - **Messages** ([`message`]): what the codec produces and consumes
//!   - [`RequestItem`]: request line, header lines, end of headers, body chunks
//!   - [`Message`]/[`ResponseFrame`]: response head and body chunks handed to the encoder
//! - **Errors** ([`error`]): [`HttpError`], [`ParseError`], [`SendError`] and the
//!   [`HandlerError`] handlers use to signal failures
//!
//! Status codes are [`http::StatusCode`], re-exported here.

mod method;
pub use method::Method;

mod header;
pub use header::Header;
pub use header::Headers;

mod query;
pub use query::QueryString;

mod request;
pub use request::PathParams;
pub use request::Request;
pub use request::RequestLine;

mod body;
pub use body::ResponseBody;

mod response;
pub use response::Response;
pub use response::ResponseHead;

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;
pub use message::RequestItem;
pub use message::ResponseFrame;

mod error;
pub use error::HandlerError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub use http::StatusCode;
