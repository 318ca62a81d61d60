//! Body encoding for handlers.
//!
//! The server never looks inside a body. Handlers that exchange structured values pick a
//! [`MessageConverter`] to turn them into bytes and back; [`JsonConverter`] is the one
//! bundled here, and [`Json`] is the matching [`Responder`].

use crate::responder::Responder;
use bytes::{BufMut, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use switchyard_http::protocol::{HandlerError, Request, Response, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("can't serialize value: {reason}")]
    Serialize { reason: String },

    #[error("can't deserialize body: {reason}")]
    Deserialize { reason: String },
}

impl ConvertError {
    pub fn serialize<S: ToString>(str: S) -> Self {
        Self::Serialize { reason: str.to_string() }
    }

    pub fn deserialize<S: ToString>(str: S) -> Self {
        Self::Deserialize { reason: str.to_string() }
    }
}

/// A body that can't be decoded is the client's fault, one that can't be encoded is ours.
impl From<ConvertError> for HandlerError {
    fn from(e: ConvertError) -> Self {
        match e {
            ConvertError::Deserialize { .. } => HandlerError::bad_request(e),
            ConvertError::Serialize { .. } => HandlerError::internal(e),
        }
    }
}

pub trait MessageConverter: Send + Sync {
    /// The `Content-Type` of what [`MessageConverter::write`] produces.
    fn content_type(&self) -> &str;

    fn write<T, W>(&self, value: &T, sink: W) -> Result<(), ConvertError>
    where
        T: Serialize + ?Sized,
        W: io::Write;

    fn read<T>(&self, input: &str) -> Result<T, ConvertError>
    where
        T: DeserializeOwned;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl MessageConverter for JsonConverter {
    fn content_type(&self) -> &str {
        mime::APPLICATION_JSON.as_ref()
    }

    fn write<T, W>(&self, value: &T, sink: W) -> Result<(), ConvertError>
    where
        T: Serialize + ?Sized,
        W: io::Write,
    {
        serde_json::to_writer(sink, value).map_err(ConvertError::serialize)
    }

    fn read<T>(&self, input: &str) -> Result<T, ConvertError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(input).map_err(ConvertError::deserialize)
    }
}

/// Encodes `value` with `converter` into a response whose length hint is the encoded size.
pub fn converted_response<C, T>(converter: &C, status: StatusCode, value: &T) -> Result<Response, ConvertError>
where
    C: MessageConverter,
    T: Serialize + ?Sized,
{
    let mut writer = BytesMut::with_capacity(128).writer();
    converter.write(value, &mut writer)?;
    Ok(Response::bytes(status, converter.content_type(), writer.into_inner().freeze()))
}

/// Decodes the request body with `converter`. A body that isn't UTF-8 or doesn't decode is
/// a bad request.
pub fn read_body<C, T>(converter: &C, request: &Request) -> Result<T, HandlerError>
where
    C: MessageConverter,
    T: DeserializeOwned,
{
    let body = request.body_str().ok_or_else(|| HandlerError::bad_request("request body is not utf8"))?;
    Ok(converter.read(body)?)
}

/// A JSON response body.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> Responder for Json<T> {
    fn into_response(self) -> Result<Response, HandlerError> {
        Ok(converted_response(&JsonConverter, StatusCode::OK, &self.0)?)
    }
}
