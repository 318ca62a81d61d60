//! Conversions from handler return values into responses.

use bytes::Bytes;
use switchyard_http::protocol::{HandlerError, Response, StatusCode};

/// Anything a handler function can return.
///
/// Text becomes a `200 text/plain` response, `()` an empty `200`, and an `Err` takes the
/// usual handler error path (`400` or `500`).
pub trait Responder {
    fn into_response(self) -> Result<Response, HandlerError>;
}

impl Responder for Response {
    fn into_response(self) -> Result<Response, HandlerError> {
        Ok(self)
    }
}

impl Responder for String {
    fn into_response(self) -> Result<Response, HandlerError> {
        Ok(Response::text(StatusCode::OK, self))
    }
}

impl Responder for &'static str {
    fn into_response(self) -> Result<Response, HandlerError> {
        Ok(Response::text(StatusCode::OK, self))
    }
}

impl Responder for Bytes {
    fn into_response(self) -> Result<Response, HandlerError> {
        Ok(Response::bytes(StatusCode::OK, mime::APPLICATION_OCTET_STREAM.as_ref(), self))
    }
}

impl Responder for () {
    fn into_response(self) -> Result<Response, HandlerError> {
        Ok(Response::ok())
    }
}

impl Responder for StatusCode {
    fn into_response(self) -> Result<Response, HandlerError> {
        Ok(Response::new(self))
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn into_response(self) -> Result<Response, HandlerError> {
        let (status, responder) = self;
        responder.into_response().map(|response| response.with_status(status))
    }
}

impl<T, E> Responder for Result<T, E>
where
    T: Responder,
    E: Into<HandlerError>,
{
    fn into_response(self) -> Result<Response, HandlerError> {
        self.map_err(Into::into)?.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text() {
        let response = "hello".into_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().value("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(response.length_hint(), Some(5));
    }

    #[test]
    fn test_status_tuple() {
        let response = (StatusCode::CREATED, String::from("made")).into_response().unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.length_hint(), Some(4));

        let response = StatusCode::NO_CONTENT.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.length_hint(), Some(0));
    }

    #[test]
    fn test_result() {
        let ok: Result<&'static str, HandlerError> = Ok("fine");
        assert_eq!(ok.into_response().unwrap().status(), StatusCode::OK);

        let err: Result<(), std::io::Error> = Err(std::io::Error::other("disk on fire"));
        assert!(matches!(err.into_response(), Err(HandlerError::Internal { .. })));
    }
}
