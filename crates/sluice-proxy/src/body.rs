//! Response bodies and canned responses

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, PROXY_AUTHENTICATE};
use http::{Response, StatusCode};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use sluice_core::Error;

/// Body type produced by the proxy: streamed origin bodies and local responses
pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// Empty body
pub fn empty() -> ProxyBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

/// Body holding `chunk`
pub fn full<T: Into<Bytes>>(chunk: T) -> ProxyBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Plain text response
pub fn text_response<T: Into<Bytes>>(status: StatusCode, text: T) -> Response<ProxyBody> {
    let mut response = Response::new(full(text));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Response reporting `err` to the client, with the auth challenge for [`Error::AuthDenied`]
pub fn error_response(err: &Error) -> Response<ProxyBody> {
    let mut response = text_response(err.to_status_code(), err.to_string());
    if matches!(err, Error::AuthDenied) {
        response.headers_mut().insert(
            PROXY_AUTHENTICATE,
            HeaderValue::from_static(crate::auth::CHALLENGE),
        );
    }
    response
}
