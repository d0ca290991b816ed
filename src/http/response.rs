use bytes::Bytes;
use http_body_util::Full;
use hyper::{StatusCode, header};

use super::Response;


pub(crate) fn bad_request(msg: &str) -> Response {
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header(header::CONTENT_TYPE, "text/plain; charset=UTF-8")
        .body(Full::new(Bytes::from(format!("Bad request: {msg}"))))
        .unwrap()
}

pub(crate) fn not_found() -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/plain; charset=UTF-8")
        .body(Full::new(Bytes::from_static(b"404 Not found")))
        .unwrap()
}

pub(crate) fn method_not_allowed() -> Response {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(header::CONTENT_TYPE, "text/plain; charset=UTF-8")
        .body(Full::new(Bytes::from_static(b"405 Method not allowed")))
        .unwrap()
}

pub(crate) fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(Full::new(Bytes::from_static(b"Internal server error")))
        .unwrap()
}
