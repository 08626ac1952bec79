//! JSON responses and a JSON error renderer.

use std::error::Error as StdError;

use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use serde::Serialize;
use tracing::warn;

use crate::error::{error_body, status_code, ErrorClass};
use crate::render::{handling_with, log_error, ErrorHandler};
use crate::request::Request;
use crate::response::ResponseWriter;

#[derive(Serialize)]
struct Envelope<'a, T: ?Sized> {
    resp: &'a T,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    err: &'a str,
}

fn write_json(w: &mut dyn ResponseWriter, status: StatusCode, body: &[u8]) {
    let headers = w.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    w.write_header(status);
    if let Err(e) = w.write_all(body) {
        warn!(error = %e, "failed writing json body");
    }
}

/// Write `{"resp": value}` with status `200`.
///
/// Serialization failures are rendered by the installed error handler,
/// or by [`JsonErrorHandler`] when none is installed.
pub fn render<T: Serialize + ?Sized>(w: &mut dyn ResponseWriter, r: &Request, value: &T) {
    match serde_json::to_vec_pretty(&Envelope { resp: value }) {
        Ok(body) => write_json(w, StatusCode::OK, &body),
        Err(e) => {
            let err = ErrorClass::InternalServerError
                .new(format!("failed to encode response: {}", e));
            match handling_with(r.context()) {
                Some(handler) => handler.handle_error(w, r, &err),
                None => JsonErrorHandler.handle_error(w, r, &err),
            }
        }
    }
}

/// Renders errors as `{"err": message}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorHandler;

impl ErrorHandler for JsonErrorHandler {
    fn handle_error(
        &self,
        w: &mut dyn ResponseWriter,
        r: &Request,
        err: &(dyn StdError + Send + Sync + 'static),
    ) {
        let status = status_code(err, StatusCode::INTERNAL_SERVER_ERROR);
        log_error(r, status, err);

        let message = error_body(err, StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_vec_pretty(&ErrorBody { err: &message })
            .unwrap_or_else(|_| br#"{"err": "Internal Server Error"}"#.to_vec());
        write_json(w, status, &body);
    }
}
