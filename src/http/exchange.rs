//! Per-request state shared with guest handlers.
//!
//! A [`RequestSnapshot`] is the owned, read-only view of the request; a
//! [`ResponseDraft`] accumulates what the chain writes. Both live on the host
//! side. Guests only ever see a [`RawContext`] whose callbacks reach back
//! into them through an opaque pointer.

use std::ffi::c_void;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::abi::{RawContext, RawSlice, RouteHandler};

/// Owned copy of everything a handler may read.
#[derive(Debug, Clone, Default)]
pub struct RequestSnapshot {
    pub method: String,
    pub path: String,
    pub query: String,
    pub client_ip: String,
    pub headers: HeaderMap,
    pub params: Vec<(String, String)>,
    pub body: Bytes,
}

impl RequestSnapshot {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Response under construction. Starts as an empty `200 OK`.
#[derive(Debug)]
pub struct ResponseDraft {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Set when a middleware stops the chain.
    pub aborted: bool,
}

impl Default for ResponseDraft {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            aborted: false,
        }
    }
}

impl IntoResponse for ResponseDraft {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

struct Host<'a> {
    request: &'a RequestSnapshot,
    response: ResponseDraft,
}

/// Run one guest callable against `request`, threading `response` through it.
pub fn run_handler(handler: &RouteHandler, request: &RequestSnapshot, response: ResponseDraft) -> ResponseDraft {
    let mut host = Host { request, response };
    let mut ctx = RawContext {
        method: RawSlice::from_text(&request.method),
        path: RawSlice::from_text(&request.path),
        query: RawSlice::from_text(&request.query),
        client_ip: RawSlice::from_text(&request.client_ip),
        body: RawSlice::from_bytes(&request.body),
        host: &mut host as *mut Host<'_> as *mut c_void,
        header: host_header,
        param: host_param,
        set_status: host_set_status,
        set_header: host_set_header,
        write: host_write,
        abort: host_abort,
    };
    handler.invoke(&mut ctx);
    host.response
}

// Callbacks. `host` is always the `Host` built in `run_handler` and is only
// touched from the thread running the guest.

unsafe extern "C" fn host_header(host: *mut c_void, name: RawSlice) -> RawSlice {
    let host = &*(host as *const Host<'_>);
    match host.request.headers.get(name.as_str()) {
        Some(value) => RawSlice::from_bytes(value.as_bytes()),
        None => RawSlice::EMPTY,
    }
}

unsafe extern "C" fn host_param(host: *mut c_void, name: RawSlice) -> RawSlice {
    let host = &*(host as *const Host<'_>);
    match host.request.param(name.as_str()) {
        Some(value) => RawSlice::from_text(value),
        None => RawSlice::EMPTY,
    }
}

unsafe extern "C" fn host_set_status(host: *mut c_void, status: u16) {
    let host = &mut *(host as *mut Host<'_>);
    match StatusCode::from_u16(status) {
        Ok(status) => host.response.status = status,
        Err(_) => tracing::warn!(status, "Handler set an invalid status code"),
    }
}

unsafe extern "C" fn host_set_header(host: *mut c_void, name: RawSlice, value: RawSlice) {
    let host = &mut *(host as *mut Host<'_>);
    let parsed = (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_bytes(value.as_bytes()),
    );
    match parsed {
        (Ok(name), Ok(value)) => {
            host.response.headers.insert(name, value);
        }
        _ => tracing::warn!(name = name.as_str(), "Handler set an invalid header"),
    }
}

unsafe extern "C" fn host_write(host: *mut c_void, bytes: RawSlice) {
    let host = &mut *(host as *mut Host<'_>);
    host.response.body.extend_from_slice(bytes.as_bytes());
}

unsafe extern "C" fn host_abort(host: *mut c_void) {
    let host = &mut *(host as *mut Host<'_>);
    host.response.aborted = true;
}
