//! Request dispatch into a guest chain.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{ConnectInfo, RawPathParams};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::abi::RouteHandler;
use crate::http::exchange::{run_handler, RequestSnapshot, ResponseDraft};
use crate::http::request::ClientIpPolicy;
use crate::loader::Verb;
use crate::observability::metrics;

/// Everything needed to answer one (verb, path).
pub struct Endpoint {
    pub verb: Verb,
    pub handler: RouteHandler,
    /// Global middleware first, then the route's own.
    pub chain: Vec<RouteHandler>,
    pub policy: Arc<ClientIpPolicy>,
}

impl Endpoint {
    /// Middleware in order, stopping at the first abort, then the handler.
    pub fn execute(&self, request: &RequestSnapshot) -> ResponseDraft {
        let mut draft = ResponseDraft::default();
        for (position, middleware) in self.chain.iter().enumerate() {
            draft = run_handler(middleware, request, draft);
            if draft.aborted {
                tracing::debug!(
                    verb = %self.verb,
                    path = %request.path,
                    position,
                    status = draft.status.as_u16(),
                    "Middleware aborted the chain"
                );
                return draft;
            }
        }
        run_handler(&self.handler, request, draft)
    }

    fn snapshot(&self, params: Vec<(String, String)>, parts: Parts, body: Bytes) -> RequestSnapshot {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let client_ip = self
            .policy
            .resolve(peer, &parts.headers)
            .map(|ip| ip.to_string())
            .unwrap_or_default();

        RequestSnapshot {
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().unwrap_or_default().to_string(),
            client_ip,
            headers: parts.headers,
            params,
            body,
        }
    }
}

/// Axum-facing entry point for a registered endpoint.
pub async fn dispatch(
    endpoint: Arc<Endpoint>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    parts: Parts,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let params = match params {
        Ok(params) => params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        Err(_) => Vec::new(),
    };
    let request = endpoint.snapshot(params, parts, body);
    let verb = endpoint.verb;

    let outcome = tokio::task::spawn_blocking(move || endpoint.execute(&request)).await;

    let response = match outcome {
        Ok(draft) => draft.into_response(),
        Err(e) => {
            tracing::error!(verb = %verb, error = %e, "Handler task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };

    metrics::record_request(verb.as_str(), response.status().as_u16(), started);
    response
}
