//! Route registration onto an axum [`Router`].

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::RawPathParams;
use axum::http::request::Parts;
use axum::routing::{on, MethodRouter};
use axum::Router;

use crate::abi::RouteHandler;
use crate::http::dispatch::{dispatch, Endpoint};
use crate::http::request::ClientIpPolicy;
use crate::loader::Verb;
use crate::routing::RouteRegistrar;

struct Registration {
    handler: RouteHandler,
    middleware: Vec<RouteHandler>,
}

/// Collects registrations and turns them into a router.
///
/// Global middleware applies to every route regardless of registration
/// order. Registering the same (verb, path) twice keeps the later one.
/// Segments such as `:id` or `*rest` are matched literally.
pub struct AxumRegistrar {
    policy: Arc<ClientIpPolicy>,
    routes: BTreeMap<String, BTreeMap<Verb, Registration>>,
    global: Vec<RouteHandler>,
}

impl AxumRegistrar {
    pub fn new(policy: ClientIpPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            routes: BTreeMap::new(),
            global: Vec::new(),
        }
    }

    /// Distinct (verb, path) pairs currently registered.
    pub fn route_count(&self) -> usize {
        self.routes.values().map(BTreeMap::len).sum()
    }

    pub fn into_router(self) -> Router {
        let Self { policy, routes, global } = self;
        let mut router = Router::new().without_v07_checks();

        for (path, verbs) in routes {
            let mut methods: Option<MethodRouter> = None;

            for (verb, registration) in verbs {
                let endpoint = Arc::new(Endpoint {
                    verb,
                    handler: registration.handler,
                    chain: global.iter().cloned().chain(registration.middleware).collect(),
                    policy: policy.clone(),
                });
                let route = on(
                    verb.method_filter(),
                    move |params: Result<RawPathParams, RawPathParamsRejection>, parts: Parts, body: Bytes| {
                        dispatch(endpoint.clone(), params, parts, body)
                    },
                );
                methods = Some(match methods {
                    Some(existing) => existing.merge(route),
                    None => route,
                });
            }

            if let Some(methods) = methods {
                router = router.route(&path, methods);
            }
        }

        router
    }
}

impl RouteRegistrar for AxumRegistrar {
    fn register_route(&mut self, verb: Verb, path: &str, handler: RouteHandler, middleware: &[RouteHandler]) {
        let registration = Registration {
            handler,
            middleware: middleware.to_vec(),
        };
        let previous = self
            .routes
            .entry(path.to_string())
            .or_default()
            .insert(verb, registration);

        if previous.is_some() {
            tracing::warn!(verb = %verb, path = %path, "Route registered twice, keeping the later handler");
        }
    }

    fn register_global_middleware(&mut self, middleware: RouteHandler) {
        self.global.push(middleware);
    }
}
