//! The server-side half of registration.

use serde::Serialize;

use crate::abi::RouteHandler;
use crate::loader::Verb;

/// Receives the routes and middleware discovered by a scan.
///
/// Implemented by the axum registrar for serving and by [`RouteTable`] for
/// listing. Duplicate (verb, path) pairs are passed through unchanged; what
/// they mean is up to the implementation.
pub trait RouteRegistrar {
    fn register_route(&mut self, verb: Verb, path: &str, handler: RouteHandler, middleware: &[RouteHandler]);

    fn register_global_middleware(&mut self, middleware: RouteHandler);
}

/// One registration as seen by a [`RouteTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredRoute {
    pub verb: Verb,
    pub path: String,
    pub middleware: usize,
}

/// Registrar that only records what it is given.
#[derive(Debug, Default, Serialize)]
pub struct RouteTable {
    pub routes: Vec<RegisteredRoute>,
    pub global_middleware: usize,
    #[serde(skip)]
    handlers: Vec<RouteHandler>,
    #[serde(skip)]
    globals: Vec<RouteHandler>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers in registration order, parallel to `routes`.
    pub fn handlers(&self) -> &[RouteHandler] {
        &self.handlers
    }

    pub fn global_handlers(&self) -> &[RouteHandler] {
        &self.globals
    }

    pub fn paths(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.path.as_str()).collect()
    }
}

impl RouteRegistrar for RouteTable {
    fn register_route(&mut self, verb: Verb, path: &str, handler: RouteHandler, middleware: &[RouteHandler]) {
        self.routes.push(RegisteredRoute {
            verb,
            path: path.to_string(),
            middleware: middleware.len(),
        });
        self.handlers.push(handler);
    }

    fn register_global_middleware(&mut self, middleware: RouteHandler) {
        self.global_middleware += 1;
        self.globals.push(middleware);
    }
}
