//! Convention-based HTTP route loader.
//!
//! Every `.rs` file under the API folder is one route. Files are compiled to
//! native libraries on demand, their `GET`/`PUT`/`POST`/`PATCH`/`DELETE`
//! handlers are loaded by name, and the URL comes from the file's place in
//! the tree. Files under the middleware folder are loaded the same way and
//! applied to every route.

pub mod abi;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod loader;
pub mod observability;
pub mod routing;

pub use abi::RouteHandler;
pub use config::Config;
pub use http::{AxumRegistrar, HttpServer};
pub use lifecycle::{ScanSummary, Shutdown, Startup};
pub use loader::{CompileCache, LoadError, Verb};
pub use routing::{MiddlewareResolver, RouteRegistrar, RouteTable};
