//! Route discovery subsystem.
//!
//! # Data Flow
//! ```text
//! scan root (api/)
//!     → walker.rs (depth-first, prune .dynroute, keep *.rs)
//!     → loader::UnitPipeline (compile if stale, load handlers)
//!     → mapper.rs (api/users/main.rs → /api/users)
//!     → MiddlewareResolver (optional, per route path)
//!     → registrar.rs (RouteRegistrar::register_route per verb)
//!
//! middleware root (middlewares/)
//!     → middleware.rs (same walk, handlers flattened)
//!     → RouteRegistrar::register_global_middleware
//! ```
//!
//! # Design Decisions
//! - Routes are fixed at boot; there is no rescan while serving
//! - Deterministic: file-name order within every directory
//! - First error ends the walk

use std::sync::Arc;

use crate::abi::RouteHandler;

pub mod mapper;
pub mod middleware;
pub mod registrar;
pub mod walker;

pub use mapper::{map_route_path, API_ROOT, INDEX_SEGMENT};
pub use middleware::discover_middleware;
pub use registrar::{RegisteredRoute, RouteRegistrar, RouteTable};
pub use walker::{source_units, RouteWalker, WalkSummary};

/// Extension of route and middleware source files.
pub const SOURCE_EXTENSION: &str = "rs";

/// Per-route middleware hook: route path in, ordered middleware out.
pub type MiddlewareResolver = Arc<dyn Fn(&str) -> Vec<RouteHandler> + Send + Sync>;
