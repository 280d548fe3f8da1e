//! Dynamic compilation cache and symbol resolution.
//!
//! # Data Flow
//! ```text
//! source unit (api/users/main.rs)
//!     → artifact.rs (resolve .dynroute/api/users/main.rs.so, staleness check)
//!     → compiler.rs (rustc --crate-type cdylib, only when stale)
//!     → artifact.rs (record compile time)
//!     → symbols.rs (dlopen, look up GET/PUT/POST/PATCH/DELETE)
//!     → HandlerTable
//! ```
//!
//! # Design Decisions
//! - Staleness is re-derived from filesystem timestamps on every load
//! - The compile cache is an explicit object, shared through `Arc`
//! - Every failure here is fatal to the scan; wrong-shaped exports are not failures

pub mod artifact;
pub mod compiler;
pub mod error;
pub mod pipeline;
pub mod symbols;

#[cfg(test)]
pub(crate) mod testing;

pub use artifact::{ArtifactStore, ColdStart, CompileCache, COMPILED_DIR};
pub use compiler::{crate_name_for, Compiler, Toolchain};
pub use error::{BoxError, CompileError, LoadError};
pub use pipeline::UnitPipeline;
pub use symbols::{ArtifactLoader, DylibLoader, HandlerTable, SymbolLookup, Verb};
