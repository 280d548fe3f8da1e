//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body limit, trace)
//!     → registrar.rs (router built from the scan's registrations)
//!     → dispatch.rs (snapshot request, resolve client IP)
//!     → exchange.rs (global middleware → route middleware → handler, on the blocking pool)
//!     → ResponseDraft → Send to client
//! ```

pub mod dispatch;
pub mod exchange;
pub mod registrar;
pub mod request;
pub mod server;

pub use exchange::{RequestSnapshot, ResponseDraft};
pub use registrar::AxumRegistrar;
pub use request::{ClientIpPolicy, UuidRequestId, X_FORWARDED_FOR, X_REQUEST_ID};
pub use server::HttpServer;
