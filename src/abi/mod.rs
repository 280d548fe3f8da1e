//! Host/guest calling convention for compiled route units.
//!
//! # Data Flow
//! ```text
//! route file (api/users/main.rs)
//!     → include!(env!("DYNROUTE_ABI"))   (types.rs, installed under .dynroute/)
//!     → export_handler!(GET => list)     (#[no_mangle] static HandlerDescriptor)
//!     → rustc --crate-type cdylib
//!
//! host
//!     → loader::symbols looks up GET/PUT/POST/PATCH/DELETE
//!     → RouteHandler (fn pointer + Arc<Library>)
//!     → http::exchange builds a RawContext per request
//! ```
//!
//! # Design Decisions
//! - Rust has no stable ABI, so everything crossing the boundary is `#[repr(C)]`
//! - Verbs are exported as data (a descriptor with a magic number and version),
//!   which lets the loader tell a wrong-shaped export apart from a handler
//! - The guest never frees host memory; responses are built through callbacks

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;

mod types;

pub use types::*;

/// Environment variable the toolchain sets to the installed ABI file.
pub const ABI_ENV: &str = "DYNROUTE_ABI";

/// File name of the ABI source inside the output root.
pub const ABI_FILE_NAME: &str = "dynroute_abi.rs";

/// Source text route files include.
pub const GUEST_SOURCE: &str = include_str!("types.rs");

/// Where the guest ABI lives for a given output root.
pub fn guest_abi_path(output_root: &Path) -> PathBuf {
    output_root.join(ABI_FILE_NAME)
}

/// Write the guest ABI file, leaving it untouched when already current.
pub fn install_guest_abi(output_root: &Path) -> io::Result<PathBuf> {
    let path = guest_abi_path(output_root);
    let current = fs::read_to_string(&path).ok();
    if current.as_deref() != Some(GUEST_SOURCE) {
        fs::write(&path, GUEST_SOURCE)?;
        tracing::debug!(path = %path.display(), "Installed guest ABI");
    }
    Ok(path)
}

/// A callable handler or middleware.
///
/// Handlers extracted from a compiled unit hold the library open; it is never
/// unloaded while any clone is alive, and registered routes live for the
/// whole process.
#[derive(Clone)]
pub struct RouteHandler {
    call: RawHandlerFn,
    unit: Option<Arc<Library>>,
}

impl RouteHandler {
    /// A handler linked into the host binary.
    pub fn native(call: RawHandlerFn) -> Self {
        Self { call, unit: None }
    }

    pub(crate) fn from_unit(call: RawHandlerFn, unit: Arc<Library>) -> Self {
        Self {
            call,
            unit: Some(unit),
        }
    }

    pub fn invoke(&self, ctx: &mut RawContext) {
        (self.call)(ctx)
    }

    /// Entry point address, stable for the process lifetime.
    pub fn address(&self) -> usize {
        self.call as usize
    }

    pub fn is_loaded(&self) -> bool {
        self.unit.is_some()
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandler")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
