//! Handler extraction from compiled units.
//!
//! # Responsibilities
//! - Open a compiled artifact
//! - Look up the fixed verb set by exported name
//! - Keep only exports that match the handler shape
//!
//! # Design Decisions
//! - Each lookup yields a tagged `SymbolLookup`; a wrong-shaped export is an
//!   explicit, logged branch that drops the verb instead of failing the load
//! - Libraries are never closed: every extracted handler holds an `Arc<Library>`

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use axum::routing::MethodFilter;
use libloading::Library;
use serde::{Deserialize, Serialize};

use crate::abi::{HandlerDescriptor, RawHandlerFn, RouteHandler, DYNROUTE_ABI_MAGIC, DYNROUTE_ABI_VERSION};
use crate::loader::error::BoxError;

/// HTTP verbs a unit may export, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Put, Verb::Post, Verb::Patch, Verb::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Post => "POST",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    /// Exported symbol name, NUL-terminated for the dynamic linker.
    pub fn symbol(&self) -> &'static [u8] {
        match self {
            Verb::Get => b"GET\0",
            Verb::Put => b"PUT\0",
            Verb::Post => b"POST\0",
            Verb::Patch => b"PATCH\0",
            Verb::Delete => b"DELETE\0",
        }
    }

    pub fn method_filter(&self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Put => MethodFilter::PUT,
            Verb::Post => MethodFilter::POST,
            Verb::Patch => MethodFilter::PATCH,
            Verb::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of probing one verb symbol.
#[derive(Clone, Copy)]
pub enum SymbolLookup {
    Found(RawHandlerFn),
    WrongShape,
    Absent,
}

impl fmt::Debug for SymbolLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolLookup::Found(call) => write!(f, "Found({:#x})", *call as usize),
            SymbolLookup::WrongShape => f.write_str("WrongShape"),
            SymbolLookup::Absent => f.write_str("Absent"),
        }
    }
}

/// Read a descriptor exported by a unit.
///
/// # Safety
/// `ptr` must be null or point to at least `size_of::<HandlerDescriptor>()`
/// readable bytes.
pub unsafe fn inspect_descriptor(ptr: *const HandlerDescriptor) -> SymbolLookup {
    if ptr.is_null() {
        return SymbolLookup::WrongShape;
    }
    // Check the markers before touching the function pointer field.
    let magic = std::ptr::addr_of!((*ptr).magic).read_unaligned();
    let version = std::ptr::addr_of!((*ptr).abi_version).read_unaligned();
    if magic != DYNROUTE_ABI_MAGIC || version != DYNROUTE_ABI_VERSION {
        return SymbolLookup::WrongShape;
    }
    SymbolLookup::Found(std::ptr::addr_of!((*ptr).call).read_unaligned())
}

/// Verb to handler mapping extracted from one unit.
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    handlers: BTreeMap<Verb, RouteHandler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, verb: Verb, handler: RouteHandler) {
        self.handlers.insert(verb, handler);
    }

    pub fn get(&self, verb: Verb) -> Option<&RouteHandler> {
        self.handlers.get(&verb)
    }

    pub fn verbs(&self) -> Vec<Verb> {
        self.handlers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handlers in verb order, dropping the verbs.
    pub fn into_handlers(self) -> impl Iterator<Item = RouteHandler> {
        self.handlers.into_values()
    }
}

impl IntoIterator for HandlerTable {
    type Item = (Verb, RouteHandler);
    type IntoIter = std::collections::btree_map::IntoIter<Verb, RouteHandler>;

    fn into_iter(self) -> Self::IntoIter {
        self.handlers.into_iter()
    }
}

/// Opens artifacts and extracts their handler tables.
pub trait ArtifactLoader {
    fn load(&self, artifact: &Path) -> Result<HandlerTable, BoxError>;
}

/// Loads native dynamic libraries produced by the toolchain.
#[derive(Debug, Clone, Copy, Default)]
pub struct DylibLoader;

impl ArtifactLoader for DylibLoader {
    fn load(&self, artifact: &Path) -> Result<HandlerTable, BoxError> {
        // Loading runs the library's initializers; compiled units are trusted.
        let library = Arc::new(unsafe { Library::new(artifact) }?);
        let mut table = HandlerTable::new();

        for verb in Verb::ALL {
            let lookup = match unsafe { library.get::<*const HandlerDescriptor>(verb.symbol()) } {
                Ok(symbol) => unsafe { inspect_descriptor(*symbol) },
                Err(_) => SymbolLookup::Absent,
            };

            match lookup {
                SymbolLookup::Found(call) => {
                    table.insert(verb, RouteHandler::from_unit(call, library.clone()));
                }
                SymbolLookup::WrongShape => {
                    tracing::warn!(
                        artifact = %artifact.display(),
                        verb = %verb,
                        "Export does not match the handler shape, ignoring"
                    );
                }
                SymbolLookup::Absent => {}
            }
        }

        tracing::debug!(
            artifact = %artifact.display(),
            verbs = ?table.verbs(),
            "Loaded unit"
        );
        Ok(table)
    }
}
