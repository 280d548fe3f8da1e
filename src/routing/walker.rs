//! Route tree traversal and registration.
//!
//! # Responsibilities
//! - Walk the scan root depth-first in file-name order
//! - Prune the compiled-artifact directory wherever it appears
//! - Load each source unit and register its handlers
//!
//! # Design Decisions
//! - Abort on first error: nothing after a failing file is registered
//! - The middleware resolver is consulted once per route file

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::loader::{ArtifactLoader, Compiler, LoadError, UnitPipeline, COMPILED_DIR};
use crate::observability::metrics;
use crate::routing::mapper::map_route_path;
use crate::routing::registrar::RouteRegistrar;
use crate::routing::{MiddlewareResolver, SOURCE_EXTENSION};

/// Source units under `root`, in walk order, lazily.
pub fn source_units(root: &Path) -> impl Iterator<Item = Result<PathBuf, LoadError>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == COMPILED_DIR))
        .filter_map(|entry| match entry {
            Ok(entry) => {
                let is_source = !entry.file_type().is_dir()
                    && entry.path().extension().is_some_and(|ext| ext == SOURCE_EXTENSION);
                is_source.then(|| Ok(entry.into_path()))
            }
            Err(source) => Some(Err(LoadError::Walk {
                path: source.path().map(Path::to_path_buf).unwrap_or_default(),
                source,
            })),
        })
}

/// Totals for one route walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Source units loaded.
    pub files: usize,
    /// (verb, path) registrations made.
    pub routes: usize,
}

/// Walks a route tree through a [`UnitPipeline`].
pub struct RouteWalker<'a, C, L> {
    pipeline: &'a UnitPipeline<C, L>,
    resolver: Option<&'a MiddlewareResolver>,
}

impl<'a, C: Compiler, L: ArtifactLoader> RouteWalker<'a, C, L> {
    pub fn new(pipeline: &'a UnitPipeline<C, L>) -> Self {
        Self {
            pipeline,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Option<&'a MiddlewareResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub async fn run<R: RouteRegistrar>(&self, scan_root: &Path, registrar: &mut R) -> Result<WalkSummary, LoadError> {
        let mut summary = WalkSummary::default();

        for source in source_units(scan_root) {
            let source = source?;
            let table = self.pipeline.load_unit(&source).await?;
            let route_path = map_route_path(scan_root, &source);
            let middleware = match self.resolver {
                Some(resolve) => resolve(&route_path),
                None => Vec::new(),
            };
            summary.files += 1;

            if table.is_empty() {
                tracing::debug!(source = %source.display(), "Unit defines no routes");
            }

            for (verb, handler) in table {
                tracing::info!(
                    verb = %verb,
                    path = %route_path,
                    middleware = middleware.len(),
                    "Registering route"
                );
                registrar.register_route(verb, &route_path, handler, &middleware);
                metrics::record_route_registered(verb.as_str());
                summary.routes += 1;
            }
        }

        Ok(summary)
    }
}
