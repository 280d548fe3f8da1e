//! Compile-or-reuse, then load.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use crate::loader::artifact::ArtifactStore;
use crate::loader::compiler::Compiler;
use crate::loader::error::LoadError;
use crate::loader::symbols::{ArtifactLoader, HandlerTable};
use crate::observability::metrics;

/// Turns source units into handler tables.
///
/// Shared by the route walk and the middleware walk so both see the same
/// compile cache.
pub struct UnitPipeline<C, L> {
    store: ArtifactStore,
    compiler: C,
    loader: L,
    compiled: AtomicUsize,
    reused: AtomicUsize,
}

impl<C: Compiler, L: ArtifactLoader> UnitPipeline<C, L> {
    pub fn new(store: ArtifactStore, compiler: C, loader: L) -> Self {
        Self {
            store,
            compiler,
            loader,
            compiled: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Units compiled by this pipeline so far.
    pub fn compiled(&self) -> usize {
        self.compiled.load(Ordering::Relaxed)
    }

    /// Units served from an existing artifact so far.
    pub fn reused(&self) -> usize {
        self.reused.load(Ordering::Relaxed)
    }

    /// Produce the handler table for `source`, rebuilding it only when stale.
    pub async fn load_unit(&self, source: &Path) -> Result<HandlerTable, LoadError> {
        if !source.exists() {
            return Err(LoadError::SourceMissing(source.to_path_buf()));
        }

        let artifact = self.store.resolve(source)?;

        if self.store.is_stale(source, &artifact) {
            self.compiler
                .compile(source, &artifact)
                .await
                .map_err(|e| LoadError::Compile {
                    path: source.to_path_buf(),
                    source: e,
                })?;
            self.store.record_compiled(source, SystemTime::now());
            self.compiled.fetch_add(1, Ordering::Relaxed);
        } else {
            tracing::debug!(
                source = %source.display(),
                artifact = %artifact.display(),
                "Artifact is fresh, skipping compilation"
            );
            metrics::record_artifact_reuse();
            self.reused.fetch_add(1, Ordering::Relaxed);
        }

        self.loader.load(&artifact).map_err(|e| LoadError::Load {
            path: artifact.clone(),
            source: e,
        })
    }
}
