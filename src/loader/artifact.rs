//! Artifact placement and staleness.
//!
//! # Responsibilities
//! - Map a source file to its compiled artifact under the output root
//! - Decide whether an artifact must be rebuilt
//! - Remember when each source was last compiled in this process
//!
//! # Design Decisions
//! - Filesystem timestamps are always re-read; the cache is an extra signal
//! - Artifacts are never deleted here; stale ones are overwritten in place

use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::abi;
use crate::loader::error::LoadError;

/// Reserved directory holding compiled artifacts. Pruned from every scan.
pub const COMPILED_DIR: &str = ".dynroute";

/// Extension appended to the source path to name its artifact.
pub const ARTIFACT_EXTENSION: &str = std::env::consts::DLL_EXTENSION;

/// How to treat an existing artifact that this process never compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColdStart {
    /// Rebuild every unit once per process.
    #[default]
    Recompile,
    /// Reuse the artifact when it is at least as new as its source.
    TrustTimestamps,
}

/// Last successful compile time per source path.
#[derive(Debug, Default)]
pub struct CompileCache {
    entries: DashMap<PathBuf, SystemTime>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_compiled(&self, source: &Path) -> Option<SystemTime> {
        self.entries.get(source).map(|entry| *entry)
    }

    pub fn record(&self, source: &Path, at: SystemTime) {
        self.entries.insert(source.to_path_buf(), at);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Resolves artifact paths and answers staleness questions.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
    output_root: PathBuf,
    cache: Arc<CompileCache>,
    cold_start: ColdStart,
}

impl ArtifactStore {
    /// Create a store rooted at `base_dir` (normally the working directory).
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let output_root = base_dir.join(COMPILED_DIR);
        Self {
            base_dir,
            output_root,
            cache: Arc::new(CompileCache::new()),
            cold_start: ColdStart::default(),
        }
    }

    /// Share a cache with other stores (e.g. across repeated scans).
    pub fn with_cache(mut self, cache: Arc<CompileCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_cold_start(mut self, cold_start: ColdStart) -> Self {
        self.cold_start = cold_start;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn cache(&self) -> &Arc<CompileCache> {
        &self.cache
    }

    /// Create the output root and install the guest ABI into it.
    pub fn prepare(&self) -> Result<PathBuf, LoadError> {
        fs::create_dir_all(&self.output_root).map_err(|source| LoadError::OutputDir {
            path: self.output_root.clone(),
            source,
        })?;
        abi::install_guest_abi(&self.output_root).map_err(|source| LoadError::OutputDir {
            path: self.output_root.clone(),
            source,
        })
    }

    /// Artifact path for `source`, creating its parent directories.
    pub fn resolve(&self, source: &Path) -> Result<PathBuf, LoadError> {
        let relative: PathBuf = match source.strip_prefix(&self.base_dir) {
            Ok(relative) => relative.to_path_buf(),
            // Outside the base dir: keep the normal components so the artifact
            // still lands inside the output root.
            Err(_) => source
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .collect(),
        };

        let mut name = OsString::from(relative.as_os_str());
        name.push(".");
        name.push(ARTIFACT_EXTENSION);
        let artifact = self.output_root.join(name);

        if let Some(parent) = artifact.parent() {
            fs::create_dir_all(parent).map_err(|source| LoadError::OutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        Ok(artifact)
    }

    /// Whether `artifact` must be rebuilt from `source`.
    pub fn is_stale(&self, source: &Path, artifact: &Path) -> bool {
        let Some(source_time) = modified(source) else {
            return true;
        };
        let Some(artifact_time) = modified(artifact) else {
            return true;
        };

        match self.cache.last_compiled(source) {
            Some(compiled_at) => source_time > compiled_at || source_time > artifact_time,
            None => match self.cold_start {
                ColdStart::Recompile => true,
                ColdStart::TrustTimestamps => source_time > artifact_time,
            },
        }
    }

    pub fn record_compiled(&self, source: &Path, at: SystemTime) {
        self.cache.record(source, at);
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &Path, at: SystemTime) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "x").unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(at)
            .unwrap();
    }

    #[test]
    fn test_resolve_is_deterministic_and_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let source = dir.path().join("api/users/main.rs");

        let artifact = store.resolve(&source).unwrap();
        let expected = dir
            .path()
            .join(COMPILED_DIR)
            .join(format!("api/users/main.rs.{}", ARTIFACT_EXTENSION));
        assert_eq!(artifact, expected);
        assert!(artifact.parent().unwrap().is_dir());

        // Idempotent.
        assert_eq!(store.resolve(&source).unwrap(), expected);
    }

    #[test]
    fn test_resolve_outside_base_dir_stays_in_output_root() {
        let base = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let store = ArtifactStore::new(base.path());

        let artifact = store.resolve(&elsewhere.path().join("api/a.rs")).unwrap();
        assert!(artifact.starts_with(store.output_root()));
        assert!(artifact.to_string_lossy().ends_with(&format!("a.rs.{}", ARTIFACT_EXTENSION)));
    }

    #[test]
    fn test_missing_artifact_is_stale() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let source = dir.path().join("api/a.rs");
        touch(&source, SystemTime::now());
        store.record_compiled(&source, SystemTime::now());

        let artifact = store.resolve(&source).unwrap();
        assert!(store.is_stale(&source, &artifact));
    }

    #[test]
    fn test_no_cache_entry_is_stale() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let now = SystemTime::now();
        let source = dir.path().join("api/a.rs");
        touch(&source, now - Duration::from_secs(60));
        let artifact = store.resolve(&source).unwrap();
        touch(&artifact, now);

        assert!(store.is_stale(&source, &artifact));
    }

    #[test]
    fn test_fresh_artifact_is_reused() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let now = SystemTime::now();
        let source = dir.path().join("api/a.rs");
        touch(&source, now - Duration::from_secs(60));
        let artifact = store.resolve(&source).unwrap();
        touch(&artifact, now - Duration::from_secs(30));
        store.record_compiled(&source, now - Duration::from_secs(30));

        assert!(!store.is_stale(&source, &artifact));
    }

    #[test]
    fn test_edited_source_is_stale() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let now = SystemTime::now();
        let source = dir.path().join("api/a.rs");
        let artifact = store.resolve(&source).unwrap();
        touch(&artifact, now - Duration::from_secs(30));
        store.record_compiled(&source, now - Duration::from_secs(30));

        touch(&source, now);
        assert!(store.is_stale(&source, &artifact));
    }

    #[test]
    fn test_artifact_older_than_source_is_stale_despite_cache() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let now = SystemTime::now();
        let source = dir.path().join("api/a.rs");
        touch(&source, now - Duration::from_secs(30));
        let artifact = store.resolve(&source).unwrap();
        touch(&artifact, now - Duration::from_secs(60));
        store.record_compiled(&source, now);

        assert!(store.is_stale(&source, &artifact));
    }

    #[test]
    fn test_trust_timestamps_on_cold_start() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).with_cold_start(ColdStart::TrustTimestamps);
        let now = SystemTime::now();
        let source = dir.path().join("api/a.rs");
        touch(&source, now - Duration::from_secs(60));
        let artifact = store.resolve(&source).unwrap();
        touch(&artifact, now);

        assert!(!store.is_stale(&source, &artifact));

        touch(&source, now + Duration::from_secs(60));
        assert!(store.is_stale(&source, &artifact));
    }

    #[test]
    fn test_shared_cache() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(CompileCache::new());
        let first = ArtifactStore::new(dir.path()).with_cache(cache.clone());
        let second = ArtifactStore::new(dir.path()).with_cache(cache.clone());

        first.record_compiled(Path::new("/src/a.rs"), SystemTime::now());
        assert!(second.cache().last_compiled(Path::new("/src/a.rs")).is_some());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_prepare_creates_output_root() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let abi_path = store.prepare().unwrap();
        assert!(store.output_root().is_dir());
        assert_eq!(abi_path, abi::guest_abi_path(store.output_root()));
        assert!(abi_path.is_file());
    }
}
