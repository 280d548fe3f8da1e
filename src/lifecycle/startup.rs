//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve the working directory, output root and scan roots
//! - Load global middleware, then walk the route tree
//! - Hand every registration to a [`RouteRegistrar`]
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing is served
//! - Middleware is loaded before routes, both through one pipeline
//! - Listeners start last (traffic only when every route is registered)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::abi;
use crate::config::Config;
use crate::loader::{
    ArtifactLoader, ArtifactStore, CompileCache, Compiler, DylibLoader, LoadError, Toolchain, UnitPipeline,
};
use crate::routing::{discover_middleware, MiddlewareResolver, RouteRegistrar, RouteWalker};

/// Totals for one boot scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub middleware: usize,
    pub files: usize,
    pub routes: usize,
    pub compiled: usize,
    pub reused: usize,
}

/// Boot sequence for one working directory.
pub struct Startup {
    config: Config,
    base_dir: PathBuf,
    resolver: Option<MiddlewareResolver>,
    cache: Arc<CompileCache>,
}

impl Startup {
    /// Rooted at the process working directory.
    pub fn new(config: Config) -> Result<Self, LoadError> {
        let base_dir = std::env::current_dir().map_err(LoadError::WorkingDir)?;
        Ok(Self::with_base_dir(config, base_dir))
    }

    pub fn with_base_dir(config: Config, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            base_dir: base_dir.into(),
            resolver: None,
            cache: Arc::new(CompileCache::new()),
        }
    }

    pub fn with_resolver(mut self, resolver: MiddlewareResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Share a compile cache with other scans.
    pub fn with_cache(mut self, cache: Arc<CompileCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.base_dir)
            .with_cache(self.cache.clone())
            .with_cold_start(self.config.cache.cold_start)
    }

    /// Scan with the configured toolchain and native loading.
    pub async fn load_into<R: RouteRegistrar>(&self, registrar: &mut R) -> Result<ScanSummary, LoadError> {
        let store = self.artifact_store();
        let compiler =
            Toolchain::from_config(&self.config.toolchain).with_abi(abi::guest_abi_path(store.output_root()));
        let pipeline = UnitPipeline::new(store, compiler, DylibLoader);
        self.scan(&pipeline, registrar).await
    }

    /// Scan with any compiler and loader.
    pub async fn scan<C, L, R>(&self, pipeline: &UnitPipeline<C, L>, registrar: &mut R) -> Result<ScanSummary, LoadError>
    where
        C: Compiler,
        L: ArtifactLoader,
        R: RouteRegistrar,
    {
        let abi_path = pipeline.store().prepare()?;
        tracing::debug!(
            output_root = %pipeline.store().output_root().display(),
            abi = %abi_path.display(),
            "Output directory ready"
        );

        let api_root = self.scan_root("API", &self.config.routes.api_dir, "api")?;
        let middleware_root = self.scan_root("middleware", &self.config.routes.middleware_dir, "middlewares")?;

        let middleware = discover_middleware(pipeline, &middleware_root).await?;
        let middleware_count = middleware.len();
        for handler in middleware {
            registrar.register_global_middleware(handler);
        }

        let walk = RouteWalker::new(pipeline)
            .with_resolver(self.resolver.as_ref())
            .run(&api_root, registrar)
            .await?;

        let summary = ScanSummary {
            middleware: middleware_count,
            files: walk.files,
            routes: walk.routes,
            compiled: pipeline.compiled(),
            reused: pipeline.reused(),
        };
        tracing::info!(
            api_root = %api_root.display(),
            middleware = summary.middleware,
            files = summary.files,
            routes = summary.routes,
            compiled = summary.compiled,
            reused = summary.reused,
            "Route scan complete"
        );
        Ok(summary)
    }

    /// Empty means `default`; relative paths hang off the base directory.
    fn scan_root(&self, kind: &'static str, configured: &str, default: &str) -> Result<PathBuf, LoadError> {
        let folder = if configured.is_empty() { default } else { configured };
        let path = Path::new(folder);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };

        if !path.is_dir() {
            return Err(LoadError::ScanRootMissing { kind, path });
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{RawContext, RouteHandler};
    use crate::loader::testing::{write_unit, FakeLoader, FakeToolchain};
    use crate::loader::COMPILED_DIR;
    use crate::routing::RouteTable;
    use tempfile::TempDir;

    fn pipeline(startup: &Startup) -> UnitPipeline<FakeToolchain, FakeLoader> {
        UnitPipeline::new(startup.artifact_store(), FakeToolchain::default(), FakeLoader)
    }

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_unit(&dir.path().join("api/users/main.rs"), "GET POST");
        write_unit(&dir.path().join("api/users/{id}.rs"), "GET");
        write_unit(&dir.path().join("middlewares/cors.rs"), "GET");
        write_unit(&dir.path().join("middlewares/log.rs"), "PUT");
        dir
    }

    extern "C" fn admin_only(_ctx: &mut RawContext) {}

    #[tokio::test]
    async fn test_scan_registers_middleware_then_routes() {
        let dir = tree();
        let startup = Startup::with_base_dir(Config::default(), dir.path());
        let pipeline = pipeline(&startup);
        let mut table = RouteTable::new();

        let summary = startup.scan(&pipeline, &mut table).await.unwrap();

        assert_eq!(
            summary,
            ScanSummary {
                middleware: 2,
                files: 2,
                routes: 3,
                compiled: 4,
                reused: 0,
            }
        );
        assert_eq!(table.global_middleware, 2);
        assert_eq!(table.paths(), vec!["/api/users", "/api/users", "/api/users/{id}"]);
        assert!(dir.path().join(COMPILED_DIR).join(abi::ABI_FILE_NAME).is_file());
    }

    #[tokio::test]
    async fn test_shared_cache_makes_second_scan_free() {
        let dir = tree();
        let cache = Arc::new(CompileCache::new());

        let first = Startup::with_base_dir(Config::default(), dir.path()).with_cache(cache.clone());
        first.scan(&pipeline(&first), &mut RouteTable::new()).await.unwrap();

        let second = Startup::with_base_dir(Config::default(), dir.path()).with_cache(cache);
        let summary = second.scan(&pipeline(&second), &mut RouteTable::new()).await.unwrap();

        assert_eq!(summary.compiled, 0);
        assert_eq!(summary.reused, 4);
    }

    #[tokio::test]
    async fn test_missing_api_folder_is_environment_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("middlewares")).unwrap();
        let startup = Startup::with_base_dir(Config::default(), dir.path());

        let err = startup.scan(&pipeline(&startup), &mut RouteTable::new()).await.unwrap_err();
        assert_eq!(err.category(), "environment");
        assert!(err.to_string().starts_with("API folder not found"));
    }

    #[tokio::test]
    async fn test_missing_middleware_folder_is_environment_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("api")).unwrap();
        let startup = Startup::with_base_dir(Config::default(), dir.path());

        let err = startup.scan(&pipeline(&startup), &mut RouteTable::new()).await.unwrap_err();
        assert!(matches!(err, LoadError::ScanRootMissing { kind: "middleware", .. }));
    }

    #[tokio::test]
    async fn test_configured_and_absolute_roots() {
        let dir = tree();
        let elsewhere = TempDir::new().unwrap();
        write_unit(&elsewhere.path().join("auth.rs"), "POST");

        let mut config = Config::default();
        config.routes.api_dir = String::new();
        config.routes.middleware_dir = elsewhere.path().display().to_string();
        let startup = Startup::with_base_dir(config, dir.path());

        let mut table = RouteTable::new();
        let summary = startup.scan(&pipeline(&startup), &mut table).await.unwrap();
        assert_eq!(summary.middleware, 1);
        assert_eq!(summary.routes, 3);
    }

    #[tokio::test]
    async fn test_resolver_scopes_middleware_per_route() {
        let dir = tree();
        let resolver: MiddlewareResolver = Arc::new(|path: &str| {
            if path.ends_with("{id}") {
                vec![RouteHandler::native(admin_only)]
            } else {
                Vec::new()
            }
        });
        let startup = Startup::with_base_dir(Config::default(), dir.path()).with_resolver(resolver);

        let mut table = RouteTable::new();
        startup.scan(&pipeline(&startup), &mut table).await.unwrap();

        let scoped: Vec<usize> = table.routes.iter().map(|r| r.middleware).collect();
        assert_eq!(scoped, vec![0, 0, 1]);
    }
}
