//! Middleware discovery.

use std::path::Path;

use crate::abi::RouteHandler;
use crate::loader::{ArtifactLoader, Compiler, LoadError, UnitPipeline};
use crate::routing::walker::source_units;

/// Compile and load every unit under `root` and flatten their handlers.
///
/// Order is walk order, then verb order within a unit. The verb a handler
/// was exported under carries no meaning here.
pub async fn discover_middleware<C: Compiler, L: ArtifactLoader>(
    pipeline: &UnitPipeline<C, L>,
    root: &Path,
) -> Result<Vec<RouteHandler>, LoadError> {
    let mut chain = Vec::new();

    for source in source_units(root) {
        let source = source?;
        let table = pipeline.load_unit(&source).await?;
        tracing::info!(
            source = %source.display(),
            handlers = table.len(),
            "Loaded middleware"
        );
        chain.extend(table.into_handlers());
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::testing::{handler_for, write_unit, FakeLoader, FakeToolchain};
    use crate::loader::{ArtifactStore, Verb, COMPILED_DIR};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_flattens_in_walk_then_verb_order() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("middlewares");
        write_unit(&root.join("a_logging.rs"), "PATCH");
        write_unit(&root.join("b_auth.rs"), "GET");
        write_unit(&root.join("c/cors.rs"), "DELETE POST");
        write_unit(&root.join(COMPILED_DIR).join("stale.rs"), "PUT");

        let pipeline = UnitPipeline::new(ArtifactStore::new(dir.path()), FakeToolchain::default(), FakeLoader);
        let chain = discover_middleware(&pipeline, &root).await.unwrap();

        let addresses: Vec<usize> = chain.iter().map(RouteHandler::address).collect();
        let expected: Vec<usize> = [Verb::Patch, Verb::Get, Verb::Post, Verb::Delete]
            .into_iter()
            .map(|verb| handler_for(verb) as usize)
            .collect();
        assert_eq!(addresses, expected);
    }

    #[tokio::test]
    async fn test_compile_failure_aborts_discovery() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("middlewares");
        write_unit(&root.join("broken.rs"), "GET");

        let pipeline = UnitPipeline::new(ArtifactStore::new(dir.path()), FakeToolchain::default(), FakeLoader);
        let err = discover_middleware(&pipeline, &root).await.unwrap_err();
        assert_eq!(err.category(), "compile");
    }

    #[tokio::test]
    async fn test_empty_folder_yields_no_middleware() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("middlewares");
        std::fs::create_dir_all(&root).unwrap();

        let pipeline = UnitPipeline::new(ArtifactStore::new(dir.path()), FakeToolchain::default(), FakeLoader);
        assert!(discover_middleware(&pipeline, &root).await.unwrap().is_empty());
    }
}
