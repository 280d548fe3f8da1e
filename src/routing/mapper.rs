//! Source location to URL path.
//!
//! # Design Decisions
//! - Pure function of (scan root, source path); no filesystem access
//! - A trailing `main` segment is the index route of its directory
//! - Segments are not escaped, so `{id}.rs` becomes a path parameter

use std::path::{Component, Path};

use crate::routing::SOURCE_EXTENSION;

/// Prefix of every route path.
pub const API_ROOT: &str = "/api";

/// File stem that maps to its parent directory.
pub const INDEX_SEGMENT: &str = "main";

/// Derive the route path for `source` found under `scan_root`.
pub fn map_route_path(scan_root: &Path, source: &Path) -> String {
    let relative = source.strip_prefix(scan_root).unwrap_or(source);

    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(last) = segments.last_mut() {
        if let Some(stem) = last.strip_suffix(&format!(".{SOURCE_EXTENSION}")) {
            *last = stem.to_string();
        }
    }

    if segments.last().is_some_and(|s| s == INDEX_SEGMENT) {
        segments.pop();
    }

    if segments.is_empty() {
        API_ROOT.to_string()
    } else {
        format!("{}/{}", API_ROOT, segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_collapse() {
        let root = Path::new("/srv/app/api");
        assert_eq!(map_route_path(root, &root.join("a/b/main.rs")), "/api/a/b");
        assert_eq!(map_route_path(root, &root.join("a/b/list.rs")), "/api/a/b/list");
    }

    #[test]
    fn test_root_level_files() {
        let root = Path::new("/srv/app/api");
        assert_eq!(map_route_path(root, &root.join("main.rs")), "/api");
        assert_eq!(map_route_path(root, &root.join("health.rs")), "/api/health");
    }

    #[test]
    fn test_main_only_collapses_as_last_segment() {
        let root = Path::new("/srv/app/api");
        assert_eq!(map_route_path(root, &root.join("main/users.rs")), "/api/main/users");
        assert_eq!(map_route_path(root, &root.join("domain.rs")), "/api/domain");
    }

    #[test]
    fn test_only_final_extension_is_stripped() {
        let root = Path::new("api");
        assert_eq!(map_route_path(root, &root.join("v1.2/report.csv.rs")), "/api/v1.2/report.csv");
    }

    #[test]
    fn test_segments_are_not_escaped() {
        let root = Path::new("api");
        assert_eq!(map_route_path(root, &root.join("users/{id}.rs")), "/api/users/{id}");
        assert_eq!(map_route_path(root, &root.join("files/a b.rs")), "/api/files/a b");
    }
}
