//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;
use std::process::Command;

use axum::Router;
use dynroute::config::Config;
use dynroute::{HttpServer, Shutdown};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

/// Whether a working `rustc` is on the PATH.
#[allow(dead_code)]
pub fn rustc_available() -> bool {
    Command::new("rustc")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Copy the `demos/` tree into a fresh temporary working directory.
#[allow(dead_code)]
pub fn copy_demos() -> TempDir {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
    let dir = TempDir::new().unwrap();

    for entry in WalkDir::new(&source) {
        let entry = entry.unwrap();
        let relative = entry.path().strip_prefix(&source).unwrap();
        let target = dir.path().join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
    dir
}

/// Serve `routes` on an ephemeral port until the returned [`Shutdown`] fires.
#[allow(dead_code)]
pub async fn start_server(routes: Router) -> (SocketAddr, Shutdown, JoinHandle<std::io::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(Config::default(), routes);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
    (addr, shutdown, handle)
}
