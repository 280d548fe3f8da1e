//! Toolchain invocation.
//!
//! # Responsibilities
//! - Turn one source file into one loadable artifact
//! - Surface compiler diagnostics verbatim
//! - Bound every invocation with a timeout
//!
//! # Design Decisions
//! - No retries: a failed build fails the boot
//! - Partial output left by a failed build is not cleaned up
//! - The child is killed when the timeout fires

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::abi::ABI_ENV;
use crate::config::ToolchainConfig;
use crate::loader::error::CompileError;
use crate::observability::metrics;

/// Builds a single artifact from a single source file.
pub trait Compiler {
    fn compile(
        &self,
        source: &Path,
        artifact: &Path,
    ) -> impl Future<Output = Result<(), CompileError>> + Send;
}

/// External compiler process (`rustc` by default).
#[derive(Debug, Clone)]
pub struct Toolchain {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    abi_path: Option<PathBuf>,
    crate_names: bool,
}

/// Crate name for a unit: the file stem with anything outside `[A-Za-z0-9_]`
/// replaced, so `{id}.rs` builds as `_id_`.
pub fn crate_name_for(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    match name.chars().next() {
        Some(first) if !first.is_ascii_digit() => name,
        _ => format!("unit_{name}"),
    }
}

impl Toolchain {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            abi_path: None,
            crate_names: false,
        }
    }

    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .with_crate_names(config.crate_names)
    }

    /// Expose the guest ABI file to the compiled source through `DYNROUTE_ABI`.
    pub fn with_abi(mut self, abi_path: impl Into<PathBuf>) -> Self {
        self.abi_path = Some(abi_path.into());
        self
    }

    /// Pass `--crate-name` derived from each source file name.
    pub fn with_crate_names(mut self, enabled: bool) -> Self {
        self.crate_names = enabled;
        self
    }

    fn command(&self, source: &Path, artifact: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if self.crate_names {
            command.arg("--crate-name").arg(crate_name_for(source));
        }
        command
            .arg("-o")
            .arg(artifact)
            .arg(source)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(abi_path) = &self.abi_path {
            command.env(ABI_ENV, abi_path);
        }
        command
    }
}

impl Compiler for Toolchain {
    async fn compile(&self, source: &Path, artifact: &Path) -> Result<(), CompileError> {
        tracing::info!(
            source = %source.display(),
            artifact = %artifact.display(),
            "Compiling unit"
        );
        let started = Instant::now();

        let output = match tokio::time::timeout(self.timeout, self.command(source, artifact).output()).await {
            Ok(result) => result.map_err(|source| CompileError::Spawn {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                metrics::record_compilation("timeout", started);
                return Err(CompileError::TimedOut { after: self.timeout });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!(source = %source.display(), stdout = %stdout.trim(), "Toolchain output");
        }

        if !output.status.success() {
            metrics::record_compilation("failed", started);
            return Err(CompileError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !artifact.exists() {
            metrics::record_compilation("failed", started);
            return Err(CompileError::MissingArtifact(artifact.to_path_buf()));
        }

        metrics::record_compilation("ok", started);
        tracing::info!(
            artifact = %artifact.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Compiled unit"
        );
        Ok(())
    }
}
