//! Error taxonomy for the boot pipeline.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by artifact loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single toolchain invocation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("compilation failed ({status}): {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("compilation timed out after {after:?}")]
    TimedOut { after: Duration },

    #[error("toolchain reported success but produced no artifact at {}", .0.display())]
    MissingArtifact(PathBuf),
}

/// Anything that aborts a scan. Every variant is fatal.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to get working directory: {0}")]
    WorkingDir(#[source] io::Error),

    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{kind} folder not found at {}", path.display())]
    ScanRootMissing { kind: &'static str, path: PathBuf },

    #[error("source file {} does not exist", .0.display())]
    SourceMissing(PathBuf),

    #[error("failed to compile {}: {source}", path.display())]
    Compile {
        path: PathBuf,
        #[source]
        source: CompileError,
    },

    #[error("unable to open artifact {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("walk error at {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl LoadError {
    /// Coarse class used for logging and metrics labels.
    pub fn category(&self) -> &'static str {
        match self {
            LoadError::WorkingDir(_)
            | LoadError::OutputDir { .. }
            | LoadError::ScanRootMissing { .. }
            | LoadError::SourceMissing(_) => "environment",
            LoadError::Compile { .. } => "compile",
            LoadError::Load { .. } => "load",
            LoadError::Walk { .. } => "walk",
        }
    }
}
