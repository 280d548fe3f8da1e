//! In-process stand-ins for the toolchain and the dynamic loader.
//!
//! A fake unit's source is a whitespace-separated list of verb names. The fake
//! toolchain copies it to the artifact path; the fake loader turns each name
//! into a native handler. Sources whose file name contains `broken` fail to
//! compile; unknown names fail to load.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::abi::{RawContext, RawHandlerFn, RouteHandler};
use crate::loader::compiler::Compiler;
use crate::loader::error::{BoxError, CompileError};
use crate::loader::symbols::{ArtifactLoader, HandlerTable, Verb};

extern "C" fn get_handler(ctx: &mut RawContext) {
    ctx.write(b"GET");
}
extern "C" fn put_handler(ctx: &mut RawContext) {
    ctx.write(b"PUT");
}
extern "C" fn post_handler(ctx: &mut RawContext) {
    ctx.write(b"POST");
}
extern "C" fn patch_handler(ctx: &mut RawContext) {
    ctx.write(b"PATCH");
}
extern "C" fn delete_handler(ctx: &mut RawContext) {
    ctx.write(b"DELETE");
}

/// The native function the fake loader uses for `verb`.
pub fn handler_for(verb: Verb) -> RawHandlerFn {
    match verb {
        Verb::Get => get_handler,
        Verb::Put => put_handler,
        Verb::Post => post_handler,
        Verb::Patch => patch_handler,
        Verb::Delete => delete_handler,
    }
}

pub fn write_unit(path: &Path, verbs: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, verbs).unwrap();
}

#[derive(Debug, Default)]
pub struct FakeToolchain {
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeToolchain {
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl Compiler for FakeToolchain {
    async fn compile(&self, source: &Path, artifact: &Path) -> Result<(), CompileError> {
        self.calls.lock().unwrap().push(source.to_path_buf());

        let name = source.file_name().unwrap_or_default().to_string_lossy();
        if name.contains("broken") {
            return Err(failed_build());
        }

        fs::copy(source, artifact).map_err(|e| CompileError::Spawn {
            program: "fake".into(),
            source: e,
        })?;
        Ok(())
    }
}

#[cfg(unix)]
fn failed_build() -> CompileError {
    use std::os::unix::process::ExitStatusExt;
    CompileError::Failed {
        status: std::process::ExitStatus::from_raw(1 << 8),
        stderr: "error: expected item, found `}`".into(),
    }
}

#[cfg(not(unix))]
fn failed_build() -> CompileError {
    CompileError::MissingArtifact(PathBuf::from("broken"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FakeLoader;

impl ArtifactLoader for FakeLoader {
    fn load(&self, artifact: &Path) -> Result<HandlerTable, BoxError> {
        let content = fs::read_to_string(artifact)?;
        let mut table = HandlerTable::new();
        for name in content.split_whitespace() {
            let verb = Verb::ALL
                .into_iter()
                .find(|v| v.as_str() == name)
                .ok_or_else(|| format!("unrecognized export `{name}`"))?;
            table.insert(verb, RouteHandler::native(handler_for(verb)));
        }
        Ok(table)
    }
}
