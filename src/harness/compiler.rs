//! Compiler driver: turns one source module into one `.wasm` artifact.
//!
//! ## Collaborators
//!
//! The compiler itself is external. Two shapes are supported behind the [`Compiler`] trait:
//!
//! - [`CommandCompiler`]: runs a compiler executable as `<program> [args..] <source> -o <output>`.
//! - [`PipelineCompiler`]: drives an in-process [`Frontend`] and a per-module [`Backend`]. The backend is
//!   disposed when compilation ends, on success and on every failure path.
//!
//! ## Artifacts
//!
//! Bytes are written to a `<artifact>.partial` sibling and renamed into place only once everything succeeded.
//! A failed compile never leaves a file at the artifact path.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use thiserror::Error;

use super::config::CompilerConfig;
use super::process;

/// Any failure between reading the source and writing the artifact.
///
/// The harness only cares that compilation failed; the variant is kept for the debug log.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("code generation failed: {0}")]
    Codegen(String),

    #[error("binary emission failed: {0}")]
    Emit(String),

    #[error("failed to launch compiler `{program}`: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("compiler exited with {status}\n{stderr}")]
    Toolchain { status: String, stderr: String },

    #[error("compiler timed out after {0:?}")]
    TimedOut(Duration),

    #[error("compiler reported success but wrote no artifact")]
    MissingArtifact,

    #[error("failed to write artifact: {0}")]
    Io(#[from] io::Error),
}

/// Compile one source file to the given artifact path.
pub trait Compiler: Send + Sync {
    /// Returns the artifact path on success. Nothing is left at `output` on failure.
    fn compile(&self, source: &Path, output: &Path) -> Result<PathBuf, CompileError>;
}

// ============================================================================
// In-process pipeline
// ============================================================================

/// Parses source files into the frontend's program representation.
pub trait Frontend: Send + Sync {
    type Program;

    fn parse(&self, sources: &[PathBuf]) -> Result<Self::Program, CompileError>;
}

/// Code generator for one parsed program.
///
/// A backend holds resources until [`Backend::dispose`] is called. [`PipelineCompiler`] guarantees that call.
pub trait Backend {
    fn codegen(&mut self) -> Result<(), CompileError>;

    fn emit_binary(&mut self) -> Result<Vec<u8>, CompileError>;

    fn dispose(&mut self);
}

/// Owns a backend for the duration of one compile and disposes it on drop.
struct BackendScope<B: Backend> {
    backend: B,
}

impl<B: Backend> Deref for BackendScope<B> {
    type Target = B;

    fn deref(&self) -> &B {
        &self.backend
    }
}

impl<B: Backend> DerefMut for BackendScope<B> {
    fn deref_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: Backend> Drop for BackendScope<B> {
    fn drop(&mut self) {
        self.backend.dispose();
    }
}

/// A frontend plus a factory building a fresh backend per module.
pub struct PipelineCompiler<F, G> {
    frontend: F,
    make_backend: G,
}

impl<F, G> PipelineCompiler<F, G> {
    pub fn new(frontend: F, make_backend: G) -> Self {
        Self { frontend, make_backend }
    }
}

impl<F, G, B> Compiler for PipelineCompiler<F, G>
where
    F: Frontend,
    G: Fn(F::Program) -> B + Send + Sync,
    B: Backend,
{
    #[tracing::instrument(skip_all, fields(source = %source.display()))]
    fn compile(&self, source: &Path, output: &Path) -> Result<PathBuf, CompileError> {
        let program = self.frontend.parse(&[source.to_path_buf()])?;

        let mut backend = BackendScope {
            backend: (self.make_backend)(program),
        };
        backend.codegen()?;
        let binary = backend.emit_binary()?;

        write_artifact(output, &binary)?;
        Ok(output.to_path_buf())
    }
}

// ============================================================================
// External compiler executable
// ============================================================================

/// Runs an external compiler: `<program> [args..] <source> -o <output>`.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: config.timeout,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Compiler for CommandCompiler {
    #[tracing::instrument(skip_all, fields(source = %source.display()))]
    fn compile(&self, source: &Path, output: &Path) -> Result<PathBuf, CompileError> {
        let partial = PartialArtifact::for_output(output);

        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(source).arg("-o").arg(partial.path());

        let result = process::run_captured(command, self.timeout).map_err(|source| CompileError::Launch {
            program: self.program.clone(),
            source,
        })?;

        if result.timed_out {
            return Err(CompileError::TimedOut(result.duration));
        }
        if result.exit_code != Some(0) {
            let status = result
                .exit_code
                .map_or_else(|| "no exit code".to_string(), |code| format!("exit code {}", code));
            return Err(CompileError::Toolchain {
                status,
                stderr: result.stderr_text(),
            });
        }
        if !partial.path().is_file() {
            return Err(CompileError::MissingArtifact);
        }

        partial.commit(output)?;
        Ok(output.to_path_buf())
    }
}

// ============================================================================
// Artifact writing
// ============================================================================

/// Write `binary` to `output` through a partial file.
pub fn write_artifact(output: &Path, binary: &[u8]) -> io::Result<()> {
    let partial = PartialArtifact::for_output(output);
    fs::write(partial.path(), binary)?;
    partial.commit(output)
}

/// A not-yet-valid artifact file, removed on drop unless committed.
struct PartialArtifact {
    path: PathBuf,
    committed: bool,
}

impl PartialArtifact {
    fn for_output(output: &Path) -> Self {
        let mut name = output.file_name().map(OsString::from).unwrap_or_else(|| OsString::from("artifact"));
        name.push(".partial");
        Self {
            path: output.with_file_name(name),
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self, output: &Path) -> io::Result<()> {
        fs::rename(&self.path, output)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialArtifact {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
