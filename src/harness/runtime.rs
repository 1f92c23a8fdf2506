//! Runtime invoker: runs one exported function of a compiled artifact in the external WebAssembly runtime.
//!
//! The runtime is a black-box executable called as
//! `<runtime> [runtime-args..] -f <function> <artifact> <arg1> <arg2> ..`.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::Duration;

use thiserror::Error;
use wasmval_core::ExecutionResult;

use super::process;

/// Fatal problems getting a runtime executable in place.
#[derive(Debug, Error)]
pub enum RuntimeBuildError {
    #[error("failed to launch runtime build script {script}: {source}")]
    Launch {
        script: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("runtime build script {script} failed ({status})")]
    Failed { script: PathBuf, status: ExitStatus },

    #[error("runtime build script finished but {runtime} still does not exist")]
    NotProduced { runtime: PathBuf },
}

/// One fully-resolved runtime command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(runtime: &Path, runtime_args: &[String], function: &str, artifact: &Path, args: &[String]) -> Self {
        let mut all = Vec::with_capacity(runtime_args.len() + 3 + args.len());
        all.extend(runtime_args.iter().cloned());
        all.push("-f".to_string());
        all.push(function.to_string());
        all.push(artifact.display().to_string());
        all.extend(args.iter().cloned());
        Self {
            program: runtime.to_path_buf(),
            args: all,
        }
    }
}

/// The reproduction command written to the log.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Execute an invocation and capture its result.
pub trait Runtime: Send + Sync {
    /// `Err` means the process could not be started at all.
    fn run(&self, invocation: &Invocation) -> io::Result<ExecutionResult>;
}

/// Spawns the runtime as a child process, killing it after `timeout`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRuntime {
    timeout: Option<Duration>,
}

impl ProcessRuntime {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Runtime for ProcessRuntime {
    #[tracing::instrument(skip_all, fields(cmd = %invocation))]
    fn run(&self, invocation: &Invocation) -> io::Result<ExecutionResult> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        let result = process::run_captured(command, self.timeout)?;
        if result.timed_out {
            tracing::warn!("runtime killed after {:.1}s", result.duration.as_secs_f64());
        }
        Ok(result)
    }
}

/// Make sure the runtime executable exists, running the build script when it does not.
///
/// The script runs with no arguments, from its own directory, with inherited stdio. Returns `true` when a
/// build was needed.
pub fn ensure_runtime(runtime: &Path, build_script: &Path) -> Result<bool, RuntimeBuildError> {
    if runtime.exists() {
        return Ok(false);
    }

    tracing::warn!("{} not found, building it first", runtime.display());

    let status = build_command(build_script)
        .and_then(|mut command| command.status())
        .map_err(|source| RuntimeBuildError::Launch {
            script: build_script.to_path_buf(),
            source,
        })?;

    if !status.success() {
        return Err(RuntimeBuildError::Failed {
            script: build_script.to_path_buf(),
            status,
        });
    }
    if !runtime.exists() {
        return Err(RuntimeBuildError::NotProduced {
            runtime: runtime.to_path_buf(),
        });
    }
    Ok(true)
}

/// The script path is made absolute first: a relative program is looked up after `current_dir` takes effect.
fn build_command(build_script: &Path) -> io::Result<Command> {
    let script = std::path::absolute(build_script)?;
    let mut command = Command::new(&script);
    if let Some(dir) = script.parent() {
        command.current_dir(dir);
    }
    Ok(command)
}
