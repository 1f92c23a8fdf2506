//! CLI module for the validation harness
//!
//! ## Commands
//!
//! - `run` - Compile every module, run every entry, compare, write the log and print the summary
//! - `list` - Print every case in manifest order with its skip status (dry run)
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.
//!
//! ## Exit codes
//!
//! `0` when every non-skipped case passed, `1` when any case failed, `2` when the run could not happen at all
//! (bad manifest or skip list, runtime build failure, unwritable output).

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use wasmval_core::SkipKey;

use crate::harness::HarnessError;
use crate::harness::config::{self, CompilerConfig, DEFAULT_COMPILE_TIMEOUT, DEFAULT_RUNTIME_TIMEOUT, HarnessConfig};
use crate::version::WASMVAL_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The run itself could not be carried out.
    pub const FATAL: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create a fatal error (exit code 2).
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FATAL)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Harness errors are rendered as diagnostics and always abort with [`ExitCode::FATAL`].
impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        Self::fatal(format!("{:?}", miette::Report::new(err)))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Differential validation harness for a TypeScript to WebAssembly compiler
#[derive(Parser, Debug)]
#[command(name = "wasmval")]
#[command(version = WASMVAL_VERSION)]
#[command(about = "Differential validation harness for a TypeScript to WebAssembly compiler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile, run and compare every case in the manifest
    Run(RunArgs),
    /// List every case with its skip status, without compiling or running
    List(SelectionArgs),
}

/// Options shared by every subcommand: where the cases are and which ones to consider.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Compiler checkout that every default path is derived from
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Validation manifest (default: <root>/tools/validate/wamr/validation.json)
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Directory holding the sample sources (default: <root>/tests/samples)
    #[arg(long, value_name = "DIR")]
    pub samples_dir: Option<PathBuf>,

    /// Source file extension
    #[arg(long = "source-ext", value_name = "EXT", default_value = "ts")]
    pub source_ext: String,

    /// JSON skip list: [{ "module": .., "entry"?: .., "reason"?: .. }]
    #[arg(long, value_name = "FILE")]
    pub skip_list: Option<PathBuf>,

    /// Skip a case (`module:entry`) or a whole module (`module`); repeatable
    #[arg(long = "skip", value_name = "KEY")]
    pub skip: Vec<SkipKey>,

    /// Only consider cases whose `module:entry` contains this keyword
    #[arg(short = 'k', value_name = "KEYWORD")]
    pub filter: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Compile output directory, recreated every run (default: <root>/tools/validate/wamr/wasm_modules)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Run log, overwritten every run (default: <root>/tools/validate/wamr/test.log)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Runtime executable (default: <root>/runtime-library/build/iwasm_gc)
    #[arg(long, value_name = "FILE")]
    pub runtime: Option<PathBuf>,

    /// Script that builds the runtime when it is missing (default: <root>/runtime-library/build.sh)
    #[arg(long, value_name = "FILE")]
    pub runtime_build_script: Option<PathBuf>,

    /// Extra runtime flag placed before `-f <entry>`; repeatable
    #[arg(long = "runtime-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub runtime_args: Vec<String>,

    /// Compiler executable (default: node running <root>/build/cli/ts2wasm.js)
    #[arg(long, value_name = "PROGRAM")]
    pub compiler: Option<PathBuf>,

    /// Compiler argument placed before `<source> -o <output>`; repeatable
    #[arg(long = "compiler-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub compiler_args: Vec<String>,

    /// Per-invocation runtime limit in seconds, 0 for none
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_RUNTIME_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Per-module compile limit in seconds, 0 for none
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_COMPILE_TIMEOUT.as_secs())]
    pub compile_timeout: u64,

    /// Number of modules validated concurrently
    #[arg(short = 'j', long, value_name = "N", default_value_t = 1)]
    pub jobs: usize,
}

impl SelectionArgs {
    /// Config with the default layout under `--root` and this selection's overrides applied.
    pub fn to_config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::from_root(&self.root)
            .with_source_extension(self.source_ext.as_str())
            .with_filter(self.filter.clone());
        if let Some(manifest) = &self.manifest {
            config = config.with_manifest(manifest);
        }
        if let Some(dir) = &self.samples_dir {
            config = config.with_samples_dir(dir);
        }
        config
    }
}

impl RunArgs {
    pub fn to_config(&self) -> HarnessConfig {
        let mut config = self
            .selection
            .to_config()
            .with_runtime_args(self.runtime_args.clone())
            .with_runtime_timeout(config::timeout_from_secs(self.timeout))
            .with_jobs(self.jobs);

        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(path) = &self.log_file {
            config = config.with_log_file(path);
        }
        if let Some(path) = &self.runtime {
            config = config.with_runtime(path);
        }
        if let Some(path) = &self.runtime_build_script {
            config = config.with_runtime_build_script(path);
        }

        let compiler = match &self.compiler {
            Some(program) => CompilerConfig {
                program: program.clone(),
                args: self.compiler_args.clone(),
                timeout: None,
            },
            None => {
                let mut default = config.compiler.clone();
                default.args.extend(self.compiler_args.iter().cloned());
                default
            }
        };
        config.with_compiler(CompilerConfig {
            timeout: config::timeout_from_secs(self.compile_timeout),
            ..compiler
        })
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run(args) => commands::run_validation(&args),
        Command::List(args) => commands::list_cases(&args),
    }
}

// ============================================================================
// Tests
// ============================================================================
