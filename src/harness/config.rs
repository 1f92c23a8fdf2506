//! Harness configuration.
//!
//! Every path defaults to the layout of a compiler checkout rooted at `root`:
//!
//! | What | Default |
//! |------|---------|
//! | manifest | `tools/validate/wamr/validation.json` |
//! | samples | `tests/samples` |
//! | compile output | `tools/validate/wamr/wasm_modules` |
//! | log file | `tools/validate/wamr/test.log` |
//! | runtime | `runtime-library/build/iwasm_gc` |
//! | runtime build script | `runtime-library/build.sh` |

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default per-invocation limit for the runtime.
pub const DEFAULT_RUNTIME_TIMEOUT: Duration = Duration::from_secs(60);

/// Default limit for compiling one module.
pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(300);

/// How to invoke the external compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerConfig {
    pub program: PathBuf,
    /// Arguments placed before `<source> -o <output>`
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

/// Everything a validation run needs besides the manifest and skip set.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub manifest: PathBuf,
    pub samples_dir: PathBuf,
    /// Source file extension, without the dot
    pub source_extension: String,
    /// Recreated at the start of every run
    pub output_dir: PathBuf,
    /// Truncated at the start of every run
    pub log_file: PathBuf,
    pub runtime: PathBuf,
    pub runtime_build_script: PathBuf,
    /// Extra runtime flags placed before `-f <entry>`
    pub runtime_args: Vec<String>,
    pub runtime_timeout: Option<Duration>,
    pub compiler: CompilerConfig,
    /// Number of modules processed concurrently
    pub jobs: usize,
    /// Only run cases whose `module:entry` id contains this keyword
    pub filter: Option<String>,
}

impl HarnessConfig {
    /// Default layout under `root`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let validate_dir = root.join("tools").join("validate").join("wamr");
        let runtime_dir = root.join("runtime-library");
        Self {
            manifest: validate_dir.join("validation.json"),
            samples_dir: root.join("tests").join("samples"),
            source_extension: "ts".to_string(),
            output_dir: validate_dir.join("wasm_modules"),
            log_file: validate_dir.join("test.log"),
            runtime: runtime_dir.join("build").join("iwasm_gc"),
            runtime_build_script: runtime_dir.join("build.sh"),
            runtime_args: Vec::new(),
            runtime_timeout: Some(DEFAULT_RUNTIME_TIMEOUT),
            compiler: CompilerConfig {
                program: PathBuf::from("node"),
                args: vec![root.join("build").join("cli").join("ts2wasm.js").display().to_string()],
                timeout: Some(DEFAULT_COMPILE_TIMEOUT),
            },
            jobs: 1,
            filter: None,
        }
    }

    /// Source file for a module: `<samples_dir>/<module>.<ext>`.
    pub fn source_path(&self, module: &str) -> PathBuf {
        self.samples_dir.join(format!("{}.{}", module, self.source_extension))
    }

    /// Artifact for a module: `<output_dir>/<module>.wasm`.
    pub fn artifact_path(&self, module: &str) -> PathBuf {
        self.output_dir.join(format!("{}.wasm", module))
    }

    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = path.into();
        self
    }

    pub fn with_samples_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.samples_dir = dir.into();
        self
    }

    pub fn with_source_extension(mut self, ext: impl Into<String>) -> Self {
        self.source_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    pub fn with_runtime(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime = path.into();
        self
    }

    pub fn with_runtime_build_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime_build_script = path.into();
        self
    }

    pub fn with_runtime_args(mut self, args: Vec<String>) -> Self {
        self.runtime_args = args;
        self
    }

    /// `None` disables the limit.
    pub fn with_runtime_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.runtime_timeout = timeout;
        self
    }

    pub fn with_compiler(mut self, compiler: CompilerConfig) -> Self {
        self.compiler = compiler;
        self
    }

    /// Values below 1 are clamped to 1.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|f| !f.is_empty());
        self
    }
}

/// Seconds from the command line to an optional limit, `0` meaning none.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
