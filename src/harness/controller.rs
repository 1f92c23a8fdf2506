//! Run controller: the top-level validation loop.
//!
//! ## Flow
//!
//! 1. Make sure the runtime exists (building it if needed).
//! 2. Recreate the compile-output directory and truncate the log.
//! 3. Submit every module to a bounded worker pool. A worker compiles its module at most once (lazily, on the
//!    first entry that is not skipped), then runs and classifies its entries in order.
//! 4. Module reports are recorded in manifest order by this thread alone, whatever order workers finish in.
//!
//! With `jobs == 1` this is exactly the sequential compile → run → compare loop.

use std::cell::OnceCell;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use wasmval_core::{
    CaseId, CompilationOutcome, ExecutionResult, ModuleCase, RunSummary, SkipSet, ValidationManifest, classify,
};

use super::HarnessError;
use super::compiler::{CommandCompiler, Compiler};
use super::config::HarnessConfig;
use super::report::{EntryReport, ModuleReport, ReportSink};
use super::runtime::{self, Invocation, ProcessRuntime, Runtime};

/// Drives one validation run.
pub struct RunController {
    worker: Arc<ModuleWorker>,
}

/// Shared, read-only state handed to every module task.
struct ModuleWorker {
    config: HarnessConfig,
    skips: SkipSet,
    compiler: Arc<dyn Compiler>,
    runtime: Arc<dyn Runtime>,
}

impl RunController {
    pub fn new(config: HarnessConfig, skips: SkipSet, compiler: Arc<dyn Compiler>, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            worker: Arc::new(ModuleWorker {
                config,
                skips,
                compiler,
                runtime,
            }),
        }
    }

    /// Controller using the external compiler executable and the process runtime described by `config`.
    pub fn from_config(config: HarnessConfig, skips: SkipSet) -> Self {
        let compiler = Arc::new(CommandCompiler::from_config(&config.compiler));
        let runtime = Arc::new(ProcessRuntime::new(config.runtime_timeout));
        Self::new(config, skips, compiler, runtime)
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.worker.config
    }

    /// Validate every case of `manifest` and return the run's counters.
    ///
    /// Case failures are reported through the summary; `Err` is reserved for fatal problems.
    pub fn run(&self, manifest: &ValidationManifest) -> Result<RunSummary, HarnessError> {
        let config = &self.worker.config;

        runtime::ensure_runtime(&config.runtime, &config.runtime_build_script)?;
        reset_output_dir(&config.output_dir)?;

        let log_error = |source: io::Error| HarnessError::Log {
            path: config.log_file.clone(),
            source,
        };
        let timestamp = chrono::Local::now().format("%a %b %d %Y %H:%M:%S GMT%z").to_string();
        let mut sink = ReportSink::create(&config.log_file, &timestamp).map_err(log_error)?;

        let manifest = match &config.filter {
            Some(keyword) => manifest.filtered(keyword),
            None => manifest.clone(),
        };
        tracing::debug!(
            modules = manifest.modules().len(),
            cases = manifest.total_entries(),
            jobs = config.jobs,
            "starting validation"
        );

        let workers = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.jobs.max(1))
            .enable_all()
            .build()
            .map_err(HarnessError::WorkerPool)?;
        workers.block_on(self.run_modules(&manifest, &mut sink))?;

        let (summary, _) = sink.finish().map_err(log_error)?;
        Ok(summary)
    }

    async fn run_modules<W: Write>(
        &self,
        manifest: &ValidationManifest,
        sink: &mut ReportSink<W>,
    ) -> Result<(), HarnessError> {
        let permits = Arc::new(Semaphore::new(self.worker.config.jobs.max(1)));

        let handles: Vec<_> = manifest
            .modules()
            .iter()
            .cloned()
            .map(|module| {
                let permits = Arc::clone(&permits);
                let worker = Arc::clone(&self.worker);
                tokio::spawn(async move {
                    // The semaphore is never closed, so acquiring cannot fail.
                    let _permit = permits.acquire_owned().await;
                    tokio::task::spawn_blocking(move || worker.process_module(&module)).await
                })
            })
            .collect();

        for handle in handles {
            let report = handle.await??;
            sink.record_module(&report).map_err(|source| HarnessError::Log {
                path: self.worker.config.log_file.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl ModuleWorker {
    fn process_module(&self, module: &ModuleCase) -> ModuleReport {
        let name = module.module.as_str();
        let source = self.config.source_path(name);
        let compilation = OnceCell::new();

        let entries = module
            .entries
            .iter()
            .map(|entry| {
                let case = CaseId::new(name, &entry.name);

                if self.skips.is_skipped(name, &entry.name) {
                    let verdict = classify(name, entry, &self.skips, None, None);
                    return EntryReport::without_execution(case, verdict, source.clone());
                }

                let outcome = compilation.get_or_init(|| self.compile(name, &source));
                let Some(artifact) = outcome.artifact() else {
                    let verdict = classify(name, entry, &self.skips, Some(outcome), None);
                    return EntryReport::without_execution(case, verdict, source.clone());
                };

                let invocation = Invocation::new(
                    &self.config.runtime,
                    &self.config.runtime_args,
                    &entry.name,
                    artifact,
                    &entry.arg_strings(),
                );
                let execution = self.execute(&case, &invocation);
                let verdict = classify(name, entry, &self.skips, Some(outcome), Some(&execution));

                EntryReport {
                    case,
                    verdict,
                    source: source.clone(),
                    artifact: Some(artifact.clone()),
                    invocation: Some(invocation),
                    execution: Some(execution),
                }
            })
            .collect();

        if compilation.get().is_none() {
            tracing::debug!("every entry of [{}] is skipped, not compiling", name);
        }

        ModuleReport {
            module: module.module.clone(),
            entries,
        }
    }

    fn compile(&self, module: &str, source: &Path) -> CompilationOutcome {
        tracing::info!("Validating [{}] ...", module);
        let output = self.config.artifact_path(module);
        match self.compiler.compile(source, &output) {
            Ok(artifact) => CompilationOutcome::Compiled { artifact },
            Err(err) => {
                tracing::error!("Compiling [{}] failed ({})", module, source.display());
                tracing::debug!("{}", err);
                CompilationOutcome::Failed
            }
        }
    }

    fn execute(&self, case: &CaseId, invocation: &Invocation) -> ExecutionResult {
        match self.runtime.run(invocation) {
            Ok(result) => result,
            Err(err) => {
                tracing::error!("Running [{}] could not start the runtime: {}", case, err);
                ExecutionResult {
                    stderr: format!("failed to start runtime: {}", err).into_bytes(),
                    ..ExecutionResult::default()
                }
            }
        }
    }
}

/// Remove any previous run's artifacts and recreate the directory.
fn reset_output_dir(dir: &Path) -> Result<(), HarnessError> {
    let to_error = |source: io::Error| HarnessError::OutputDir {
        path: dir.to_path_buf(),
        source,
    };
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(to_error)?;
    }
    fs::create_dir_all(dir).map_err(to_error)
}
