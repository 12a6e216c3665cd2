//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use of_analysis::NoopSemanticClassifier;
use of_core::{Config, CoreError, ExtractionRun, OntologyId, RunStatus, StepStatus};
use of_db::DuckDbSource;
use of_extract::{Engine, ProgressEvent};
use of_meta::MetaDb;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::cli::{GlobalArgs, OutputFormat};

/// Error type representing a non-zero process exit code.
///
/// Return `Err(ExitCode(N).into())` instead of calling `std::process::exit`
/// so destructors run.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Everything a command needs: config, the ontology and the opened stores.
pub(crate) struct Workspace {
    pub(crate) config: Config,
    pub(crate) ontology_id: OntologyId,
    pub(crate) meta: Arc<Mutex<MetaDb>>,
    pub(crate) source: Arc<DuckDbSource>,
}

impl Workspace {
    pub(crate) fn open(global: &GlobalArgs) -> Result<Self> {
        let config = load_config(global)?;
        let ontology_id = ontology_id(global)?;
        let project_dir = Path::new(&global.project_dir);

        let meta_path = resolve(project_dir, &config.meta.path);
        let meta = MetaDb::open(&meta_path)
            .with_context(|| format!("Failed to open meta database {}", meta_path.display()))?;

        let source_path = if config.source.path == ":memory:" {
            config.source.path.clone()
        } else {
            resolve(project_dir, &config.source.path).display().to_string()
        };
        let source = DuckDbSource::new(&source_path, &config.source.schema)
            .with_context(|| format!("Failed to open data source {source_path}"))?;

        Ok(Self {
            config,
            ontology_id,
            meta: Arc::new(Mutex::new(meta)),
            source: Arc::new(source),
        })
    }

    pub(crate) fn engine(&self) -> Result<Engine> {
        Engine::new(
            self.meta.clone(),
            self.source.clone(),
            Arc::new(NoopSemanticClassifier),
            self.config.clone(),
        )
        .context("Failed to build extraction engine")
    }

    /// Run `body` against the meta database.
    pub(crate) fn with_meta<T>(&self, body: impl FnOnce(&MetaDb) -> Result<T>) -> Result<T> {
        let meta = self
            .meta
            .lock()
            .map_err(|_| anyhow::anyhow!("meta database lock poisoned"))?;
        body(&meta)
    }
}

fn resolve(project_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}

/// Load `--config`, else `ontoforge.yml` in the project directory, else
/// defaults.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    if let Some(path) = &global.config {
        return Config::load(Path::new(path)).with_context(|| format!("Failed to load {path}"));
    }
    match Config::load_from_dir(Path::new(&global.project_dir)) {
        Ok(config) => Ok(config),
        Err(CoreError::ConfigNotFound { path }) => {
            log::info!("No config at {path}; using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e).context("Failed to load project config"),
    }
}

pub(crate) fn ontology_id(global: &GlobalArgs) -> Result<OntologyId> {
    let Some(raw) = &global.ontology else {
        anyhow::bail!("No ontology given. Pass --ontology <uuid> or set ONTOFORGE_ONTOLOGY_ID.");
    };
    raw.parse().context("Invalid --ontology")
}

/// Print progress events to stderr until the sender side closes.
pub(crate) fn spawn_progress_printer() -> (mpsc::UnboundedSender<ProgressEvent>, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match &event.message {
                Some(message) => eprintln!(
                    "  [{}] {}/{} {}",
                    event.step, event.completed, event.total, message
                ),
                None => eprintln!("  [{}] {}/{}", event.step, event.completed, event.total),
            }
        }
    });
    (tx, handle)
}

/// Print a value as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a run, then fail with exit code 1 if it failed.
pub(crate) fn report_run(run: &ExtractionRun, format: OutputFormat) -> Result<()> {
    print_run(run, format)?;
    if run.status == RunStatus::Failed {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

pub(crate) fn print_run(run: &ExtractionRun, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(run);
    }
    println!("Run {} ({})", run.run_id, run.status);
    println!("  ontology: {}", run.ontology_id);
    println!("  started:  {}", run.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();
    println!("  {:<24} {:<10} {:>8} {:>10}", "STEP", "STATUS", "ATTEMPTS", "DURATION");
    for step in &run.steps {
        let duration = step
            .duration_ms()
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string());
        let marker = match step.status {
            StepStatus::Succeeded => "\u{2713}",
            StepStatus::Failed => "\u{2717}",
            StepStatus::Skipped => "~",
            StepStatus::Pending | StepStatus::Running => " ",
        };
        println!(
            "{} {:<24} {:<10} {:>8} {:>10}",
            marker, step.step, step.status, step.attempts, duration
        );
    }

    let summary = run.summary();
    println!();
    println!(
        "{} succeeded, {} skipped, {} failed, {} pending",
        summary.succeeded, summary.skipped, summary.failed, summary.pending
    );
    if run.is_degraded() {
        let skipped: Vec<String> = run.degraded_steps.iter().map(|s| s.to_string()).collect();
        println!("Degraded: skipped {}", skipped.join(", "));
    }
    if let Some(error) = &run.error_summary {
        let step = run
            .failed_step
            .map(|s| s.to_string())
            .unwrap_or_else(|| "run".to_string());
        println!("Failed at {step}: {error}");
    }
    Ok(())
}
