//! Orchestration of staging, backend invocation, and archiving.
//!
//! `run_build` and `run_archive` are independently callable entry points:
//! callers may build without archiving, archive an earlier build, or chain
//! the two. Both are synchronous and blocking; callers needing
//! responsiveness run the pipeline on a worker and listen for the callback.

use chrono::Local;
use thiserror::Error;
use tracing::info;

use crate::archive::{self, ArchiveError, ArchiveOutcome};
use crate::backend::{Backend, BackendError, BuildReport};
use crate::invoke;
use crate::resolve::{PathResolver, ResolveError};
use crate::staging::{self, StagingError};
use crate::types::{ArchiveConfig, ArchiveMode, BuildInfo, BuildOptions, BuildTarget, BuildUnit};

const LOG_STAMP: &str = "%m/%d/%y %I:%M:%S";

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("resolve error: {0}")]
  Resolve(#[from] ResolveError),

  #[error("staging error: {0}")]
  Staging(#[from] StagingError),

  #[error("backend error: {0}")]
  Backend(#[from] BackendError),

  #[error("archive error: {0}")]
  Archive(#[from] ArchiveError),

  /// Backend ran but reported compile errors and the pipeline is configured
  /// to abort on failed reports.
  #[error("backend reported {error_count} error(s) for target {build_target}")]
  BuildFailed {
    build_target: BuildTarget,
    error_count: usize,
  },

  #[error("no build units supplied")]
  NoUnits,
}

/// Log sink with an explicit clear capability, invoked before each build.
///
/// The default [`NullConsole`] keeps no clearable scrollback.
pub trait LogConsole {
  fn clear(&self);
}

pub struct NullConsole;

impl LogConsole for NullConsole {
  fn clear(&self) {}
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
  /// When true, a failed build report becomes [`PipelineError::BuildFailed`]
  /// and the completion callback does not fire. Off by default: the pipeline
  /// proceeds to the callback regardless of the report, leaving archiving to
  /// the caller's judgment.
  pub abort_on_build_failure: bool,

  pub archive: ArchiveConfig,
}

/// Sequences resolve, stage, invoke, callback, and separately archive.
pub struct Pipeline<B> {
  backend: B,
  resolver: PathResolver,
  config: PipelineConfig,
  console: Box<dyn LogConsole + Send + Sync>,
}

impl<B: Backend> Pipeline<B> {
  pub fn new(backend: B, resolver: PathResolver) -> Self {
    Self {
      backend,
      resolver,
      config: PipelineConfig::default(),
      console: Box::new(NullConsole),
    }
  }

  pub fn with_config(mut self, config: PipelineConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_console(mut self, console: Box<dyn LogConsole + Send + Sync>) -> Self {
    self.console = console;
    self
  }

  pub fn resolver(&self) -> &PathResolver {
    &self.resolver
  }

  /// Run one build: clear the console, stage the output directory, invoke
  /// the backend, then fire `callback` exactly once.
  ///
  /// A backend crash propagates and skips the callback. A backend that ran
  /// but reported errors only does so when `abort_on_build_failure` is set;
  /// otherwise the failed report is returned and the callback still fires.
  pub fn run_build<F>(
    &self,
    units: &[BuildUnit],
    info: &BuildInfo,
    target: BuildTarget,
    options: BuildOptions,
    callback: F,
  ) -> Result<BuildReport, PipelineError>
  where
    F: FnOnce(&BuildReport),
  {
    let first = units.first().ok_or(PipelineError::NoUnits)?;

    self.console.clear();
    info!("[BUILD] [{}] Started @ {}", target, Local::now().format(LOG_STAMP));

    let location = self.resolver.resolve(target, first.unit_name(), info.release)?;
    staging::prepare(&location, &target.packaging(info))?;

    let report = invoke::invoke(&self.backend, units, info, target, options, &location)?;

    info!("[BUILD] [{}] Completed @ {}", target, Local::now().format(LOG_STAMP));

    if !report.is_success() && self.config.abort_on_build_failure {
      return Err(PipelineError::BuildFailed {
        build_target: target,
        error_count: report.error_count,
      });
    }

    callback(&report);
    Ok(report)
  }

  /// Package build outputs; mode follows `BuildInfo.one_archive_per_unit`.
  pub fn run_archive(
    &self,
    units: &[BuildUnit],
    info: &BuildInfo,
    target: BuildTarget,
  ) -> Result<ArchiveOutcome, PipelineError> {
    let mode = ArchiveMode::for_info(info);
    let outcome = archive::archive(&self.resolver, units, info, target, mode, &self.config.archive)?;
    Ok(outcome)
  }
}
