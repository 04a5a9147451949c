//! Zip packaging of completed build directories.
//!
//! Each [`ArchiveJob`] compresses one build directory into one zip file with
//! relative paths preserved. Per-unit jobs touch disjoint directories and may
//! run on a bounded rayon pool; a failed job never aborts its siblings.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::resolve::{self, PathResolver, ResolveError};
use crate::types::{ArchiveConfig, ArchiveMode, BuildInfo, BuildTarget, BuildUnit};

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("source directory missing: {0}")]
  SourceMissing(String),

  #[error("resolve error: {0}")]
  Resolve(#[from] ResolveError),

  #[error("io error for {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: io::Error,
  },

  #[error("zip error for {path}: {source}")]
  Zip {
    path: String,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("failed to walk {path}: {source}")]
  Walk {
    path: String,
    #[source]
    source: walkdir::Error,
  },
}

/// One compress-directory-to-zip operation.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
  pub source_dir: PathBuf,
  pub dest_path: PathBuf,
  pub unit_name: String,
}

/// Archives produced and per-unit failures from one `archive` call.
#[derive(Debug, Default)]
pub struct ArchiveOutcome {
  pub archives: Vec<PathBuf>,
  pub failures: Vec<(String, ArchiveError)>,
}

impl ArchiveOutcome {
  pub fn is_success(&self) -> bool {
    self.failures.is_empty()
  }
}

/// Package build output directories per `mode`.
///
/// PerUnit compresses each unit's build directory into its own archive.
/// Combined archives only the **first** unit's directory; this mirrors the
/// observed behavior of the system this orchestrator descends from and is
/// deliberately left as-is.
///
/// Path resolution errors abort before any filesystem mutation; failures of
/// individual jobs are collected in the outcome instead.
pub fn archive(
  resolver: &PathResolver,
  units: &[BuildUnit],
  info: &BuildInfo,
  target: BuildTarget,
  mode: ArchiveMode,
  config: &ArchiveConfig,
) -> Result<ArchiveOutcome, ArchiveError> {
  let jobs = plan_jobs(resolver, units, info, target, mode, config)?;
  Ok(run_jobs(jobs, config.parallelism, target))
}

fn plan_jobs(
  resolver: &PathResolver,
  units: &[BuildUnit],
  info: &BuildInfo,
  target: BuildTarget,
  mode: ArchiveMode,
  config: &ArchiveConfig,
) -> Result<Vec<ArchiveJob>, ArchiveError> {
  let timestamp = Local::now();

  let selected: Vec<&BuildUnit> = match mode {
    ArchiveMode::PerUnit => units.iter().collect(),
    ArchiveMode::Combined => units.iter().take(1).collect(),
  };

  let mut jobs = Vec::with_capacity(selected.len());
  for unit in selected {
    let unit_name = unit.unit_name().to_string();
    let source_dir = resolver.resolve(target, &unit_name, info.release)?;
    let file_name = match mode {
      ArchiveMode::PerUnit => resolve::archive_file_name(info, Some(&unit_name), timestamp),
      ArchiveMode::Combined => resolve::archive_file_name(info, None, timestamp),
    };
    let dest_path = resolve::archive_destination(&source_dir, config)?.join(file_name);
    jobs.push(ArchiveJob {
      source_dir,
      dest_path,
      unit_name,
    });
  }

  Ok(jobs)
}

fn run_jobs(jobs: Vec<ArchiveJob>, parallelism: usize, target: BuildTarget) -> ArchiveOutcome {
  let results: Vec<(ArchiveJob, Result<(), ArchiveError>)> = if parallelism <= 1 || jobs.len() <= 1 {
    run_sequential(jobs, target)
  } else {
    match rayon::ThreadPoolBuilder::new().num_threads(parallelism).build() {
      Ok(pool) => pool.install(|| {
        jobs
          .into_par_iter()
          .map(|job| {
            let result = run_job(&job, target);
            (job, result)
          })
          .collect()
      }),
      Err(e) => {
        warn!(error = %e, "failed to build archive thread pool, running sequentially");
        run_sequential(jobs, target)
      }
    }
  };

  let mut outcome = ArchiveOutcome::default();
  for (job, result) in results {
    match result {
      Ok(()) => outcome.archives.push(job.dest_path),
      Err(e) => outcome.failures.push((job.unit_name, e)),
    }
  }
  outcome
}

fn run_sequential(jobs: Vec<ArchiveJob>, target: BuildTarget) -> Vec<(ArchiveJob, Result<(), ArchiveError>)> {
  jobs
    .into_iter()
    .map(|job| {
      let result = run_job(&job, target);
      (job, result)
    })
    .collect()
}

fn run_job(job: &ArchiveJob, target: BuildTarget) -> Result<(), ArchiveError> {
  if !job.source_dir.is_dir() {
    return Err(ArchiveError::SourceMissing(job.source_dir.display().to_string()));
  }

  info!(
    build_target = %target,
    source = %job.source_dir.display(),
    dest = %job.dest_path.display(),
    "archiving"
  );

  write_zip(&job.source_dir, &job.dest_path)
}

/// Compress `source_dir` into a zip at `dest_path`, entry paths relative to
/// the source and in sorted order. An existing archive at the destination is
/// overwritten (last-write-wins).
pub fn write_zip(source_dir: &Path, dest_path: &Path) -> Result<(), ArchiveError> {
  if let Some(parent) = dest_path.parent() {
    std::fs::create_dir_all(parent).map_err(|e| ArchiveError::Io {
      path: parent.display().to_string(),
      source: e,
    })?;
  }

  let file = File::create(dest_path).map_err(|e| ArchiveError::Io {
    path: dest_path.display().to_string(),
    source: e,
  })?;
  let mut writer = ZipWriter::new(file);
  let options = SimpleFileOptions::default();

  for entry in WalkDir::new(source_dir).sort_by_file_name() {
    let entry = entry.map_err(|e| ArchiveError::Walk {
      path: source_dir.display().to_string(),
      source: e,
    })?;

    let relative = match entry.path().strip_prefix(source_dir) {
      Ok(rel) if !rel.as_os_str().is_empty() => rel,
      _ => continue,
    };
    let name = relative.to_string_lossy().replace('\\', "/");

    if entry.file_type().is_dir() {
      writer.add_directory(name, options).map_err(|e| ArchiveError::Zip {
        path: dest_path.display().to_string(),
        source: e,
      })?;
    } else if entry.file_type().is_file() {
      writer.start_file(name, options).map_err(|e| ArchiveError::Zip {
        path: dest_path.display().to_string(),
        source: e,
      })?;
      let mut source = File::open(entry.path()).map_err(|e| ArchiveError::Io {
        path: entry.path().display().to_string(),
        source: e,
      })?;
      io::copy(&mut source, &mut writer).map_err(|e| ArchiveError::Io {
        path: entry.path().display().to_string(),
        source: e,
      })?;
    }
  }

  writer.finish().map_err(|e| ArchiveError::Zip {
    path: dest_path.display().to_string(),
    source: e,
  })?;
  Ok(())
}
