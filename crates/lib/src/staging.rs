//! Clean-state preparation of build output directories.
//!
//! A stale directory silently reused would corrupt the next build's output,
//! so every deletion or creation failure is surfaced as a [`StagingError`].

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::types::Packaging;

#[derive(Debug, Error)]
pub enum StagingError {
  #[error("failed to create {path}: {source}")]
  Create {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to remove directory {path}: {source}")]
  RemoveDir {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to remove file {path}: {source}")]
  RemoveFile {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to walk {path}: {source}")]
  Walk {
    path: String,
    #[source]
    source: walkdir::Error,
  },
}

/// Bring `dir` to a known-clean state. Idempotent.
///
/// A missing directory is created with its parents. An existing one first
/// gets a writability sweep (a previous build may have left read-only
/// files), then is either fully removed and recreated (tree packaging) or
/// kept with only the known single-file output deleted.
pub fn prepare(dir: &Path, packaging: &Packaging) -> Result<(), StagingError> {
  info!(path = %dir.display(), "staging build directory");

  if dir.exists() {
    make_tree_writable(dir)?;

    match packaging {
      Packaging::SingleFile { file_name } => {
        let output_file = single_file_path(dir, file_name);
        if output_file.exists() {
          fs::remove_file(&output_file).map_err(|e| StagingError::RemoveFile {
            path: output_file.display().to_string(),
            source: e,
          })?;
        }
      }
      Packaging::Tree => {
        fs::remove_dir_all(dir).map_err(|e| StagingError::RemoveDir {
          path: dir.display().to_string(),
          source: e,
        })?;
      }
    }
  }

  fs::create_dir_all(dir).map_err(|e| StagingError::Create {
    path: dir.display().to_string(),
    source: e,
  })?;

  info!(path = %dir.display(), "staging complete");
  Ok(())
}

/// The single-file output lives alongside the build directory, not inside it.
fn single_file_path(dir: &Path, file_name: &str) -> PathBuf {
  match dir.parent() {
    Some(parent) => parent.join(file_name),
    None => PathBuf::from(file_name),
  }
}

/// Clear read-only bits on every entry under `dir`.
///
/// Per-entry permission failures are logged and skipped; the subsequent
/// deletion will surface anything that actually blocks cleanup.
fn make_tree_writable(dir: &Path) -> Result<(), StagingError> {
  for entry in WalkDir::new(dir) {
    let entry = entry.map_err(|e| StagingError::Walk {
      path: dir.display().to_string(),
      source: e,
    })?;

    if let Err(e) = make_entry_writable(entry.path()) {
      warn!(path = ?entry.path(), error = %e, "failed to clear read-only bit, continuing");
    }
  }

  Ok(())
}

#[cfg(unix)]
fn make_entry_writable(path: &Path) -> std::io::Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let metadata = fs::symlink_metadata(path)?;
  let mode = metadata.permissions().mode();
  if mode & 0o200 == 0 {
    let mut perms = metadata.permissions();
    perms.set_mode(mode | 0o200);
    fs::set_permissions(path, perms)?;
  }
  Ok(())
}

#[cfg(windows)]
fn make_entry_writable(path: &Path) -> std::io::Result<()> {
  let metadata = fs::symlink_metadata(path)?;
  let mut perms = metadata.permissions();
  if perms.readonly() {
    perms.set_readonly(false);
    fs::set_permissions(path, perms)?;
  }
  Ok(())
}
