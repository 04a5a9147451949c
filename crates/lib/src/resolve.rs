//! Output directory and archive naming.
//!
//! Build locations are pure functions of (target, unit name, release flag)
//! and are re-derived on every call, never cached across runs.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::types::{ArchiveConfig, BuildInfo, BuildTarget};

#[derive(Debug, Error)]
pub enum ResolveError {
  /// The target has no directory template.
  #[error("no directory template for target {0}")]
  UnsupportedTarget(BuildTarget),

  #[error("unit name is empty")]
  EmptyUnitName,

  /// The build directory does not have enough ancestors for the configured
  /// archive destination climb.
  #[error("archive destination needs {needed} ancestor level(s) above {path}, found {found}")]
  ArchiveRootTooShallow {
    path: String,
    needed: usize,
    found: usize,
  },

  #[error("failed to determine current directory: {0}")]
  CurrentDir(#[source] std::io::Error),
}

/// Derives canonical build output directories under a configurable root.
#[derive(Debug, Clone)]
pub struct PathResolver {
  build_root: PathBuf,
}

impl PathResolver {
  pub fn new(build_root: impl Into<PathBuf>) -> Self {
    Self {
      build_root: build_root.into(),
    }
  }

  /// Resolver rooted at `<cwd>/Builds`.
  pub fn from_cwd() -> Result<Self, ResolveError> {
    let cwd = std::env::current_dir().map_err(ResolveError::CurrentDir)?;
    Ok(Self::new(cwd.join("Builds")))
  }

  pub fn build_root(&self) -> &Path {
    &self.build_root
  }

  /// Absolute, normalized `<root>/<Platform>/<Release|Debug>/<unit>/`.
  pub fn resolve(
    &self,
    target: BuildTarget,
    unit_name: &str,
    release: bool,
  ) -> Result<PathBuf, ResolveError> {
    if unit_name.is_empty() {
      return Err(ResolveError::EmptyUnitName);
    }
    let platform = target
      .platform_dir()
      .ok_or(ResolveError::UnsupportedTarget(target))?;

    let dir = self
      .build_root
      .join(platform)
      .join(if release { "Release" } else { "Debug" })
      .join(unit_name);

    let absolute = if dir.is_absolute() {
      dir
    } else {
      let cwd = std::env::current_dir().map_err(ResolveError::CurrentDir)?;
      cwd.join(dir)
    };

    Ok(dunce::simplified(&normalize_path(&absolute)).to_path_buf())
  }
}

/// Archive file name: `<AppNameNoSpaces>[_<unit>]_<version>_<YYYY-MM-DD_HH-mm>.zip`.
///
/// The unit segment is present in per-unit mode so that archives from the
/// same run do not collide on a shared destination directory.
pub fn archive_file_name(info: &BuildInfo, unit_name: Option<&str>, timestamp: DateTime<Local>) -> String {
  let stamp = timestamp.format("%Y-%m-%d_%H-%M");
  match unit_name {
    Some(unit) => format!("{}_{}_{}_{}.zip", info.compact_app_name(), unit, info.version, stamp),
    None => format!("{}_{}_{}.zip", info.compact_app_name(), info.version, stamp),
  }
}

/// Directory the archive for `build_location` lands in.
///
/// Either the explicit archive root, or the configured number of ancestor
/// levels above the per-unit build directory (default 3, which is the
/// `Builds/` root for the standard layout).
pub fn archive_destination(build_location: &Path, config: &ArchiveConfig) -> Result<PathBuf, ResolveError> {
  if let Some(root) = &config.archive_root {
    return Ok(root.clone());
  }

  let mut dir = build_location;
  for climbed in 0..config.ancestor_levels {
    dir = dir.parent().ok_or_else(|| ResolveError::ArchiveRootTooShallow {
      path: build_location.display().to_string(),
      needed: config.ancestor_levels,
      found: climbed,
    })?;
  }
  Ok(dir.to_path_buf())
}

/// Resolve `.` and `..` components without requiring the path to exist.
fn normalize_path(path: &Path) -> PathBuf {
  let mut components = Vec::new();

  for component in path.components() {
    match component {
      Component::ParentDir => {
        if !components.is_empty() {
          components.pop();
        }
      }
      Component::CurDir => {}
      other => {
        components.push(other);
      }
    }
  }

  components.iter().collect()
}
