use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Platform a build is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildTarget {
  WindowsX64,
  Linux,
  MacOs,
  WebGl,
}

impl BuildTarget {
  /// Directory segment used under the build root, if the target has one.
  ///
  /// A target without a template cannot be resolved; the resolver surfaces
  /// this as an error instead of producing an empty path.
  pub fn platform_dir(&self) -> Option<&'static str> {
    match self {
      BuildTarget::WindowsX64 => Some("Windows"),
      BuildTarget::Linux => Some("Linux"),
      BuildTarget::MacOs => Some("MacOS"),
      BuildTarget::WebGl => None,
    }
  }

  /// How the backend lays out its output for this target.
  pub fn packaging(&self, info: &BuildInfo) -> Packaging {
    match self {
      BuildTarget::WindowsX64 => Packaging::SingleFile {
        file_name: info.output_file_name(),
      },
      _ => Packaging::Tree,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      BuildTarget::WindowsX64 => "WindowsX64",
      BuildTarget::Linux => "Linux",
      BuildTarget::MacOs => "MacOS",
      BuildTarget::WebGl => "WebGL",
    }
  }
}

impl std::fmt::Display for BuildTarget {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Output layout produced by the backend for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packaging {
  /// One executable written alongside the build directory. Staging deletes
  /// only that file and leaves the directory tree intact.
  SingleFile { file_name: String },
  /// A directory tree of output files. Staging removes and recreates the
  /// whole tree.
  Tree,
}

/// Caller-supplied build configuration. Read-only during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
  pub app_name: String,
  pub company_name: String,
  pub version: String,
  pub release: bool,
  pub one_archive_per_unit: bool,
}

impl BuildInfo {
  /// Name of the single-file output for targets that produce one.
  pub fn output_file_name(&self) -> String {
    format!("{}.exe", self.app_name)
  }

  /// Application name with spaces removed, as embedded in archive names.
  pub fn compact_app_name(&self) -> String {
    self.app_name.replace(' ', "")
  }
}

/// One independently buildable entry point within a build request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildUnit {
  pub source: String,
}

impl BuildUnit {
  pub fn new(source: impl Into<String>) -> Self {
    Self { source: source.into() }
  }

  /// Base name of the unit: leading directories and the final extension
  /// stripped. Both `/` and `\` count as separators.
  pub fn unit_name(&self) -> &str {
    let base = self.source.rsplit(['/', '\\']).next().unwrap_or(&self.source);
    match base.rsplit_once('.') {
      Some((stem, _)) if !stem.is_empty() => stem,
      _ => base,
    }
  }
}

/// Opaque option bits forwarded to the backend untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions(u32);

impl BuildOptions {
  pub const NONE: BuildOptions = BuildOptions(0);
  pub const DEVELOPMENT: BuildOptions = BuildOptions(1);
  pub const AUTO_RUN: BuildOptions = BuildOptions(1 << 1);
  pub const CLEAN_BUILD_CACHE: BuildOptions = BuildOptions(1 << 2);

  pub fn from_bits(bits: u32) -> Self {
    Self(bits)
  }

  pub fn bits(self) -> u32 {
    self.0
  }

  pub fn contains(self, other: BuildOptions) -> bool {
    self.0 & other.0 == other.0
  }
}

impl std::ops::BitOr for BuildOptions {
  type Output = BuildOptions;

  fn bitor(self, rhs: BuildOptions) -> BuildOptions {
    BuildOptions(self.0 | rhs.0)
  }
}

/// Whether each unit gets its own archive or all units share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMode {
  PerUnit,
  Combined,
}

impl ArchiveMode {
  pub fn for_info(info: &BuildInfo) -> Self {
    if info.one_archive_per_unit {
      ArchiveMode::PerUnit
    } else {
      ArchiveMode::Combined
    }
  }
}

/// Configuration for archive destination and job execution.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
  /// Explicit directory to place archives in. When set, the ancestor climb
  /// is not used.
  pub archive_root: Option<PathBuf>,

  /// How many directory levels above the per-unit build directory the
  /// archive lands when no explicit root is set.
  pub ancestor_levels: usize,

  /// Maximum number of per-unit archive jobs to run at once. 1 = sequential.
  pub parallelism: usize,
}

impl Default for ArchiveConfig {
  fn default() -> Self {
    Self {
      archive_root: None,
      ancestor_levels: 3,
      parallelism: 1,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn info() -> BuildInfo {
    BuildInfo {
      app_name: "Star Probe".to_string(),
      company_name: "Acme".to_string(),
      version: "1.2.0".to_string(),
      release: false,
      one_archive_per_unit: true,
    }
  }

  mod build_unit {
    use super::*;

    #[test]
    fn strips_directories_and_extension() {
      assert_eq!(BuildUnit::new("Assets/Scenes/Level1.unity").unit_name(), "Level1");
      assert_eq!(BuildUnit::new("Assets\\Scenes\\Level1.unity").unit_name(), "Level1");
    }

    #[test]
    fn bare_name_without_extension_is_unchanged() {
      assert_eq!(BuildUnit::new("Level1").unit_name(), "Level1");
    }

    #[test]
    fn only_final_extension_is_stripped() {
      assert_eq!(BuildUnit::new("scenes/Level1.v2.unity").unit_name(), "Level1.v2");
    }

    #[test]
    fn dotfile_name_is_kept_whole() {
      assert_eq!(BuildUnit::new(".hidden").unit_name(), ".hidden");
    }
  }

  mod build_target {
    use super::*;

    #[test]
    fn windows_uses_single_file_packaging() {
      match BuildTarget::WindowsX64.packaging(&info()) {
        Packaging::SingleFile { file_name } => assert_eq!(file_name, "Star Probe.exe"),
        Packaging::Tree => panic!("expected single-file packaging"),
      }
    }

    #[test]
    fn linux_uses_tree_packaging() {
      assert_eq!(BuildTarget::Linux.packaging(&info()), Packaging::Tree);
    }

    #[test]
    fn webgl_has_no_platform_dir() {
      assert!(BuildTarget::WebGl.platform_dir().is_none());
    }
  }

  mod build_options {
    use super::*;

    #[test]
    fn bitor_combines_flags() {
      let opts = BuildOptions::DEVELOPMENT | BuildOptions::AUTO_RUN;
      assert!(opts.contains(BuildOptions::DEVELOPMENT));
      assert!(opts.contains(BuildOptions::AUTO_RUN));
      assert!(!opts.contains(BuildOptions::CLEAN_BUILD_CACHE));
    }

    #[test]
    fn none_contains_only_none() {
      assert!(BuildOptions::NONE.contains(BuildOptions::NONE));
      assert!(!BuildOptions::NONE.contains(BuildOptions::DEVELOPMENT));
    }
  }

  #[test]
  fn compact_app_name_drops_spaces() {
    assert_eq!(info().compact_app_name(), "StarProbe");
  }

  #[test]
  fn archive_mode_follows_info_flag() {
    let mut i = info();
    assert_eq!(ArchiveMode::for_info(&i), ArchiveMode::PerUnit);
    i.one_archive_per_unit = false;
    assert_eq!(ArchiveMode::for_info(&i), ArchiveMode::Combined);
  }
}
