//! Settings profiles and backend invocation.
//!
//! The profile applied before a build is selected by the release flag from a
//! table of `(profile, apply_fn)` entries; adding a profile is a table row,
//! not a new type.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{error, info};

use crate::backend::{Backend, BackendError, BuildReport};
use crate::types::{BuildInfo, BuildOptions, BuildTarget, BuildUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsProfile {
  Debug,
  Release,
}

impl SettingsProfile {
  pub fn for_info(info: &BuildInfo) -> Self {
    if info.release {
      SettingsProfile::Release
    } else {
      SettingsProfile::Debug
    }
  }
}

type ApplyFn = fn(&mut BTreeMap<String, String>, &str, &str);

const PROFILES: &[(SettingsProfile, ApplyFn)] = &[
  (SettingsProfile::Debug, apply_debug),
  (SettingsProfile::Release, apply_release),
];

fn apply_common(settings: &mut BTreeMap<String, String>, app_name: &str, company_name: &str) {
  settings.insert("PRODUCT_NAME".to_string(), app_name.to_string());
  settings.insert("COMPANY_NAME".to_string(), company_name.to_string());
}

fn apply_debug(settings: &mut BTreeMap<String, String>, app_name: &str, company_name: &str) {
  apply_common(settings, app_name, company_name);
  settings.insert("DEVELOPMENT".to_string(), "1".to_string());
  settings.insert("LOG_LEVEL".to_string(), "verbose".to_string());
  settings.insert("OPTIMIZE".to_string(), "0".to_string());
  settings.insert("STRIP_SYMBOLS".to_string(), "0".to_string());
}

fn apply_release(settings: &mut BTreeMap<String, String>, app_name: &str, company_name: &str) {
  apply_common(settings, app_name, company_name);
  settings.insert("DEVELOPMENT".to_string(), "0".to_string());
  settings.insert("LOG_LEVEL".to_string(), "warn".to_string());
  settings.insert("OPTIMIZE".to_string(), "1".to_string());
  settings.insert("STRIP_SYMBOLS".to_string(), "1".to_string());
}

/// Settings map for a profile, ready to hand to the backend.
pub fn profile_settings(profile: SettingsProfile, app_name: &str, company_name: &str) -> BTreeMap<String, String> {
  let mut settings = BTreeMap::new();
  if let Some((_, apply)) = PROFILES.iter().find(|(p, _)| *p == profile) {
    apply(&mut settings, app_name, company_name);
  }
  settings
}

/// Apply the settings profile and delegate compilation to the backend.
///
/// The returned report is classified: failure iff the backend signalled
/// failure or its error count is nonzero. Diagnostics are logged here, one
/// line per message; a clean run logs a single confirmation.
pub fn invoke<B: Backend + ?Sized>(
  backend: &B,
  units: &[BuildUnit],
  info: &BuildInfo,
  target: BuildTarget,
  options: BuildOptions,
  output_dir: &Path,
) -> Result<BuildReport, BackendError> {
  let profile = SettingsProfile::for_info(info);
  let settings = profile_settings(profile, &info.app_name, &info.company_name);

  let mut report = backend.build(units, output_dir, target, options, &settings)?;
  report.succeeded = report.is_success();

  if report.succeeded {
    info!(build_target = %target, "backend build successful");
  } else {
    for message in &report.messages {
      error!(build_target = %target, "{message}");
    }
  }

  Ok(report)
}
