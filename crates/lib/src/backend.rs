//! The opaque build backend contract and a process-spawning adapter.
//!
//! The orchestrator never inspects the backend's internals; any toolchain
//! that can produce a [`BuildReport`] is pluggable through [`Backend`].

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::types::{BuildOptions, BuildTarget, BuildUnit};

#[derive(Debug, Error)]
pub enum BackendError {
  /// The backend process could not be spawned or crashed before producing
  /// any report.
  #[error("failed to run backend command '{cmd}': {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },
}

/// What the backend reported after running.
///
/// A nonzero `error_count` marks the report as failed even when the backend
/// claimed success.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
  pub succeeded: bool,
  pub error_count: usize,
  pub messages: Vec<String>,
}

impl BuildReport {
  pub fn success() -> Self {
    Self {
      succeeded: true,
      ..Default::default()
    }
  }

  pub fn failure(messages: Vec<String>) -> Self {
    Self {
      succeeded: false,
      error_count: messages.len(),
      messages,
    }
  }

  pub fn is_success(&self) -> bool {
    self.succeeded && self.error_count == 0
  }
}

/// External toolchain that performs the actual compilation.
pub trait Backend {
  fn build(
    &self,
    units: &[BuildUnit],
    output_dir: &Path,
    target: BuildTarget,
    options: BuildOptions,
    settings: &BTreeMap<String, String>,
  ) -> Result<BuildReport, BackendError>;
}

/// Backend adapter that runs a configured toolchain command in a shell.
///
/// The invocation context is exported as environment variables:
/// `STAGECRAFT_OUT` (output directory), `STAGECRAFT_TARGET`,
/// `STAGECRAFT_UNITS` (`;`-separated unit sources), `STAGECRAFT_OPTIONS`
/// (raw option bits), plus the settings-profile map. A nonzero exit becomes
/// a failed report carrying the stderr lines as diagnostics; a process that
/// cannot be spawned is a [`BackendError`].
pub struct CommandBackend {
  command: String,
  shell: Option<String>,
}

impl CommandBackend {
  pub fn new(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
      shell: None,
    }
  }

  pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
    self.shell = Some(shell.into());
    self
  }
}

impl Backend for CommandBackend {
  fn build(
    &self,
    units: &[BuildUnit],
    output_dir: &Path,
    target: BuildTarget,
    options: BuildOptions,
    settings: &BTreeMap<String, String>,
  ) -> Result<BuildReport, BackendError> {
    let (shell_cmd, shell_args) = get_shell(self.shell.as_deref());
    let unit_list = units.iter().map(|u| u.source.as_str()).collect::<Vec<_>>().join(";");

    let mut command = Command::new(&shell_cmd);
    command
      .args(&shell_args)
      .arg(&self.command)
      .env("STAGECRAFT_OUT", output_dir)
      .env("STAGECRAFT_TARGET", target.as_str())
      .env("STAGECRAFT_UNITS", unit_list)
      .env("STAGECRAFT_OPTIONS", options.bits().to_string());

    for (key, value) in settings {
      command.env(key, value);
    }

    debug!(shell = %shell_cmd, command = %self.command, "spawning backend");

    let output = command.output().map_err(|e| BackendError::Spawn {
      cmd: self.command.clone(),
      source: e,
    })?;

    if output.status.success() {
      return Ok(BuildReport::success());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut messages: Vec<String> = stderr
      .lines()
      .filter(|line| !line.trim().is_empty())
      .map(str::to_string)
      .collect();
    if messages.is_empty() {
      messages.push(format!(
        "backend exited with status {:?}",
        output.status.code()
      ));
    }

    Ok(BuildReport::failure(messages))
  }
}

/// Shell command and argument vector for the current platform.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}
