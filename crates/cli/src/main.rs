use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use stagecraft_lib::archive;
use stagecraft_lib::backend::CommandBackend;
use stagecraft_lib::pipeline::{Pipeline, PipelineConfig};
use stagecraft_lib::resolve::PathResolver;
use stagecraft_lib::{ArchiveConfig, ArchiveMode, BuildInfo, BuildOptions, BuildTarget, BuildUnit};
use tracing_subscriber::EnvFilter;

/// stagecraft - build-and-package orchestrator
#[derive(Parser)]
#[command(name = "stagecraft")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Args)]
struct BuildRequest {
  /// Build unit entry points (scene/module paths)
  #[arg(required = true)]
  units: Vec<String>,

  /// Target platform
  #[arg(short, long, value_parser = parse_target)]
  target: BuildTarget,

  /// JSON file holding the build configuration; replaces the --app-name,
  /// --company, --app-version, --release and --per-unit flags
  #[arg(long)]
  manifest: Option<PathBuf>,

  /// Application name
  #[arg(long, required_unless_present = "manifest")]
  app_name: Option<String>,

  /// Company name
  #[arg(long, default_value = "")]
  company: String,

  /// Version string embedded in archive names
  #[arg(long, default_value = "0.0.0")]
  app_version: String,

  /// Build with the release settings profile
  #[arg(long)]
  release: bool,

  /// One archive per unit instead of a single combined archive
  #[arg(long)]
  per_unit: bool,

  /// Root directory for build outputs (default: <cwd>/Builds)
  #[arg(long)]
  build_root: Option<PathBuf>,
}

impl BuildRequest {
  fn build_info(&self) -> Result<BuildInfo> {
    if let Some(path) = &self.manifest {
      let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
      return serde_json::from_str(&text)
        .with_context(|| format!("failed to parse manifest {}", path.display()));
    }

    Ok(BuildInfo {
      app_name: self.app_name.clone().unwrap_or_default(),
      company_name: self.company.clone(),
      version: self.app_version.clone(),
      release: self.release,
      one_archive_per_unit: self.per_unit,
    })
  }

  fn build_units(&self) -> Vec<BuildUnit> {
    self.units.iter().map(BuildUnit::new).collect()
  }

  fn resolver(&self) -> Result<PathResolver> {
    match &self.build_root {
      Some(root) => Ok(PathResolver::new(root.clone())),
      None => PathResolver::from_cwd().context("failed to resolve build root"),
    }
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Stage the output directory and run the backend toolchain
  Build {
    #[command(flatten)]
    request: BuildRequest,

    /// Backend toolchain command, run with the invocation context in its
    /// environment (STAGECRAFT_OUT, STAGECRAFT_TARGET, STAGECRAFT_UNITS,
    /// STAGECRAFT_OPTIONS)
    #[arg(long)]
    backend: String,

    /// Raw option bits forwarded to the backend
    #[arg(long, default_value_t = 0)]
    options: u32,

    /// Fail instead of proceeding when the backend reports errors
    #[arg(long)]
    abort_on_failure: bool,
  },

  /// Package completed build outputs into zip archives
  Archive {
    #[command(flatten)]
    request: BuildRequest,

    /// Explicit directory for archives (default: three levels above the
    /// per-unit build directory)
    #[arg(long)]
    archive_root: Option<PathBuf>,

    /// Number of per-unit archive jobs to run at once
    #[arg(long, default_value_t = 1)]
    jobs: usize,
  },
}

fn parse_target(value: &str) -> Result<BuildTarget, String> {
  match value.to_lowercase().as_str() {
    "windows" | "windows-x64" | "windowsx64" => Ok(BuildTarget::WindowsX64),
    "linux" => Ok(BuildTarget::Linux),
    "macos" => Ok(BuildTarget::MacOs),
    "webgl" => Ok(BuildTarget::WebGl),
    other => Err(format!(
      "unknown target: {other}. Supported: windows-x64, linux, macos, webgl"
    )),
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::from_default_env()
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();

  match cli.command {
    Commands::Build {
      request,
      backend,
      options,
      abort_on_failure,
    } => cmd_build(request, backend, options, abort_on_failure),
    Commands::Archive {
      request,
      archive_root,
      jobs,
    } => cmd_archive(request, archive_root, jobs),
  }
}

fn cmd_build(request: BuildRequest, backend: String, options: u32, abort_on_failure: bool) -> Result<()> {
  let info = request.build_info()?;
  let units = request.build_units();
  let config = PipelineConfig {
    abort_on_build_failure: abort_on_failure,
    archive: ArchiveConfig::default(),
  };
  let pipeline = Pipeline::new(CommandBackend::new(backend), request.resolver()?).with_config(config);

  eprintln!(
    "{} Building {} unit(s) for {}",
    "::".cyan().bold(),
    units.len(),
    request.target
  );

  let report = pipeline.run_build(&units, &info, request.target, BuildOptions::from_bits(options), |report| {
    if report.is_success() {
      eprintln!("{} Backend build successful", "::".green().bold());
    }
  })?;

  if !report.is_success() {
    eprintln!(
      "{} Backend reported {} error(s)",
      "error:".red().bold(),
      report.error_count
    );
    for message in &report.messages {
      eprintln!("  {message}");
    }
    std::process::exit(1);
  }

  Ok(())
}

fn cmd_archive(request: BuildRequest, archive_root: Option<PathBuf>, jobs: usize) -> Result<()> {
  if jobs == 0 {
    bail!("--jobs must be at least 1");
  }

  let info = request.build_info()?;
  let units = request.build_units();
  let config = ArchiveConfig {
    archive_root,
    parallelism: jobs,
    ..Default::default()
  };

  let outcome = archive::archive(
    &request.resolver()?,
    &units,
    &info,
    request.target,
    ArchiveMode::for_info(&info),
    &config,
  )?;

  for path in &outcome.archives {
    eprintln!("{} Wrote {}", "::".green().bold(), path.display());
  }
  for (unit, error) in &outcome.failures {
    eprintln!("{} [{unit}] {error}", "error:".red().bold());
  }

  if !outcome.is_success() {
    std::process::exit(1);
  }

  Ok(())
}
