//! Command line interface of the packager.
//!
//! Reads `package.json` from the application directory, merges the packager
//! configuration, runs the [`Packager`] and reports one line per architecture.

mod args;

pub use args::Args;

use crate::bundler::{Arch, PackOutcome, Packager, Platform, SettingsBuilder, Target, target_by_name};
use crate::error::{BundlerError, CliError, Result};
use crate::metadata;
use std::path::Path;
use std::sync::Arc;

/// Exit code reported when the build was cancelled.
pub const EXIT_CANCELLED: i32 = 130;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;
    execute(&args).await
}

/// Runs the packager for already parsed arguments.
pub async fn execute(args: &Args) -> Result<i32> {
    let project_dir = args.project_dir.clone().unwrap_or_else(|| {
        args.app_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf()
    });

    let package = metadata::load_app_metadata(&args.app_dir)?;
    let mut bundle = metadata::discover_config(args.config.as_deref(), &project_dir)?;
    if args.no_asar {
        bundle.asar.enabled = false;
    }

    let mut builder = SettingsBuilder::new()
        .project_dir(&project_dir)
        .app_dir(&args.app_dir)
        .output_dir(&args.output)
        .package_settings(package)
        .bundle_settings(bundle)
        .archs(parse_archs(&args.arch)?);
    if let Some(platform) = &args.platform {
        builder = builder.platform(platform.parse::<Platform>()?);
    }
    if let Some(prepackaged) = &args.prepackaged {
        builder = builder.prepackaged(prepackaged);
    }
    let settings = builder.build()?;

    let packager = Packager::new(settings).targets(parse_targets(&args.target)?);
    let token = packager.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, stopping at the next checkpoint");
            token.cancel();
        }
    });

    let outcomes = packager.pack().await?;
    let mut cancelled = false;
    for outcome in &outcomes {
        match outcome {
            PackOutcome::Completed(report) => {
                println!("{} {}", report.arch, report.app_out_dir.display());
            }
            PackOutcome::Cancelled { after } => {
                cancelled = true;
                println!("cancelled after {after}");
            }
        }
    }
    Ok(if cancelled { EXIT_CANCELLED } else { 0 })
}

fn parse_archs(names: &[String]) -> Result<Vec<Arch>> {
    names
        .iter()
        .map(|name| name.trim().parse::<Arch>().map_err(BundlerError::from))
        .collect()
}

fn parse_targets(names: &[String]) -> Result<Vec<Arc<dyn Target>>> {
    names
        .iter()
        .map(|name| {
            target_by_name(name.trim()).ok_or_else(|| {
                BundlerError::Cli(CliError::UnknownTarget {
                    name: name.trim().to_string(),
                })
            })
        })
        .collect()
}
