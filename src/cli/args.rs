//! Command line argument parsing and validation.

use clap::Parser;
use std::path::PathBuf;

/// Packaging pipeline for desktop applications
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_package",
    version,
    about = "Packages a staged desktop application into per-architecture output directories",
    long_about = "Copies the application files selected by the configured patterns, packs them into
app.asar (unless disabled), copies extra resources and files, verifies the entry point
and builds the requested targets.

Usage:
  kodegen_bundler_package app --output dist
  kodegen_bundler_package app --platform win --arch x64,arm64 --target dir,checksum
  kodegen_bundler_package app --config packager.toml --no-asar

Exit code 0 = every architecture was packaged; 130 = cancelled."
)]
pub struct Args {
    /// Staged application directory containing package.json
    #[arg(value_name = "APP_DIR", default_value = "app")]
    pub app_dir: PathBuf,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "dist")]
    pub output: PathBuf,

    /// Project directory. Default: parent of APP_DIR
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Target platform: linux, mac, win. Default: host platform
    #[arg(short, long, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Architectures: x64, ia32, armv7l, arm64, universal
    #[arg(short, long, value_name = "ARCH", value_delimiter = ',')]
    pub arch: Vec<String>,

    /// Packager configuration (TOML). Default: <project>/packager.toml if present
    #[arg(short, long, value_name = "FILE", env = "KODEGEN_PACKAGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Targets to build from each output directory
    #[arg(short, long, value_name = "TARGET", value_delimiter = ',', default_value = "dir")]
    pub target: Vec<String>,

    /// Use an already packaged directory and only build targets
    #[arg(long, value_name = "DIR")]
    pub prepackaged: Option<PathBuf>,

    /// Copy the application unarchived into resources/app
    #[arg(long)]
    pub no_asar: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.target.iter().any(|t| t.trim().is_empty()) {
            return Err("Target names cannot be empty".to_string());
        }
        if self.arch.iter().any(|a| a.trim().is_empty()) {
            return Err("Architecture names cannot be empty".to_string());
        }
        if let Some(prepackaged) = &self.prepackaged
            && !prepackaged.is_dir()
        {
            return Err(format!(
                "Prepackaged directory {} does not exist",
                prepackaged.display()
            ));
        }
        Ok(())
    }
}
