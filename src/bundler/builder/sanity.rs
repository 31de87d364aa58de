//! Post-pack verification that the output can actually start.

use crate::bundler::{
    Error, Result,
    archive::{ArchiveReader, HeaderNode},
    error::{Context, ErrorExt},
    settings::DEFAULT_ENTRY_FILE,
};
use std::path::{Path, PathBuf};

/// Package descriptor that must be present in the application.
pub const DESCRIPTOR: &str = "package.json";

/// Verifies the output directory, the package descriptor and the entry file.
///
/// Looks inside `archive` when given, otherwise in the `app_dir` on disk.
pub async fn check_output(app_out_dir: &Path, app_dir: &Path, archive: Option<&Path>) -> Result<()> {
    let metadata = tokio::fs::metadata(app_out_dir)
        .await
        .fs_context("checking output directory", app_out_dir)?;
    if !metadata.is_dir() {
        return Err(Error::Configuration(format!(
            "output path {} is not a directory",
            app_out_dir.display()
        )));
    }

    match archive {
        Some(archive) => check_archive(archive).await,
        None => check_directory(app_dir).await,
    }
}

async fn check_archive(archive: &Path) -> Result<()> {
    let reader = ArchiveReader::open(archive)
        .await
        .with_context(|| format!("opening packed application {}", archive.display()))?;

    match reader.stat(DESCRIPTOR) {
        Some(HeaderNode::File(_)) => {}
        _ => {
            return Err(Error::Configuration(format!(
                "Application descriptor \"{DESCRIPTOR}\" does not exist in {}. \
                 Make sure your file patterns include it.",
                archive.display()
            )));
        }
    }

    let descriptor = reader.read_file(DESCRIPTOR).await?;
    let entry = entry_file(&descriptor, archive)?;

    match reader.stat(&entry) {
        Some(HeaderNode::File(file)) if file.unpacked => Err(Error::Configuration(format!(
            "Application entry file \"{}\" in {} is unpacked. \
             List it in the file patterns and not in asar.unpack.",
            entry.display(),
            archive.display()
        ))),
        Some(HeaderNode::File(_)) => Ok(()),
        _ => Err(missing_entry(&entry, archive)),
    }
}

async fn check_directory(app_dir: &Path) -> Result<()> {
    let descriptor_path = app_dir.join(DESCRIPTOR);
    if !is_file(&descriptor_path).await {
        return Err(Error::Configuration(format!(
            "Application descriptor {} does not exist. Make sure your file patterns include it.",
            descriptor_path.display()
        )));
    }
    let descriptor = tokio::fs::read(&descriptor_path)
        .await
        .fs_context("reading", &descriptor_path)?;
    let entry = entry_file(&descriptor, &descriptor_path)?;

    if !is_file(&app_dir.join(&entry)).await {
        return Err(missing_entry(&entry, app_dir));
    }
    Ok(())
}

/// `main` of a package descriptor, relative and normalized.
fn entry_file(descriptor: &[u8], origin: &Path) -> Result<PathBuf> {
    let value: serde_json::Value = serde_json::from_slice(descriptor).map_err(|e| {
        Error::Configuration(format!("{DESCRIPTOR} in {} is not valid JSON: {e}", origin.display()))
    })?;
    let main = value
        .get("main")
        .and_then(|m| m.as_str())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(DEFAULT_ENTRY_FILE);
    Ok(PathBuf::from(main.trim().trim_start_matches("./")))
}

fn missing_entry(entry: &Path, location: &Path) -> Error {
    Error::Configuration(format!(
        "Application entry file \"{}\" in {} does not exist. \
         Check \"main\" in {DESCRIPTOR} and make sure your file patterns include the entry file.",
        entry.display(),
        location.display()
    ))
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
