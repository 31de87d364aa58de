//! File system helpers used by the pipeline.
//!
//! Every helper creates missing parent directories and attaches the path to
//! the error so failures name the file involved.

use crate::bundler::{
    Error,
    error::{ErrorExt, Result},
};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Creates all directories of `path`, erasing it first if requested.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes a directory tree; a missing directory is not an error.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(Error::Fs {
            context: "removing directory",
            path: path.to_path_buf(),
            error,
        }),
    }
}

/// Removes a file; a missing file is not an error.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(Error::Fs {
            context: "removing file",
            path: path.to_path_buf(),
            error,
        }),
    }
}

/// Copies a regular file, keeping its permission bits.
///
/// Fails if the source is missing or not a file.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::metadata(from)
        .await
        .fs_context("reading metadata of", from)?;
    if !metadata.is_file() {
        return Err(Error::GenericError(format!("{} is not a file", from.display())));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    fs::copy(from, to).await.fs_context("copying to", to)?;
    Ok(())
}

/// Writes `content` to `to`, marking it executable when requested.
pub async fn write_file(to: &Path, content: &[u8], executable: bool) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    fs::write(to, content).await.fs_context("writing", to)?;
    if executable {
        set_executable(to).await?;
    }
    Ok(())
}

#[cfg(unix)]
async fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)
        .await
        .fs_context("reading metadata of", path)?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions)
        .await
        .fs_context("setting permissions of", path)
}

#[cfg(not(unix))]
async fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Recursively copies a directory, preserving symlinks.
///
/// Existing files at the destination are overwritten.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return Err(Error::GenericError(format!(
            "{} is not a directory",
            from.display()
        )));
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || copy_dir_blocking(&from, &to))
        .await
        .map_err(|e| Error::GenericError(format!("directory copy task panicked: {e}")))?
}

fn copy_dir_blocking(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).fs_context("creating directory", to)?;

    for entry in walkdir::WalkDir::new(from).sort_by_file_name().min_depth(1) {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target = std::fs::read_link(entry.path()).fs_context("reading link", entry.path())?;
            replace_with_symlink(&target, &dest_path, entry.path().is_dir())?;
        } else if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest_path).fs_context("creating directory", &dest_path)?;
        } else {
            std::fs::copy(entry.path(), &dest_path).fs_context("copying to", &dest_path)?;
        }
    }

    Ok(())
}

fn replace_with_symlink(target: &Path, link: &Path, is_dir: bool) -> Result<()> {
    if link.symlink_metadata().is_ok() {
        std::fs::remove_file(link).fs_context("replacing", link)?;
    }
    symlink(target, link, is_dir).fs_context("creating symlink", link)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path, _is_dir: bool) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Regular files beneath `dir`, sorted, relative to `dir`.
pub fn list_files_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1)
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.path().strip_prefix(dir)?.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_dir_overwrites_and_nests() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("a/b")).unwrap();
        std::fs::write(src.join("a/b/file.txt"), "new").unwrap();
        std::fs::write(src.join("top.txt"), "top").unwrap();

        let dst = tmp.path().join("dst");
        std::fs::create_dir_all(dst.join("a/b")).unwrap();
        std::fs::write(dst.join("a/b/file.txt"), "old").unwrap();

        copy_dir(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read_to_string(dst.join("a/b/file.txt")).unwrap(), "new");
        assert_eq!(
            list_files_sorted(&dst).unwrap(),
            vec![PathBuf::from("a/b/file.txt"), PathBuf::from("top.txt")]
        );
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let tmp = TempDir::new().unwrap();
        remove_dir_all(&tmp.path().join("missing")).await.unwrap();
        remove_file(&tmp.path().join("missing.txt")).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_file_executable() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bin/tool");
        write_file(&path, b"#!/bin/sh\n", true).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }
}
