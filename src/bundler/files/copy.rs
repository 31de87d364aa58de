//! Copies a file set into a directory.

use super::file_set::{FileSet, FileSetEntry};
use crate::bundler::{Error, Result, utils::fs};
use std::path::Path;
use std::sync::Arc;
use tokio::{sync::Semaphore, task::JoinSet};

/// Copies every surviving entry of `set` beneath `dest_root`.
///
/// Duplicate destinations are resolved last-write-wins before anything is
/// written, so concurrent copies never target the same path. Returns the
/// number of files written.
pub async fn copy_file_set(set: &FileSet, dest_root: &Path) -> Result<usize> {
    let entries: Vec<FileSetEntry> = set.resolved().into_iter().cloned().collect();
    copy_entries(entries, dest_root, num_cpus::get()).await
}

async fn copy_entries(entries: Vec<FileSetEntry>, dest_root: &Path, concurrency: usize) -> Result<usize> {
    let total = entries.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for entry in entries {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::GenericError(format!("copy semaphore closed: {e}")))?;
        let target = dest_root.join(&entry.destination);
        tasks.spawn(async move {
            let _permit = permit;
            match &entry.content {
                Some(content) => fs::write_file(&target, content, entry.executable).await,
                None => fs::copy_file(&entry.source, &target).await,
            }
        });

        // Surface failures early instead of after the whole set is queued.
        while let Some(done) = tasks.try_join_next() {
            done??;
        }
    }

    while let Some(done) = tasks.join_next().await {
        done??;
    }

    log::debug!("copied {total} files to {}", dest_root.display());
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::files::file_set::FileGroup;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_last_write_wins_and_content() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("a.txt"), "first").unwrap();
        std::fs::write(src.join("b.txt"), "second").unwrap();

        let mut set = FileSet::new();
        set.push_group(FileGroup {
            source_root: src.clone(),
            entries: vec![
                FileSetEntry {
                    source: src.join("a.txt"),
                    destination: PathBuf::from("out/x.txt"),
                    content: None,
                    size: 5,
                    executable: false,
                },
                FileSetEntry {
                    source: src.join("a.txt"),
                    destination: PathBuf::from("gen.json"),
                    content: Some(b"{}".to_vec()),
                    size: 2,
                    executable: false,
                },
            ],
        });
        set.push_group(FileGroup {
            source_root: src.clone(),
            entries: vec![FileSetEntry {
                source: src.join("b.txt"),
                destination: PathBuf::from("out/x.txt"),
                content: None,
                size: 6,
                executable: false,
            }],
        });

        let dest = tmp.path().join("dest");
        let written = copy_file_set(&set, &dest).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(std::fs::read_to_string(dest.join("out/x.txt")).unwrap(), "second");
        assert_eq!(std::fs::read_to_string(dest.join("gen.json")).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let tmp = TempDir::new().unwrap();
        let entries = vec![FileSetEntry {
            source: tmp.path().join("missing"),
            destination: PathBuf::from("x"),
            content: None,
            size: 0,
            executable: false,
        }];
        assert!(copy_entries(entries, tmp.path(), 2).await.is_err());
    }
}
