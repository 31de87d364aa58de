//! SHA-256 checksums of output files and directory trees.

use crate::{bail, bundler::Result, bundler::error::ErrorExt};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Hex SHA-256 of a file, or of a whole directory tree.
///
/// Directory hashes cover each file's relative path (with `/` separators)
/// and its content, in sorted path order, so the result does not depend on
/// the host's directory iteration order. Path and content are each prefixed
/// with their length as a little-endian `u64`.
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading metadata of", path)?;

    let mut hasher = Sha256::new();
    if metadata.is_file() {
        hash_file_into(&mut hasher, path).await?;
    } else if metadata.is_dir() {
        let files = {
            let dir = path.to_path_buf();
            tokio::task::spawn_blocking(move || crate::bundler::utils::fs::list_files_sorted(&dir))
                .await??
        };
        for relative in files {
            let name = crate::bundler::files::matcher::to_slash(&relative);
            let file = path.join(&relative);
            let size = tokio::fs::metadata(&file)
                .await
                .fs_context("reading metadata of", &file)?
                .len();
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update(size.to_le_bytes());
            hash_file_into(&mut hasher, &file).await?;
        }
    } else {
        bail!("{} is neither a file nor a directory", path.display())
    }

    Ok(hex::encode(hasher.finalize()))
}

async fn hash_file_into(hasher: &mut Sha256, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    let mut buffer = vec![0u8; 8192];
    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hashing", path)?;
        if n == 0 {
            return Ok(());
        }
        hasher.update(&buffer[..n]);
    }
}
