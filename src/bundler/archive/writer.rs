//! Assembles a file set into an archive plus its unpacked mirror.

use super::{
    header::{FileEntry, Header, encode_header},
    integrity::{self, IntegrityRecord},
    unpack::{IntegrityExemptions, UnpackFilter},
    unpacked_dir,
};
use crate::bundler::{
    Error, Result,
    error::ErrorExt,
    files::{FileSet, FileSetEntry},
    utils::fs,
};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};

/// Result of packing.
#[derive(Debug, Clone)]
pub struct PackedArchive {
    /// Archive file.
    pub path: PathBuf,
    /// Header as written.
    pub header: Header,
    /// Digest of the archive.
    pub integrity: IntegrityRecord,
    /// Number of body bytes.
    pub body_size: u64,
    /// Destinations written to the unpacked mirror.
    pub unpacked: Vec<PathBuf>,
}

struct Planned<'a> {
    entry: &'a FileSetEntry,
    size: u64,
    unpacked: bool,
}

/// Packs `set` into `archive_path`.
///
/// Files selected by `unpack` are copied to `<archive>.unpacked/` and get a
/// header leaf without offset. Files selected by `exempt` get no per-file
/// hash, so later changes to them (signing) leave the digest unchanged.
/// Any previous archive and mirror at the same location are replaced.
pub async fn pack(
    set: &FileSet,
    archive_path: &Path,
    unpack: &UnpackFilter,
    exempt: &IntegrityExemptions,
) -> Result<PackedArchive> {
    let mirror = unpacked_dir(archive_path);
    fs::remove_dir_all(&mirror).await?;
    fs::remove_file(archive_path).await?;

    let mut header = Header::default();
    let mut plan = Vec::new();
    let mut offset = 0u64;

    for entry in set.resolved() {
        let unpacked = unpack.is_unpacked(&entry.destination);
        let (integrity, size) = if exempt.is_exempt(&entry.destination) {
            (None, entry_size(entry).await?)
        } else {
            let (integrity, size) = match &entry.content {
                Some(content) => (integrity::hash_bytes(content), content.len() as u64),
                None => integrity::hash_file(&entry.source).await?,
            };
            (Some(integrity), size)
        };

        let leaf_offset = if unpacked {
            None
        } else {
            let current = offset;
            offset += size;
            Some(current.to_string())
        };

        header.insert(
            &entry.destination,
            FileEntry {
                size,
                offset: leaf_offset,
                executable: entry.executable,
                unpacked,
                integrity,
            },
        )?;
        plan.push(Planned {
            entry,
            size,
            unpacked,
        });
    }

    let json = header.to_json()?;
    write_archive(archive_path, &json, &plan).await?;

    let mut unpacked = Vec::new();
    for item in plan.iter().filter(|p| p.unpacked) {
        let target = mirror.join(&item.entry.destination);
        match &item.entry.content {
            Some(content) => fs::write_file(&target, content, item.entry.executable).await?,
            None => fs::copy_file(&item.entry.source, &target).await?,
        }
        unpacked.push(item.entry.destination.clone());
    }

    let file_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let record = IntegrityRecord::compute(file_name, &header)?;

    log::info!(
        "packed {} files ({} bytes, {} unpacked) into {}",
        plan.len(),
        offset,
        unpacked.len(),
        archive_path.display()
    );

    Ok(PackedArchive {
        path: archive_path.to_path_buf(),
        header,
        integrity: record,
        body_size: offset,
        unpacked,
    })
}

async fn entry_size(entry: &FileSetEntry) -> Result<u64> {
    match &entry.content {
        Some(content) => Ok(content.len() as u64),
        None => Ok(tokio::fs::metadata(&entry.source)
            .await
            .fs_context("reading metadata of", &entry.source)?
            .len()),
    }
}

async fn write_archive(path: &Path, json: &str, plan: &[Planned<'_>]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent, false).await?;
    }
    let file = tokio::fs::File::create(path)
        .await
        .fs_context("creating archive", path)?;
    let mut out = BufWriter::new(file);

    out.write_all(&encode_header(json)?)
        .await
        .fs_context("writing archive header", path)?;

    for item in plan.iter().filter(|p| !p.unpacked && p.size > 0) {
        match &item.entry.content {
            Some(content) => out
                .write_all(content)
                .await
                .fs_context("writing archive body", path)?,
            None => {
                let source = tokio::fs::File::open(&item.entry.source)
                    .await
                    .fs_context("opening", &item.entry.source)?;
                let copied = tokio::io::copy(&mut source.take(item.size), &mut out)
                    .await
                    .fs_context("copying into archive", &item.entry.source)?;
                if copied != item.size {
                    return Err(Error::GenericError(format!(
                        "{} changed while packing ({} bytes expected, {copied} read)",
                        item.entry.source.display(),
                        item.size
                    )));
                }
            }
        }
    }

    out.flush().await.fs_context("flushing archive", path)?;
    Ok(())
}
