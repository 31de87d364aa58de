//! Reading and verifying archives.

use super::{
    header::{FileEntry, Header, HeaderNode, PRELUDE_SIZE, parse_prelude},
    integrity::{self, IntegrityRecord},
    unpacked_dir,
};
use crate::bundler::{Error, Result, error::ErrorExt, utils::fs};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// An opened archive.
#[derive(Debug, Clone)]
pub struct ArchiveReader {
    path: PathBuf,
    header: Header,
    body_offset: u64,
}

impl ArchiveReader {
    /// Opens an archive and parses its header.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = tokio::fs::File::open(path)
            .await
            .fs_context("opening archive", path)?;

        let mut prelude = [0u8; PRELUDE_SIZE];
        file.read_exact(&mut prelude)
            .await
            .fs_context("reading archive prelude", path)?;
        let prelude = parse_prelude(&prelude)?;

        let mut json = vec![0u8; prelude.json_len];
        file.read_exact(&mut json)
            .await
            .fs_context("reading archive header", path)?;
        let json = String::from_utf8(json)
            .map_err(|_| Error::GenericError(format!("{}: header is not UTF-8", path.display())))?;

        Ok(Self {
            path: path.to_path_buf(),
            header: Header::from_json(&json)?,
            body_offset: prelude.body_offset,
        })
    }

    /// Archive path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Node at a path inside the archive.
    pub fn stat(&self, path: impl AsRef<Path>) -> Option<&HeaderNode> {
        self.header.get(path.as_ref())
    }

    /// File leaf at a path, failing if it is missing or a directory.
    pub fn file_entry(&self, path: impl AsRef<Path>) -> Result<&FileEntry> {
        let path = path.as_ref();
        match self.stat(path) {
            Some(HeaderNode::File(entry)) => Ok(entry),
            Some(HeaderNode::Directory { .. }) => Err(Error::GenericError(format!(
                "{} in {} is a directory",
                path.display(),
                self.path.display()
            ))),
            None => Err(Error::GenericError(format!(
                "{} not found in {}",
                path.display(),
                self.path.display()
            ))),
        }
    }

    /// Paths of all files, sorted.
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.header.files().into_iter().map(|(path, _)| path).collect()
    }

    /// Reads a file from the body or the unpacked mirror.
    pub async fn read_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let entry = self.file_entry(path)?;
        self.read_entry(path, entry).await
    }

    async fn read_entry(&self, path: &Path, entry: &FileEntry) -> Result<Vec<u8>> {
        if entry.unpacked {
            let mirrored = unpacked_dir(&self.path).join(path);
            return tokio::fs::read(&mirrored)
                .await
                .fs_context("reading unpacked file", mirrored);
        }

        let offset = entry.body_offset()?.unwrap_or(0);
        let mut file = tokio::fs::File::open(&self.path)
            .await
            .fs_context("opening archive", &self.path)?;
        file.seek(SeekFrom::Start(self.body_offset + offset))
            .await
            .fs_context("seeking in archive", &self.path)?;
        let mut data = Vec::new();
        file.take(entry.size)
            .read_to_end(&mut data)
            .await
            .fs_context("reading archive body", &self.path)?;
        if data.len() as u64 != entry.size {
            return Err(Error::Configuration(format!(
                "{} in {} is truncated: header records {} bytes, archive holds {}",
                path.display(),
                self.path.display(),
                entry.size,
                data.len()
            )));
        }
        Ok(data)
    }

    /// Writes every file into `dest`, restoring the executable bit.
    pub async fn extract_all(&self, dest: &Path) -> Result<usize> {
        let files = self.header.files();
        for (path, entry) in &files {
            let data = self.read_entry(path, entry).await?;
            fs::write_file(&dest.join(path), &data, entry.executable).await?;
        }
        Ok(files.len())
    }

    /// Checks every recorded file hash and, when given, the archive digest.
    ///
    /// The first mismatch is reported as a configuration error naming the path.
    pub async fn verify(&self, record: Option<&IntegrityRecord>) -> Result<()> {
        for (path, entry) in self.header.files() {
            let Some(expected) = &entry.integrity else {
                continue;
            };
            let data = self.read_entry(&path, entry).await?;
            let actual = integrity::hash_bytes(&data);
            if actual.hash != expected.hash || data.len() as u64 != entry.size {
                return Err(Error::Configuration(format!(
                    "integrity check failed for {} in {}",
                    path.display(),
                    self.path.display()
                )));
            }
        }

        if let Some(record) = record {
            let actual = IntegrityRecord::compute(record.file.clone(), &self.header)?;
            if actual.hash != record.hash {
                return Err(Error::Configuration(format!(
                    "integrity digest of {} does not match the recorded value",
                    self.path.display()
                )));
            }
        }
        Ok(())
    }
}
