//! SHA-256 integrity hashes for archived files and the archive as a whole.

use super::header::{FileIntegrity, Header, INTEGRITY_BLOCK_SIZE};
use crate::bundler::{Result, error::ErrorExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Algorithm name recorded in headers and records.
pub const ALGORITHM: &str = "SHA256";

/// Digest of one archive, checked by the runtime loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityRecord {
    /// Archive file name relative to the resources directory.
    pub file: String,
    pub algorithm: String,
    /// Hex SHA-256 of the header JSON (integrity-exempt leaves removed).
    pub hash: String,
}

impl IntegrityRecord {
    /// Computes the record for `header`.
    pub fn compute(file: impl Into<String>, header: &Header) -> Result<Self> {
        let json = header.digest_view().to_json()?;
        Ok(Self {
            file: file.into(),
            algorithm: ALGORITHM.to_string(),
            hash: hex::encode(Sha256::digest(json.as_bytes())),
        })
    }
}

/// Accumulates whole-file and per-block hashes.
struct BlockHasher {
    whole: Sha256,
    block: Sha256,
    block_fill: u64,
    blocks: Vec<String>,
    size: u64,
}

impl BlockHasher {
    fn new() -> Self {
        Self {
            whole: Sha256::new(),
            block: Sha256::new(),
            block_fill: 0,
            blocks: Vec::new(),
            size: 0,
        }
    }

    fn update(&mut self, mut data: &[u8]) {
        self.whole.update(data);
        self.size += data.len() as u64;
        while !data.is_empty() {
            let room = (INTEGRITY_BLOCK_SIZE - self.block_fill) as usize;
            let take = room.min(data.len());
            self.block.update(&data[..take]);
            self.block_fill += take as u64;
            data = &data[take..];
            if self.block_fill == INTEGRITY_BLOCK_SIZE {
                let block = std::mem::take(&mut self.block);
                self.blocks.push(hex::encode(block.finalize()));
                self.block_fill = 0;
            }
        }
    }

    fn finish(mut self) -> (FileIntegrity, u64) {
        // An empty file still gets one block.
        if self.block_fill > 0 || self.blocks.is_empty() {
            self.blocks.push(hex::encode(self.block.finalize()));
        }
        (
            FileIntegrity {
                algorithm: ALGORITHM.to_string(),
                hash: hex::encode(self.whole.finalize()),
                block_size: INTEGRITY_BLOCK_SIZE,
                blocks: self.blocks,
            },
            self.size,
        )
    }
}

/// Integrity of in-memory content.
pub fn hash_bytes(content: &[u8]) -> FileIntegrity {
    let mut hasher = BlockHasher::new();
    hasher.update(content);
    hasher.finish().0
}

/// Integrity of a file plus the number of bytes hashed.
pub async fn hash_file(path: &Path) -> Result<(FileIntegrity, u64)> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    let mut hasher = BlockHasher::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hashing", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::archive::header::FileEntry;

    #[test]
    fn test_hash_bytes_known_value() {
        let integrity = hash_bytes(b"abc");
        assert_eq!(
            integrity.hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(integrity.blocks, vec![integrity.hash.clone()]);
    }

    #[test]
    fn test_block_boundaries() {
        let data = vec![7u8; INTEGRITY_BLOCK_SIZE as usize + 1];
        let integrity = hash_bytes(&data);
        assert_eq!(integrity.blocks.len(), 2);
        assert_eq!(integrity.blocks[1], hex::encode(Sha256::digest([7u8])));
        assert_eq!(hash_bytes(b"").blocks.len(), 1);
    }

    #[test]
    fn test_record_ignores_exempt_leaves() {
        let hashed = FileEntry {
            size: 3,
            offset: Some("0".into()),
            executable: false,
            unpacked: false,
            integrity: Some(hash_bytes(b"abc")),
        };
        let exempt = |size| FileEntry {
            size,
            offset: None,
            executable: false,
            unpacked: true,
            integrity: None,
        };

        let mut a = Header::default();
        a.insert(Path::new("app.js"), hashed.clone()).unwrap();
        a.insert(Path::new("native.node"), exempt(10)).unwrap();
        let mut b = Header::default();
        b.insert(Path::new("app.js"), hashed).unwrap();
        b.insert(Path::new("native.node"), exempt(99)).unwrap();

        let ra = IntegrityRecord::compute("app.asar", &a).unwrap();
        let rb = IntegrityRecord::compute("app.asar", &b).unwrap();
        assert_eq!(ra, rb);
        assert_eq!(ra.algorithm, "SHA256");
    }
}
