//! Single-file application archive (asar-compatible layout).
//!
//! The archive holds a JSON header describing the directory tree followed by
//! the concatenated bytes of every packed file. Files selected by the
//! [`UnpackFilter`] stay outside the body in a mirror directory next to the
//! archive, so they can be loaded straight from the file system at runtime.

pub mod header;
pub mod integrity;
pub mod reader;
pub mod unpack;
pub mod writer;

pub use header::{FileEntry, FileIntegrity, Header, HeaderNode};
pub use integrity::IntegrityRecord;
pub use reader::ArchiveReader;
pub use unpack::{IntegrityExemptions, UnpackFilter};
pub use writer::{PackedArchive, pack};

use std::path::{Path, PathBuf};

/// Archive file name inside the resources directory.
pub const ARCHIVE_NAME: &str = "app.asar";

/// Mirror directory of an archive's unpacked files.
pub fn unpacked_dir(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    name.push(".unpacked");
    PathBuf::from(name)
}
