//! Archive header tree and its binary prelude.
//!
//! Layout, all integers little-endian `u32`:
//!
//! ```text
//! +-----+--------------+--------------+----------+-------------------+------+
//! |  4  | pickle size  | payload size | json len | json (4-aligned)  | body |
//! +-----+--------------+--------------+----------+-------------------+------+
//! ```
//!
//! The prelude functions are sans-IO: they work on byte slices and leave
//! reading and writing to the caller.

use crate::bundler::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Size of the fixed prelude preceding the header JSON.
pub const PRELUDE_SIZE: usize = 16;

/// Block size used for per-file integrity hashes.
pub const INTEGRITY_BLOCK_SIZE: u64 = 4 * 1024 * 1024;

/// Per-file integrity information stored in the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIntegrity {
    pub algorithm: String,
    pub hash: String,
    #[serde(rename = "blockSize")]
    pub block_size: u64,
    pub blocks: Vec<String>,
}

/// A file leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub size: u64,
    /// Body offset as a decimal string; absent for unpacked files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub executable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unpacked: bool,
    /// Absent for integrity-exempt files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<FileIntegrity>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl FileEntry {
    /// Offset into the body, if the file is stored there.
    pub fn body_offset(&self) -> Result<Option<u64>> {
        match (&self.offset, self.unpacked) {
            (_, true) | (None, _) => Ok(None),
            (Some(offset), false) => offset.parse().map(Some).map_err(|_| {
                Error::GenericError(format!("invalid offset {offset:?} in archive header"))
            }),
        }
    }
}

/// A node of the header tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderNode {
    Directory { files: BTreeMap<String, HeaderNode> },
    File(FileEntry),
}

/// The archive header: a directory tree keyed by path segment.
///
/// Keys are kept sorted so serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    files: BTreeMap<String, HeaderNode>,
}

impl Header {
    /// Inserts a file at a destination-relative path.
    ///
    /// Replaces an existing file at the same path. A file where a directory
    /// is needed (or the reverse) is a configuration error.
    pub fn insert(&mut self, path: &Path, entry: FileEntry) -> Result<()> {
        let segments = segments(path)?;
        let Some((name, parents)) = segments.split_last() else {
            return Err(Error::Configuration("empty path in archive".to_string()));
        };

        let mut dir = &mut self.files;
        for (depth, segment) in parents.iter().enumerate() {
            let node = dir
                .entry(segment.clone())
                .or_insert_with(|| HeaderNode::Directory {
                    files: BTreeMap::new(),
                });
            dir = match node {
                HeaderNode::Directory { files } => files,
                HeaderNode::File(_) => {
                    return Err(conflict(&segments[..=depth].join("/"), path));
                }
            };
        }

        if let Some(HeaderNode::Directory { .. }) = dir.get(name) {
            return Err(conflict(&segments.join("/"), path));
        }
        dir.insert(name.clone(), HeaderNode::File(entry));
        Ok(())
    }

    /// Looks up a node by destination-relative path.
    pub fn get(&self, path: &Path) -> Option<&HeaderNode> {
        let segments = segments(path).ok()?;
        let (first, rest) = segments.split_first()?;
        let mut node = self.files.get(first)?;
        for segment in rest {
            node = match node {
                HeaderNode::Directory { files } => files.get(segment)?,
                HeaderNode::File(_) => return None,
            };
        }
        Some(node)
    }

    /// All file leaves with their paths, in sorted path order.
    pub fn files(&self) -> Vec<(PathBuf, &FileEntry)> {
        let mut out = Vec::new();
        collect_files(&self.files, PathBuf::new(), &mut out);
        out
    }

    /// Deterministic JSON serialization.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses header JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::GenericError(format!("malformed archive header: {e}")))
    }

    /// Copy of the tree with integrity-exempt leaves removed.
    ///
    /// This is the view the archive digest covers.
    pub fn digest_view(&self) -> Header {
        Header {
            files: retain_hashed(&self.files),
        }
    }
}

fn retain_hashed(files: &BTreeMap<String, HeaderNode>) -> BTreeMap<String, HeaderNode> {
    files
        .iter()
        .filter_map(|(name, node)| match node {
            HeaderNode::Directory { files } => Some((
                name.clone(),
                HeaderNode::Directory {
                    files: retain_hashed(files),
                },
            )),
            HeaderNode::File(entry) if entry.integrity.is_some() => {
                Some((name.clone(), node.clone()))
            }
            HeaderNode::File(_) => None,
        })
        .collect()
}

fn collect_files<'a>(
    files: &'a BTreeMap<String, HeaderNode>,
    prefix: PathBuf,
    out: &mut Vec<(PathBuf, &'a FileEntry)>,
) {
    for (name, node) in files {
        let path = prefix.join(name);
        match node {
            HeaderNode::Directory { files } => collect_files(files, path, out),
            HeaderNode::File(entry) => out.push((path, entry)),
        }
    }
}

fn conflict(at: &str, path: &Path) -> Error {
    Error::Configuration(format!(
        "archive path conflict: \"{at}\" is both a file and a directory (while adding {})",
        path.display()
    ))
}

/// Normal path segments; rejects `..`, roots and non-UTF-8 names.
fn segments(path: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => out.push(
                name.to_str()
                    .ok_or_else(|| {
                        Error::Configuration(format!(
                            "archive path {} is not valid UTF-8",
                            path.display()
                        ))
                    })?
                    .to_string(),
            ),
            Component::CurDir => {}
            _ => {
                return Err(Error::Configuration(format!(
                    "archive path {} must be relative and stay inside the archive",
                    path.display()
                )));
            }
        }
    }
    Ok(out)
}

fn align4(len: usize) -> usize {
    (len + 3) & !3
}

/// Encodes the prelude and padded header JSON.
pub fn encode_header(json: &str) -> Result<Vec<u8>> {
    let json_len = json.len();
    let aligned = align4(json_len);
    let too_large = || Error::GenericError(format!("archive header of {json_len} bytes is too large"));
    let json_len_u32 = u32::try_from(json_len).map_err(|_| too_large())?;
    let payload = u32::try_from(aligned + 4).map_err(|_| too_large())?;
    let pickle = payload.checked_add(4).ok_or_else(too_large)?;

    let mut out = Vec::with_capacity(PRELUDE_SIZE + aligned);
    out.extend_from_slice(&4u32.to_le_bytes());
    out.extend_from_slice(&pickle.to_le_bytes());
    out.extend_from_slice(&payload.to_le_bytes());
    out.extend_from_slice(&json_len_u32.to_le_bytes());
    out.extend_from_slice(json.as_bytes());
    out.resize(PRELUDE_SIZE + aligned, 0);
    Ok(out)
}

/// Parsed prelude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prelude {
    /// Length of the header JSON.
    pub json_len: usize,
    /// Absolute offset at which the body starts.
    pub body_offset: u64,
}

/// Parses the fixed prelude.
pub fn parse_prelude(data: &[u8]) -> Result<Prelude> {
    if data.len() < PRELUDE_SIZE {
        return Err(Error::GenericError(
            "archive is truncated: prelude incomplete".to_string(),
        ));
    }
    let word = |i: usize| u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
    let (size_field, pickle, payload, json_len) = (word(0), word(4), word(8), word(12));

    if size_field != 4 || pickle != payload.wrapping_add(4) || (payload as usize) < json_len as usize + 4 {
        return Err(Error::GenericError(
            "not an application archive: invalid prelude".to_string(),
        ));
    }

    Ok(Prelude {
        json_len: json_len as usize,
        body_offset: 8 + pickle as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(size: u64, offset: Option<u64>) -> FileEntry {
        FileEntry {
            size,
            offset: offset.map(|o| o.to_string()),
            executable: false,
            unpacked: offset.is_none(),
            integrity: None,
        }
    }

    #[test]
    fn test_json_shape_and_key_order() {
        let mut header = Header::default();
        header.insert(Path::new("z.js"), leaf(1, Some(0))).unwrap();
        header.insert(Path::new("lib/native.node"), leaf(5, None)).unwrap();
        assert_eq!(
            header.to_json().unwrap(),
            r#"{"files":{"lib":{"files":{"native.node":{"size":5,"unpacked":true}}},"z.js":{"size":1,"offset":"0"}}}"#
        );
    }

    #[test]
    fn test_file_directory_conflict() {
        let mut header = Header::default();
        header.insert(Path::new("a"), leaf(1, Some(0))).unwrap();
        let err = header.insert(Path::new("a/b"), leaf(1, Some(1))).unwrap_err();
        assert!(err.is_configuration());

        let mut header = Header::default();
        header.insert(Path::new("a/b"), leaf(1, Some(0))).unwrap();
        assert!(header.insert(Path::new("a"), leaf(1, Some(1))).is_err());
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let mut header = Header::default();
        assert!(header.insert(Path::new("../x"), leaf(1, Some(0))).is_err());
    }

    #[test]
    fn test_prelude() {
        let encoded = encode_header(r#"{"files":{}}"#).unwrap();
        assert_eq!(encoded.len(), PRELUDE_SIZE + 12);
        let prelude = parse_prelude(&encoded).unwrap();
        assert_eq!(prelude.json_len, 12);
        assert_eq!(prelude.body_offset, encoded.len() as u64);

        let encoded = encode_header(r#"{"files":{"a":1}}"#).unwrap();
        assert_eq!(encoded.len() % 4, 0);
        assert_eq!(parse_prelude(&encoded).unwrap().body_offset, encoded.len() as u64);

        assert!(parse_prelude(b"PK\x03\x04not an archive").is_err());
    }

    #[test]
    fn test_parse_header_roundtrip_lookup() {
        let json = r#"{"files":{"app.js":{"size":10,"offset":"0","executable":true}}}"#;
        let header = Header::from_json(json).unwrap();
        let Some(HeaderNode::File(entry)) = header.get(Path::new("app.js")) else {
            panic!("expected file");
        };
        assert!(entry.executable);
        assert_eq!(entry.body_offset().unwrap(), Some(0));
        assert_eq!(header.to_json().unwrap(), json);
    }
}
