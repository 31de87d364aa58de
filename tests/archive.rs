//! Tests for packing applications into `app.asar` and reading them back.

mod common;

use common::write;
use kodegen_bundler_package::bundler::{
    ArchiveReader, FileMatcher,
    archive::{HeaderNode, IntegrityExemptions, UnpackFilter, pack, unpacked_dir},
    files::{ExcludeSet, FileSet, TransformerChain, compute_file_set},
};
use std::path::Path;
use tempfile::TempDir;

async fn file_set(src: &Path) -> FileSet {
    let matcher = FileMatcher::compile(&["**/*".to_string()], src, "", None, None).unwrap();
    compute_file_set(&[&matcher], &ExcludeSet::new(), &TransformerChain::new())
        .await
        .unwrap()
}

/// Native modules go to the mirror, everything else into the body.
#[tokio::test]
async fn test_smart_unpack_layout() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write(&src, "app.js", b"0123456789");
    write(&src, "lib/native.node", vec![7u8; 500]);

    let archive_path = tmp.path().join("out/app.asar");
    let packed = pack(
        &file_set(&src).await,
        &archive_path,
        &UnpackFilter::new(&[], true).unwrap(),
        &IntegrityExemptions::none(),
    )
    .await
    .unwrap();

    assert_eq!(packed.body_size, 10);
    let Some(HeaderNode::File(app)) = packed.header.get(Path::new("app.js")) else {
        panic!("app.js missing from header");
    };
    assert_eq!(app.size, 10);
    assert_eq!(app.offset.as_deref(), Some("0"));
    assert!(!app.unpacked);

    let Some(HeaderNode::File(native)) = packed.header.get(Path::new("lib/native.node")) else {
        panic!("native.node missing from header");
    };
    assert_eq!(native.size, 500);
    assert!(native.unpacked);
    assert_eq!(native.offset, None);

    let mirrored = unpacked_dir(&archive_path).join("lib/native.node");
    assert_eq!(std::fs::metadata(mirrored).unwrap().len(), 500);
}

/// Zero-byte files take the running offset and add no body bytes.
#[tokio::test]
async fn test_zero_byte_file_offset() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write(&src, "a.txt", b"abc");
    write(&src, "b.txt", b"");
    write(&src, "c.txt", b"de");

    let packed = pack(
        &file_set(&src).await,
        &tmp.path().join("app.asar"),
        &UnpackFilter::none(),
        &IntegrityExemptions::none(),
    )
    .await
    .unwrap();

    let offsets: Vec<_> = packed
        .header
        .files()
        .into_iter()
        .map(|(path, entry)| (path.to_string_lossy().into_owned(), entry.offset.clone()))
        .collect();
    assert_eq!(
        offsets,
        vec![
            ("a.txt".to_string(), Some("0".to_string())),
            ("b.txt".to_string(), Some("3".to_string())),
            ("c.txt".to_string(), Some("3".to_string())),
        ]
    );
    assert_eq!(packed.body_size, 5);
}

/// Packing the same input twice yields the same header and digest.
#[tokio::test]
async fn test_packing_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write(&src, "index.js", b"main");
    write(&src, "z/deep/file.json", b"{}");
    write(&src, "native.node", b"bin");

    let archive_path = tmp.path().join("app.asar");
    let unpack = UnpackFilter::new(&[], true).unwrap();
    let set = file_set(&src).await;

    let first = pack(&set, &archive_path, &unpack, &IntegrityExemptions::none()).await.unwrap();
    let first_bytes = std::fs::read(&archive_path).unwrap();
    let second = pack(&set, &archive_path, &unpack, &IntegrityExemptions::none()).await.unwrap();

    assert_eq!(first.header.to_json().unwrap(), second.header.to_json().unwrap());
    assert_eq!(first.integrity, second.integrity);
    assert_eq!(first_bytes, std::fs::read(&archive_path).unwrap());
}

/// Changing an integrity-exempt file leaves the digest unchanged.
#[tokio::test]
async fn test_exempt_files_do_not_affect_digest() {
    let tmp = TempDir::new().unwrap();
    let unpack = UnpackFilter::new(&[], true).unwrap();
    let exempt = IntegrityExemptions::new(&["**/*.node".to_string()]).unwrap();

    let mut digests = Vec::new();
    let mut strict = Vec::new();
    for (index, native) in [b"unsigned".as_slice(), b"signed!!".as_slice()].iter().enumerate() {
        let src = tmp.path().join(format!("src{index}"));
        write(&src, "index.js", b"main");
        write(&src, "addon.node", native);
        let set = file_set(&src).await;

        let archive = tmp.path().join(format!("exempt{index}/app.asar"));
        digests.push(pack(&set, &archive, &unpack, &exempt).await.unwrap().integrity.hash);

        let archive = tmp.path().join(format!("strict{index}/app.asar"));
        strict.push(
            pack(&set, &archive, &unpack, &IntegrityExemptions::none())
                .await
                .unwrap()
                .integrity
                .hash,
        );
    }

    assert_eq!(digests[0], digests[1]);
    assert_ne!(strict[0], strict[1]);
}

/// The reader verifies the digest and extracts every file, packed or unpacked.
#[tokio::test]
async fn test_read_back_and_extract() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write(&src, "package.json", br#"{"main":"index.js"}"#);
    write(&src, "index.js", b"console.log('hi')");
    write(&src, "lib/native.node", b"native");

    let archive_path = tmp.path().join("res/app.asar");
    let packed = pack(
        &file_set(&src).await,
        &archive_path,
        &UnpackFilter::new(&[], true).unwrap(),
        &IntegrityExemptions::none(),
    )
    .await
    .unwrap();

    let reader = ArchiveReader::open(&archive_path).await.unwrap();
    assert_eq!(reader.header(), &packed.header);
    reader.verify(Some(&packed.integrity)).await.unwrap();
    assert_eq!(reader.read_file("index.js").await.unwrap(), b"console.log('hi')");
    assert_eq!(reader.read_file("lib/native.node").await.unwrap(), b"native");

    let dest = tmp.path().join("extracted");
    assert_eq!(reader.extract_all(&dest).await.unwrap(), 3);
    assert_eq!(std::fs::read(dest.join("lib/native.node")).unwrap(), b"native");

    let mut tampered = packed.integrity.clone();
    tampered.hash = "00".repeat(32);
    assert!(reader.verify(Some(&tampered)).await.unwrap_err().is_configuration());
}

/// A header entry larger than what the body holds is reported, not allocated.
#[tokio::test]
async fn test_truncated_body_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write(&src, "index.js", b"console.log('hello')");

    let archive_path = tmp.path().join("app.asar");
    pack(
        &file_set(&src).await,
        &archive_path,
        &UnpackFilter::none(),
        &IntegrityExemptions::none(),
    )
    .await
    .unwrap();

    let bytes = std::fs::read(&archive_path).unwrap();
    std::fs::write(&archive_path, &bytes[..bytes.len() - 5]).unwrap();

    let reader = ArchiveReader::open(&archive_path).await.unwrap();
    let err = reader.read_file("index.js").await.unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("index.js"));
}
