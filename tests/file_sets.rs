//! Tests for file selection, exclusion propagation and copying.

mod common;

use common::write;
use kodegen_bundler_package::bundler::{
    DependencyMode, FileMatcher, MacroExpander, Platform,
    files::{
        AppFiles, ExcludeSet, FileSet, TransformerChain, compute_app_file_set, compute_exclude_set,
        compute_file_group, compute_file_set, copy_file_set,
    },
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn destinations(set: &FileSet) -> BTreeSet<PathBuf> {
    set.entries().map(|e| e.destination.clone()).collect()
}

fn ordered(set: &FileSet) -> Vec<PathBuf> {
    set.entries().map(|e| e.destination.clone()).collect()
}

#[tokio::test]
async fn test_glob_selection_maps_to_destination() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write(&src, "a.js", "a");
    write(&src, "b.txt", "b");
    write(&src, "sub/c.js", "c");

    let matcher = FileMatcher::compile(&["**/*.js".to_string()], &src, "app", None, None).unwrap();
    let set = compute_file_set(&[&matcher], &ExcludeSet::new(), &TransformerChain::new())
        .await
        .unwrap();

    assert_eq!(
        ordered(&set),
        vec![PathBuf::from("app/a.js"), PathBuf::from("app/sub/c.js")]
    );
}

/// Files are grouped by the first positive pattern that selects them, each
/// group in sorted walk order.
#[tokio::test]
async fn test_selection_follows_pattern_declaration_order() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write(&src, "a.js", "a");
    write(&src, "b.txt", "b");
    write(&src, "c.js", "c");
    write(&src, "d.txt", "d");
    write(&src, "sub/e.txt", "e");

    let patterns = vec!["**/*.txt".to_string(), "*.js".to_string()];
    let matcher = FileMatcher::compile(&patterns, &src, "", None, None).unwrap();
    let set = compute_file_set(&[&matcher], &ExcludeSet::new(), &TransformerChain::new())
        .await
        .unwrap();

    assert_eq!(
        ordered(&set),
        vec![
            PathBuf::from("b.txt"),
            PathBuf::from("d.txt"),
            PathBuf::from("sub/e.txt"),
            PathBuf::from("a.js"),
            PathBuf::from("c.js"),
        ]
    );
}

/// A matcher never produces a destination selected by a matcher whose
/// patterns were propagated to it.
#[tokio::test]
async fn test_propagated_exclusions_are_disjoint() {
    let tmp = TempDir::new().unwrap();
    let first_src = tmp.path().join("first");
    let second_src = tmp.path().join("second");
    write(&first_src, "shared.txt", "1");
    write(&first_src, "notes.txt", "1");
    write(&second_src, "shared.txt", "2");
    write(&second_src, "data.json", "2");

    let first = FileMatcher::compile(&["*.txt".to_string()], &first_src, "res", None, None).unwrap();
    let second = FileMatcher::compile(&["**/*".to_string()], &second_src, "res", None, None).unwrap();

    let chain = TransformerChain::new();
    let first_group = compute_file_group(&first, &ExcludeSet::new(), &chain).await.unwrap();
    let second_group = compute_file_group(&second, &compute_exclude_set(&[&first]), &chain)
        .await
        .unwrap();

    let first_dest: BTreeSet<_> = first_group.entries.iter().map(|e| e.destination.clone()).collect();
    let second_dest: BTreeSet<_> = second_group.entries.iter().map(|e| e.destination.clone()).collect();
    assert!(first_dest.is_disjoint(&second_dest));
    assert_eq!(first_dest.len(), 2);
    assert_eq!(second_dest, BTreeSet::from([PathBuf::from("res/data.json")]));
}

/// Later groups win when two sources map to the same destination.
#[tokio::test]
async fn test_copy_last_write_wins() {
    let tmp = TempDir::new().unwrap();
    let first_src = tmp.path().join("first");
    let second_src = tmp.path().join("second");
    write(&first_src, "config.json", "first");
    write(&second_src, "config.json", "second");

    let all = vec!["**/*".to_string()];
    let chain = TransformerChain::new();
    let mut set = FileSet::new();
    for src in [&first_src, &second_src] {
        let matcher = FileMatcher::compile(&all, src, "", None, None).unwrap();
        set.push_group(compute_file_group(&matcher, &ExcludeSet::new(), &chain).await.unwrap());
    }

    let dest = tmp.path().join("dest");
    assert_eq!(copy_file_set(&set, &dest).await.unwrap(), 1);
    assert_eq!(std::fs::read_to_string(dest.join("config.json")).unwrap(), "second");
}

async fn app_files(app_dir: &Path, dependencies: DependencyMode, ignored: &[PathBuf]) -> BTreeSet<PathBuf> {
    let expander = MacroExpander::new("Demo", "demo", "1.0.0", Platform::Linux);
    let app = AppFiles {
        app_dir,
        patterns: &[],
        dependencies,
        expander: &expander,
        arch: "x64",
        ignored_dirs: ignored,
    };
    let set = compute_app_file_set(&app, &ExcludeSet::new(), &TransformerChain::new())
        .await
        .unwrap();
    destinations(&set)
}

#[tokio::test]
async fn test_dependency_modes() {
    let tmp = TempDir::new().unwrap();
    let app = tmp.path().join("app");
    write(&app, "index.js", "main");
    write(&app, "node_modules/dep/index.js", "dep");
    write(&app, "node_modules/dep/README.md", "docs");
    write(&app, "node_modules/dep/empty.js", "");
    write(&app, "dist/old-build.txt", "stale");

    let bundled = app_files(&app, DependencyMode::Bundled, &[app.join("dist")]).await;
    assert_eq!(
        bundled,
        BTreeSet::from([PathBuf::from("index.js"), PathBuf::from("node_modules/dep/index.js")])
    );

    let external = app_files(&app, DependencyMode::External, &[]).await;
    assert_eq!(
        external,
        BTreeSet::from([PathBuf::from("dist/old-build.txt"), PathBuf::from("index.js")])
    );
}

#[tokio::test]
async fn test_arch_macro_in_patterns() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("bin");
    write(&src, "x64/tool", "x");
    write(&src, "arm64/tool", "a");

    let expander = MacroExpander::new("Demo", "demo", "1.0.0", Platform::Linux);
    let matcher = FileMatcher::compile(&["${arch}/**/*".to_string()], &src, "", Some(&expander), Some("arm64")).unwrap();
    let set = compute_file_set(&[&matcher], &ExcludeSet::new(), &TransformerChain::new())
        .await
        .unwrap();
    assert_eq!(destinations(&set), BTreeSet::from([PathBuf::from("arm64/tool")]));
}
