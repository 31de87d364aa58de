//! File sets: the resolved list of what goes where.

use super::{
    matcher::{ExcludeSet, FileMatcher},
    transform::TransformerChain,
};
use crate::bundler::{
    DependencyMode, MacroExpander, Result,
    error::{Context, ErrorExt},
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// App patterns used when none are configured.
pub const DEFAULT_APP_PATTERNS: [&str; 1] = ["**/*"];

/// Excluded from the dependency pass.
const DEPENDENCY_JUNK_PATTERNS: [&str; 6] = [
    "!**/{.bin,.github,test,tests,__tests__,doc,docs,example,examples}{,/**/*}",
    "!**/*.{md,markdown,map}",
    "!**/*.{ts,tsx,mts,cts}",
    "!**/{.DS_Store,.npmignore,.eslintrc,.editorconfig,.travis.yml}",
    "!**/{CHANGELOG,HISTORY,AUTHORS,CONTRIBUTORS}*",
    "!**/*.{o,obj,pdb,tlog}",
];

/// One resolved file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSetEntry {
    /// Absolute source path.
    pub source: PathBuf,
    /// Destination relative to the set's output root.
    pub destination: PathBuf,
    /// Replacement content produced by a transformer, copied instead of the source.
    pub content: Option<Vec<u8>>,
    /// Size of what will be written.
    pub size: u64,
    /// Whether the source is executable.
    pub executable: bool,
}

impl FileSetEntry {
    /// Whether the destination receives the source file unchanged.
    pub fn is_passthrough(&self) -> bool {
        self.content.is_none()
    }

    /// Bytes to write, reading the source when there is no replacement content.
    pub async fn read(&self) -> Result<Vec<u8>> {
        match &self.content {
            Some(content) => Ok(content.clone()),
            None => tokio::fs::read(&self.source)
                .await
                .fs_context("reading", &self.source),
        }
    }
}

/// Entries produced by one matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileGroup {
    /// Source root the matcher walked.
    pub source_root: PathBuf,
    /// Entries in match order.
    pub entries: Vec<FileSetEntry>,
}

/// Ordered file entries, grouped by the matcher that produced them.
///
/// Later entries override earlier ones at the same destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    groups: Vec<FileGroup>,
}

impl FileSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a group after all existing ones.
    pub fn push_group(&mut self, group: FileGroup) {
        self.groups.push(group);
    }

    /// Appends all groups of `other`.
    pub fn append(&mut self, other: FileSet) {
        self.groups.extend(other.groups);
    }

    /// Groups in order.
    pub fn groups(&self) -> &[FileGroup] {
        &self.groups
    }

    /// All entries in order, duplicates included.
    pub fn entries(&self) -> impl Iterator<Item = &FileSetEntry> {
        self.groups.iter().flat_map(|g| g.entries.iter())
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    /// Whether the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries after last-write-wins deduplication.
    ///
    /// A surviving entry keeps the position of its last occurrence.
    pub fn resolved(&self) -> Vec<&FileSetEntry> {
        let mut last: HashMap<&Path, usize> = HashMap::new();
        for (index, entry) in self.entries().enumerate() {
            last.insert(entry.destination.as_path(), index);
        }
        self.entries()
            .enumerate()
            .filter(|(index, entry)| last.get(entry.destination.as_path()) == Some(index))
            .map(|(_, entry)| entry)
            .collect()
    }
}

/// Matches `matcher` and runs the transformer chain over the results.
pub async fn compute_file_group(
    matcher: &FileMatcher,
    exclude: &ExcludeSet,
    chain: &TransformerChain,
) -> Result<FileGroup> {
    let matched = matcher
        .match_files(exclude)
        .await
        .with_context(|| format!("matching files in {}", matcher.from().display()))?;

    let mut entries = Vec::with_capacity(matched.len());
    for file in matched {
        let mut entry = FileSetEntry {
            source: file.source,
            destination: file.destination,
            content: None,
            size: file.size,
            executable: file.executable,
        };
        if chain.wants(&entry.destination) {
            let raw = tokio::fs::read(&entry.source)
                .await
                .fs_context("reading", &entry.source)?;
            if let Some(content) = chain.apply(&entry.destination, &raw)? {
                entry.size = content.len() as u64;
                entry.content = Some(content);
            }
        }
        entries.push(entry);
    }

    Ok(FileGroup {
        source_root: matcher.from().to_path_buf(),
        entries,
    })
}

/// Computes the file set of several matchers, in matcher order.
pub async fn compute_file_set(
    matchers: &[&FileMatcher],
    exclude: &ExcludeSet,
    chain: &TransformerChain,
) -> Result<FileSet> {
    let mut set = FileSet::new();
    for matcher in matchers {
        set.push_group(compute_file_group(matcher, exclude, chain).await?);
    }
    Ok(set)
}

/// Inputs for collecting the application's own files.
#[derive(Debug, Clone)]
pub struct AppFiles<'a> {
    /// Staged application directory.
    pub app_dir: &'a Path,
    /// Configured patterns; empty means everything.
    pub patterns: &'a [String],
    /// How `node_modules` is handled.
    pub dependencies: DependencyMode,
    /// Expander for `${...}` in patterns.
    pub expander: &'a MacroExpander,
    /// Value of `${arch}` in patterns.
    pub arch: &'a str,
    /// Directories inside the app dir that must never be packaged (e.g. the output dir).
    pub ignored_dirs: &'a [PathBuf],
}

/// Collects the application files plus, in bundled mode, its dependencies.
///
/// The dependency group follows the main group; its zero-byte entries are
/// dropped.
pub async fn compute_app_file_set(
    app: &AppFiles<'_>,
    exclude: &ExcludeSet,
    chain: &TransformerChain,
) -> Result<FileSet> {
    let mut patterns: Vec<String> = if app.patterns.is_empty() {
        DEFAULT_APP_PATTERNS.iter().map(|p| p.to_string()).collect()
    } else {
        app.patterns.to_vec()
    };
    patterns.push("!node_modules{,/**/*}".to_string());
    for dir in app.ignored_dirs {
        if let Ok(relative) = dir.strip_prefix(app.app_dir)
            && !relative.as_os_str().is_empty()
        {
            let relative = glob::Pattern::escape(&super::matcher::to_slash(relative));
            patterns.push(format!("!{relative}{{,/**/*}}"));
        }
    }

    let main = FileMatcher::compile(&patterns, app.app_dir, "", Some(app.expander), Some(app.arch))?;
    let mut set = FileSet::new();
    set.push_group(compute_file_group(&main, exclude, chain).await?);

    if app.dependencies == DependencyMode::Bundled {
        let mut dependency_patterns = vec!["**/*".to_string()];
        dependency_patterns.extend(DEPENDENCY_JUNK_PATTERNS.iter().map(|p| p.to_string()));
        let dependencies = FileMatcher::compile(
            &dependency_patterns,
            app.app_dir.join("node_modules"),
            "node_modules",
            None,
            None,
        )?;
        let mut group = compute_file_group(&dependencies, exclude, chain).await?;
        let before = group.entries.len();
        group.entries.retain(|e| e.size > 0);
        log::debug!(
            "dependency pass collected {} files ({} empty files dropped)",
            group.entries.len(),
            before - group.entries.len()
        );
        set.push_group(group);
    }

    Ok(set)
}
