//! Glob-based file selection with destination mapping.
//!
//! A [`FileMatcher`] selects files beneath a source root and maps each one to
//! a destination path relative to the output root of its file set.
//!
//! # Pattern semantics
//!
//! - Patterns are relative to the source root and use `/` separators.
//! - `!pattern` negates. A file is selected when the last pattern matching
//!   it is positive.
//! - `*` stays within one path segment, `**` spans segments.
//! - `{a,b}` alternation is expanded before compiling.
//! - A pattern without glob characters (or ending in `/`) also selects
//!   everything beneath it.
//! - Results are ordered by the first positive pattern that selected them,
//!   then by sorted walk order.
//!
//! # Exclusions
//!
//! Matchers whose outputs must not overlap exchange their patterns as an
//! [`ExcludeSet`] computed up front by [`compute_exclude_set`], then passed
//! explicitly to [`FileMatcher::match_files`].

use crate::bundler::{
    Error, Result,
    error::Context,
    macros::{ExpandMode, MacroExpander},
};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One compiled pattern, possibly expanded into several globs.
#[derive(Debug, Clone)]
struct Rule {
    negated: bool,
    globs: Vec<String>,
    compiled: Vec<Pattern>,
}

impl Rule {
    fn parse(raw: &str) -> Result<Option<Rule>> {
        let trimmed = raw.trim();
        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };
        let body = body.trim_start_matches("./").trim_start_matches('/');
        if body.is_empty() {
            return Ok(None);
        }

        let dir_only = body.ends_with('/');
        let body = body.trim_end_matches('/');

        let mut globs = Vec::new();
        for variant in expand_braces(body) {
            let variant = variant.trim_end_matches('/').to_string();
            if variant.is_empty() {
                continue;
            }
            let mut candidates = Vec::with_capacity(2);
            if dir_only || !has_glob_meta(&variant) {
                candidates.push(format!("{variant}/**/*"));
            }
            if !dir_only {
                candidates.push(variant);
            }
            for candidate in candidates {
                if !globs.contains(&candidate) {
                    globs.push(candidate);
                }
            }
        }

        let compiled = globs
            .iter()
            .map(|g| Pattern::new(g))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
            .with_context(|| format!("invalid file pattern \"{raw}\""))?;

        Ok(Some(Rule {
            negated,
            globs,
            compiled,
        }))
    }

    fn matches(&self, relative: &str) -> bool {
        self.compiled
            .iter()
            .any(|p| p.matches_with(relative, MATCH_OPTIONS))
    }
}

/// A file selected by a matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    /// Absolute source path.
    pub source: PathBuf,
    /// Destination path relative to the file set's output root.
    pub destination: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Whether any execute permission bit is set on the source.
    pub executable: bool,
}

/// Compiled inclusion patterns over one source root.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    from: PathBuf,
    to: PathBuf,
    patterns: Vec<String>,
    rules: Vec<Rule>,
}

impl FileMatcher {
    /// Compiles `patterns` for files under `from`, mapped beneath `to`.
    ///
    /// Each pattern is macro-expanded leniently before compiling, so
    /// `${arch}` or `${os}` can select platform-specific directories while
    /// brace alternation survives. `arch` is the value `${arch}` expands to.
    ///
    /// An empty pattern list produces a matcher that selects nothing.
    pub fn compile(
        patterns: &[String],
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        expander: Option<&MacroExpander>,
        arch: Option<&str>,
    ) -> Result<Self> {
        let mut expanded = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = match expander {
                Some(expander) => expander.expand_with(pattern, arch, &[], ExpandMode::lenient())?,
                None => pattern.clone(),
            };
            expanded.push(pattern);
        }

        let mut rules = Vec::with_capacity(expanded.len());
        for pattern in &expanded {
            if let Some(rule) = Rule::parse(pattern)? {
                rules.push(rule);
            }
        }

        Ok(Self {
            from: from.into(),
            to: to.into(),
            patterns: expanded,
            rules,
        })
    }

    /// A matcher that selects nothing.
    pub fn empty() -> Self {
        Self {
            from: PathBuf::new(),
            to: PathBuf::new(),
            patterns: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Same patterns and source, mapped beneath another destination root.
    pub fn rebased(&self, to: impl Into<PathBuf>) -> Self {
        Self {
            to: to.into(),
            ..self.clone()
        }
    }

    /// Source root.
    pub fn from(&self) -> &Path {
        &self.from
    }

    /// Destination root, relative to the output root of the file set.
    pub fn to(&self) -> &Path {
        &self.to
    }

    /// Patterns after macro expansion, as written.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether the matcher has no effective patterns.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decides whether a source-relative path is selected.
    ///
    /// Returns the index of the first positive pattern that matched, used as
    /// the ordering key.
    fn selection(&self, relative: &str) -> Option<usize> {
        let mut first_positive = None;
        let mut selected = false;
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.matches(relative) {
                selected = !rule.negated;
                if selected && first_positive.is_none() {
                    first_positive = Some(index);
                }
            }
        }
        if selected { first_positive } else { None }
    }

    /// Whether a source-relative path (with `/` separators) is selected.
    pub fn is_selected(&self, relative: &str) -> bool {
        self.selection(relative).is_some()
    }

    /// Selects files, dropping those whose destination is in `exclude`.
    ///
    /// Walks the source root in sorted order without following symlinked
    /// directories. A missing source root yields no files.
    pub async fn match_files(&self, exclude: &ExcludeSet) -> Result<Vec<MatchedFile>> {
        let matcher = self.clone();
        let exclude = exclude.clone();
        tokio::task::spawn_blocking(move || matcher.match_files_blocking(&exclude))
            .await
            .map_err(|e| Error::GenericError(format!("file matching task panicked: {e}")))?
    }

    fn match_files_blocking(&self, exclude: &ExcludeSet) -> Result<Vec<MatchedFile>> {
        if self.rules.is_empty() {
            return Ok(Vec::new());
        }
        if !self.from.is_dir() {
            log::debug!("source root {} does not exist, nothing to match", self.from.display());
            return Ok(Vec::new());
        }

        let canonical_root = canonical_root_of(&self.from)?;
        let mut selected: Vec<(usize, MatchedFile)> = Vec::new();

        for entry in walkdir::WalkDir::new(&self.from)
            .follow_links(false)
            .sort_by_file_name()
            .min_depth(1)
        {
            let entry = entry?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.from)?;
            let relative_str = to_slash(relative);
            let Some(order) = self.selection(&relative_str) else {
                continue;
            };

            let destination = self.to.join(relative);
            if exclude.is_excluded(&destination) {
                log::debug!("{relative_str} excluded by another file set");
                continue;
            }

            let metadata = if file_type.is_symlink() {
                match resolve_symlinked_file(entry.path(), &canonical_root) {
                    Some(metadata) => metadata,
                    None => continue,
                }
            } else {
                entry.metadata()?
            };

            selected.push((
                order,
                MatchedFile {
                    source: entry.path().to_path_buf(),
                    destination,
                    size: metadata.len(),
                    executable: is_executable(&metadata),
                },
            ));
        }

        // Stable: files selected by the same pattern keep walk order.
        selected.sort_by_key(|(order, _)| *order);
        Ok(selected.into_iter().map(|(_, file)| file).collect())
    }
}

/// Destination-path patterns propagated between matchers.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    compiled: Vec<Pattern>,
}

impl ExcludeSet {
    /// An empty set excluding nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a destination-relative glob.
    pub fn add_pattern(&mut self, pattern: &str) -> Result<()> {
        for variant in expand_braces(pattern) {
            self.compiled.push(Pattern::new(&variant)?);
        }
        Ok(())
    }

    /// Adds everything another set excludes.
    pub fn extend(&mut self, other: &ExcludeSet) {
        self.compiled.extend(other.compiled.iter().cloned());
    }

    /// Whether the set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Whether a destination path is excluded.
    pub fn is_excluded(&self, destination: &Path) -> bool {
        if self.compiled.is_empty() {
            return false;
        }
        let destination = to_slash(destination);
        self.compiled
            .iter()
            .any(|p| p.matches_with(&destination, MATCH_OPTIONS))
    }
}

/// Collects the positive patterns of `matchers`, prefixed with each matcher's
/// destination root, as an exclusion set for other matchers.
///
/// Negated patterns are ignored, so the set may exclude more than the
/// matcher actually produces but never less.
pub fn compute_exclude_set(matchers: &[&FileMatcher]) -> ExcludeSet {
    let mut set = ExcludeSet::new();
    for matcher in matchers {
        let prefix = to_slash(&matcher.to);
        let prefix = Pattern::escape(prefix.trim_end_matches('/'));
        for rule in matcher.rules.iter().filter(|r| !r.negated) {
            for glob in &rule.globs {
                let full = if prefix.is_empty() {
                    glob.clone()
                } else {
                    format!("{prefix}/{glob}")
                };
                match Pattern::new(&full) {
                    Ok(pattern) => set.compiled.push(pattern),
                    Err(e) => log::warn!("skipping unusable exclude pattern {full:?}: {e}"),
                }
            }
        }
    }
    set
}

/// Expands `{a,b}` alternation into separate patterns.
///
/// Groups without a top-level comma are kept literally.
pub(crate) fn expand_braces(pattern: &str) -> Vec<String> {
    let Some((open, close, alternatives)) = find_alternation(pattern) else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut out: Vec<String> = Vec::new();
    for alternative in alternatives {
        for expanded in expand_braces(&format!("{prefix}{alternative}{suffix}")) {
            if !out.contains(&expanded) {
                out.push(expanded);
            }
        }
    }
    out
}

fn find_alternation(pattern: &str) -> Option<(usize, usize, Vec<&str>)> {
    let mut depth = 0usize;
    let mut open = 0usize;
    let mut commas = Vec::new();

    for (index, c) in pattern.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    open = index;
                    commas.clear();
                }
                depth += 1;
            }
            ',' if depth == 1 => commas.push(index),
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 && !commas.is_empty() {
                    let mut alternatives = Vec::with_capacity(commas.len() + 1);
                    let mut start = open + 1;
                    for &comma in &commas {
                        alternatives.push(&pattern[start..comma]);
                        start = comma + 1;
                    }
                    alternatives.push(&pattern[start..index]);
                    return Some((open, index, alternatives));
                }
            }
            _ => {}
        }
    }
    None
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Path with `/` separators regardless of host.
pub(crate) fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

fn canonical_root_of(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|error| Error::Fs {
        context: "resolving source root",
        path: path.to_path_buf(),
        error,
    })
}

/// Metadata of a symlink's target when it is a regular file inside `root`.
fn resolve_symlinked_file(link: &Path, root: &Path) -> Option<std::fs::Metadata> {
    let target = match std::fs::canonicalize(link) {
        Ok(target) => target,
        Err(e) => {
            log::warn!("skipping dangling symlink {}: {e}", link.display());
            return None;
        }
    };
    if !target.starts_with(root) {
        log::warn!(
            "skipping symlink {} pointing outside the source root ({})",
            link.display(),
            target.display()
        );
        return None;
    }
    match std::fs::metadata(&target) {
        Ok(metadata) if metadata.is_file() => Some(metadata),
        Ok(_) => {
            log::debug!("not following symlinked directory {}", link.display());
            None
        }
        Err(e) => {
            log::warn!("skipping unreadable symlink target {}: {e}", target.display());
            None
        }
    }
}

#[cfg(unix)]
pub(crate) fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
pub(crate) fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_braces() {
        assert_eq!(expand_braces("a/{b,c}/d"), vec!["a/b/d", "a/c/d"]);
        assert_eq!(expand_braces("lib{,/**/*}"), vec!["lib", "lib/**/*"]);
        assert_eq!(expand_braces("{a,b}{1,2}"), vec!["a1", "a2", "b1", "b2"]);
        assert_eq!(expand_braces("{literal}"), vec!["{literal}"]);
        assert_eq!(expand_braces("{x,{y,z}}"), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_last_matching_pattern_wins() {
        let patterns = vec!["**/*".to_string(), "!**/*.map".into(), "keep.map".into()];
        let m = FileMatcher::compile(&patterns, "/src", "", None, None).unwrap();
        assert!(m.is_selected("a.js"));
        assert!(!m.is_selected("dist/a.js.map"));
        assert!(m.is_selected("keep.map"));
    }

    #[test]
    fn test_plain_directory_pattern_selects_contents() {
        let m = FileMatcher::compile(&["assets".to_string()], "/src", "", None, None).unwrap();
        assert!(m.is_selected("assets/img/logo.png"));
        assert!(m.is_selected("assets"));
        assert!(!m.is_selected("assets2/x"));
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let m = FileMatcher::compile(&["*.js".to_string()], "/src", "", None, None).unwrap();
        assert!(m.is_selected("a.js"));
        assert!(!m.is_selected("sub/a.js"));
    }

    #[test]
    fn test_empty_patterns_select_nothing() {
        let m = FileMatcher::compile(&[], "/src", "", None, None).unwrap();
        assert!(m.is_empty());
        assert!(!m.is_selected("a.js"));
    }

    #[test]
    fn test_exclude_set_uses_destination_prefix() {
        let extra = FileMatcher::compile(&["**/*.txt".to_string()], "/x", "docs", None, None).unwrap();
        let set = compute_exclude_set(&[&extra]);
        assert!(set.is_excluded(Path::new("docs/readme.txt")));
        assert!(set.is_excluded(Path::new("docs/sub/readme.txt")));
        assert!(!set.is_excluded(Path::new("readme.txt")));
    }

    #[test]
    fn test_patterns_are_macro_expanded() {
        let expander = MacroExpander::new("App", "app", "1.0.0", crate::bundler::Platform::Linux);
        let m = FileMatcher::compile(
            &["bin/${os}-${arch}{,/**/*}".to_string()],
            "/src",
            "",
            Some(&expander),
            Some("arm64"),
        )
        .unwrap();
        assert_eq!(m.patterns(), &["bin/linux-arm64{,/**/*}".to_string()]);
        assert!(m.is_selected("bin/linux-arm64/tool"));
        assert!(!m.is_selected("bin/linux-x64/tool"));
    }
}
