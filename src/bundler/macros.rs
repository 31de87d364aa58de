//! Placeholder expansion for naming and path patterns.
//!
//! Patterns reference placeholders as `${name}` (the bare `{name}` form is
//! accepted too):
//!
//! | Placeholder | Value |
//! |-------------|-------|
//! | `productName` | product name, filesystem-sanitized unless raw |
//! | `name` | package name |
//! | `version` | package version |
//! | `arch` | architecture name or the per-format alias supplied by the caller |
//! | `os` | `linux`, `mac`, `win` |
//! | `platform` | `linux`, `darwin`, `win32` |
//! | `env.NAME` | environment variable `NAME` |
//! | anything else | caller-supplied fields such as `ext` |
//!
//! Unknown placeholders are an [`Error::UnknownMacro`] unless expansion is
//! lenient. Lenient expansion is meant for glob patterns, where brace
//! alternation like `{,/**/*}` has to survive literally.

use crate::bundler::{Error, Result, Settings, platform::Platform};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?\{([^{}]*)\}").expect("placeholder regex is valid"));

const ARCH_SEPARATORS: [char; 3] = ['-', '_', ' '];

/// How a pattern is expanded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandMode {
    /// Leave unknown placeholders in place instead of failing.
    pub lenient: bool,
    /// Substitute the product name without sanitizing it.
    pub raw_product_name: bool,
}

impl ExpandMode {
    /// Mode for glob patterns.
    pub fn lenient() -> Self {
        Self {
            lenient: true,
            ..Default::default()
        }
    }
}

/// Expands placeholders using the package metadata of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroExpander {
    product_name: String,
    name: String,
    version: String,
    platform: Platform,
}

impl MacroExpander {
    /// Creates an expander from explicit values.
    pub fn new(
        product_name: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        platform: Platform,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            name: name.into(),
            version: version.into(),
            platform,
        }
    }

    /// Creates an expander for the package described by `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.product_name(),
            settings.package_name(),
            settings.version_string(),
            settings.platform(),
        )
    }

    /// Strict expansion with a sanitized product name.
    ///
    /// `arch` of `None` removes the `${arch}` placeholder together with one
    /// separator (`-`, `_` or space) directly in front of it.
    pub fn expand(&self, pattern: &str, arch: Option<&str>, extra: &[(&str, &str)]) -> Result<String> {
        self.expand_with(pattern, arch, extra, ExpandMode::default())
    }

    /// Expands `pattern` with explicit [`ExpandMode`].
    pub fn expand_with(
        &self,
        pattern: &str,
        arch: Option<&str>,
        extra: &[(&str, &str)],
        mode: ExpandMode,
    ) -> Result<String> {
        let mut out = String::with_capacity(pattern.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(pattern) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            out.push_str(&pattern[last..whole.start]);
            last = whole.end;

            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if name == "arch" && arch.is_none() {
                if out.ends_with(ARCH_SEPARATORS) {
                    out.pop();
                }
                continue;
            }

            match self.resolve(name, arch, extra, mode)? {
                Some(value) => out.push_str(&value),
                None if mode.lenient => out.push_str(literal(&caps)),
                None => {
                    return Err(Error::UnknownMacro {
                        name: name.to_string(),
                        pattern: pattern.to_string(),
                    });
                }
            }
        }

        out.push_str(&pattern[last..]);
        Ok(out)
    }

    fn resolve(
        &self,
        name: &str,
        arch: Option<&str>,
        extra: &[(&str, &str)],
        mode: ExpandMode,
    ) -> Result<Option<String>> {
        if let Some((_, value)) = extra.iter().find(|(key, _)| *key == name) {
            return Ok(Some((*value).to_string()));
        }

        let value = match name {
            "productName" if mode.raw_product_name => self.product_name.clone(),
            "productName" => sanitize_file_name(&self.product_name),
            "name" => self.name.clone(),
            "version" => self.version.clone(),
            "arch" => arch.unwrap_or_default().to_string(),
            "os" => self.platform.short_name().to_string(),
            "platform" => self.platform.node_name().to_string(),
            _ => match name.strip_prefix("env.") {
                Some(var) => std::env::var(var).map_err(|_| {
                    Error::Configuration(format!(
                        "environment variable {var} referenced by ${{env.{var}}} is not set"
                    ))
                })?,
                None => return Ok(None),
            },
        };
        Ok(Some(value))
    }
}

fn literal<'a>(caps: &Captures<'a>) -> &'a str {
    caps.get(0).map(|m| m.as_str()).unwrap_or_default()
}

/// Removes characters that are invalid in file names on any supported platform.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expander() -> MacroExpander {
        MacroExpander::new("Foo: App", "foo-app", "1.2.3", Platform::Linux)
    }

    #[test]
    fn test_expand_known_placeholders() {
        let out = expander()
            .expand("${productName}-${version}-${arch}.${ext}", Some("x64"), &[("ext", "zip")])
            .unwrap();
        assert_eq!(out, "Foo App-1.2.3-x64.zip");
    }

    #[test]
    fn test_bare_brace_form() {
        let out = expander()
            .expand("{name}_{version}_{os}-{platform}", None, &[])
            .unwrap();
        assert_eq!(out, "foo-app_1.2.3_linux-linux");
    }

    #[test]
    fn test_raw_product_name() {
        let mode = ExpandMode {
            raw_product_name: true,
            ..Default::default()
        };
        let out = expander().expand_with("${productName}", None, &[], mode).unwrap();
        assert_eq!(out, "Foo: App");
    }

    #[test]
    fn test_missing_arch_drops_separator() {
        let out = expander()
            .expand("${name}-${version}-${arch}.${ext}", None, &[("ext", "deb")])
            .unwrap();
        assert_eq!(out, "foo-app-1.2.3.deb");
    }

    #[test]
    fn test_unknown_macro_strict() {
        let err = expander().expand("${nope}", None, &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownMacro { ref name, .. } if name == "nope"));
    }

    #[test]
    fn test_glob_alternation_survives_lenient() {
        let err = expander().expand("lib/${arch}{,/**/*}", Some("x64"), &[]);
        assert!(err.is_err());

        let out = expander()
            .expand_with("lib/${arch}{,/**/*}", Some("x64"), &[], ExpandMode::lenient())
            .unwrap();
        assert_eq!(out, "lib/x64{,/**/*}");
    }

    #[test]
    fn test_env_macro() {
        // SAFETY: test-local variable name, not read concurrently by other tests
        unsafe { std::env::set_var("KODEGEN_PACKAGE_TEST_CHANNEL", "beta") };
        let out = expander()
            .expand("${env.KODEGEN_PACKAGE_TEST_CHANNEL}", None, &[])
            .unwrap();
        assert_eq!(out, "beta");

        let err = expander()
            .expand("${env.KODEGEN_PACKAGE_TEST_UNSET_VAR}", None, &[])
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
