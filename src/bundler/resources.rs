//! Locating build resources such as the application icon.

use crate::bundler::{Error, Platform, Result, Settings};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Icon container format a platform expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconFormat {
    Icns,
    Ico,
    /// A set of PNG files, one per size.
    Png,
}

impl IconFormat {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::MacOs => IconFormat::Icns,
            Platform::Windows => IconFormat::Ico,
            Platform::Linux => IconFormat::Png,
        }
    }
}

/// Converts or validates candidate icon images.
#[async_trait]
pub trait IconConverter: Send + Sync + std::fmt::Debug {
    /// Returns usable icons with their pixel size.
    async fn convert(&self, candidates: &[PathBuf], format: IconFormat) -> Result<Vec<(PathBuf, u32)>>;
}

/// Reads image dimensions with the `image` crate.
///
/// Non-square images are rejected; formats `image` cannot decode (such as
/// `.icns`) are passed over.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageIconConverter;

#[async_trait]
impl IconConverter for ImageIconConverter {
    async fn convert(&self, candidates: &[PathBuf], format: IconFormat) -> Result<Vec<(PathBuf, u32)>> {
        let candidates = candidates.to_vec();
        let mut icons = tokio::task::spawn_blocking(move || {
            let mut icons = Vec::new();
            for path in candidates {
                match image::image_dimensions(&path) {
                    Ok((width, height)) if width == height => icons.push((path, width)),
                    Ok((width, height)) => {
                        return Err(Error::Tool {
                            tool: "icon converter".to_string(),
                            message: format!(
                                "icon {} must be square, got {width}x{height}",
                                path.display()
                            ),
                        });
                    }
                    Err(image::ImageError::Unsupported(e)) => {
                        log::debug!("skipping icon candidate {}: {e}", path.display());
                    }
                    Err(e) => {
                        return Err(Error::Tool {
                            tool: "icon converter".to_string(),
                            message: format!("cannot read {}: {e}", path.display()),
                        });
                    }
                }
            }
            Ok(icons)
        })
        .await??;

        icons.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        log::debug!("{} icon(s) usable for {format:?}", icons.len());
        Ok(icons)
    }
}

/// Outcome of icon resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedIcon {
    /// Icon path from the configuration.
    Configured(PathBuf),
    /// Candidates found in the build resources directory.
    Converted(Vec<(PathBuf, u32)>),
}

/// Resolves a path against the build resources directory, then the project directory.
pub fn resolve_resource(settings: &Settings, path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return path.exists().then(|| path.to_path_buf());
    }
    [settings.build_resources_dir(), settings.project_dir().to_path_buf()]
        .into_iter()
        .map(|base| base.join(path))
        .find(|candidate| candidate.exists())
}

/// Finds the application icon.
///
/// A configured icon that cannot be found is a configuration error. Without
/// one, `icon.icns`, `icon.ico`, `icon.png` and `icons/*.png` in the build
/// resources directory are handed to `converter`.
pub async fn resolve_icon(settings: &Settings, converter: &dyn IconConverter) -> Result<Option<ResolvedIcon>> {
    if let Some(configured) = settings.icon() {
        return match resolve_resource(settings, configured) {
            Some(path) => Ok(Some(ResolvedIcon::Configured(path))),
            None => Err(Error::Configuration(format!(
                "icon {} not found in {} or {}",
                configured.display(),
                settings.build_resources_dir().display(),
                settings.project_dir().display()
            ))),
        };
    }

    let candidates = icon_candidates(&settings.build_resources_dir())?;
    if candidates.is_empty() {
        log::debug!("no icon configured and none found in build resources");
        return Ok(None);
    }

    let icons = converter
        .convert(&candidates, IconFormat::for_platform(settings.platform()))
        .await
        .map_err(|e| match e {
            Error::Tool { tool, message } => {
                Error::Configuration(format!("cannot use icon candidates: {tool}: {message}"))
            }
            other => other,
        })?;
    Ok((!icons.is_empty()).then_some(ResolvedIcon::Converted(icons)))
}

fn icon_candidates(build_resources: &Path) -> Result<Vec<PathBuf>> {
    let mut candidates: Vec<PathBuf> = ["icon.icns", "icon.ico", "icon.png"]
        .iter()
        .map(|name| build_resources.join(name))
        .filter(|p| p.is_file())
        .collect();

    let icons_dir = build_resources.join("icons");
    if icons_dir.is_dir() {
        let mut pngs: Vec<PathBuf> = std::fs::read_dir(&icons_dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e.eq_ignore_ascii_case("png")))
            .collect();
        pngs.sort();
        candidates.extend(pngs);
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{BundleSettings, PackageSettings, SettingsBuilder};
    use tempfile::TempDir;

    fn settings(project: &Path, icon: Option<&str>) -> Settings {
        SettingsBuilder::new()
            .project_dir(project)
            .app_dir(project.join("app"))
            .output_dir(project.join("dist"))
            .platform(Platform::Linux)
            .package_settings(PackageSettings {
                name: "app".into(),
                version: "1.0.0".into(),
                ..Default::default()
            })
            .bundle_settings(BundleSettings {
                icon: icon.map(PathBuf::from),
                ..Default::default()
            })
            .build()
            .unwrap()
    }

    fn png(path: &Path, width: u32, height: u32) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbaImage::new(width, height).save(path).unwrap();
    }

    #[tokio::test]
    async fn test_configured_icon_resolution_order() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("logo.png"), "x").unwrap();
        let s = settings(tmp.path(), Some("logo.png"));
        assert_eq!(
            resolve_icon(&s, &ImageIconConverter).await.unwrap(),
            Some(ResolvedIcon::Configured(tmp.path().join("logo.png")))
        );

        std::fs::create_dir_all(tmp.path().join("build")).unwrap();
        std::fs::write(tmp.path().join("build/logo.png"), "x").unwrap();
        assert_eq!(
            resolve_icon(&s, &ImageIconConverter).await.unwrap(),
            Some(ResolvedIcon::Configured(tmp.path().join("build/logo.png")))
        );

        let missing = settings(tmp.path(), Some("nope.png"));
        assert!(resolve_icon(&missing, &ImageIconConverter).await.unwrap_err().is_configuration());
    }

    #[tokio::test]
    async fn test_candidates_sorted_by_size() {
        let tmp = TempDir::new().unwrap();
        png(&tmp.path().join("build/icons/512x512.png"), 512, 512);
        png(&tmp.path().join("build/icons/64x64.png"), 64, 64);
        let s = settings(tmp.path(), None);
        let Some(ResolvedIcon::Converted(icons)) = resolve_icon(&s, &ImageIconConverter).await.unwrap() else {
            panic!("expected converted icons");
        };
        assert_eq!(icons.iter().map(|i| i.1).collect::<Vec<_>>(), vec![64, 512]);
    }

    #[tokio::test]
    async fn test_non_square_icon_is_rejected() {
        let tmp = TempDir::new().unwrap();
        png(&tmp.path().join("build/icon.png"), 64, 32);
        let s = settings(tmp.path(), None);
        assert!(resolve_icon(&s, &ImageIconConverter).await.unwrap_err().is_configuration());
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let tmp = TempDir::new().unwrap();
        let s = settings(tmp.path(), None);
        assert_eq!(resolve_icon(&s, &ImageIconConverter).await.unwrap(), None);
    }
}
