//! Packaging of all configured architectures.
//!
//! [`Packager`] runs one [`PlatformPackager`] per architecture on a shared
//! [`TaskManager`] and builds the configured targets from every output
//! directory that completed.

use super::{
    hooks::{PackHook, StagePreparer},
    pipeline::{Collaborators, PackOutcome, PackStage, PlatformPackager},
    signing::Signer,
};
use crate::bundler::{
    Result, Settings,
    files::ContentTransformer,
    resources::{IconConverter, resolve_icon},
    target::Target,
    tasks::TaskManager,
};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Packages an application for every configured architecture.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_package::bundler::{Packager, Settings, target_by_name};
///
/// # async fn example(settings: Settings) -> kodegen_bundler_package::bundler::Result<()> {
/// let packager = Packager::new(settings)
///     .targets(target_by_name("dir").into_iter().collect());
///
/// for outcome in packager.pack().await? {
///     if let Some(report) = outcome.report() {
///         println!("{} -> {}", report.arch, report.app_out_dir.display());
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Packager {
    settings: Arc<Settings>,
    collaborators: Collaborators,
    targets: Vec<Arc<dyn Target>>,
    token: CancellationToken,
}

impl Packager {
    /// Creates a packager with no-op collaborators and no targets.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            collaborators: Collaborators::default(),
            targets: Vec::new(),
            token: CancellationToken::new(),
        }
    }

    /// Prepares each output directory before application files are copied.
    pub fn stage(mut self, stage: impl StagePreparer + 'static) -> Self {
        self.collaborators.stage = Arc::new(stage);
        self
    }

    pub fn signer(mut self, signer: impl Signer + 'static) -> Self {
        self.collaborators.signer = Arc::new(signer);
        self
    }

    /// Runs after all files are in place, before the sanity check.
    pub fn after_pack(mut self, hook: impl PackHook + 'static) -> Self {
        self.collaborators.after_pack = Some(Arc::new(hook));
        self
    }

    /// Runs after signing.
    pub fn after_sign(mut self, hook: impl PackHook + 'static) -> Self {
        self.collaborators.after_sign = Some(Arc::new(hook));
        self
    }

    pub fn icon_converter(mut self, converter: impl IconConverter + 'static) -> Self {
        self.collaborators.icon_converter = Arc::new(converter);
        self
    }

    /// Adds a transformer for extra files and unarchived application files.
    pub fn extra_transformer(mut self, transformer: Arc<dyn ContentTransformer>) -> Self {
        self.collaborators.extra_transformers = self.collaborators.extra_transformers.with(transformer);
        self
    }

    /// Targets built from each completed output directory.
    pub fn targets(mut self, targets: Vec<Arc<dyn Target>>) -> Self {
        self.targets = targets;
        self
    }

    /// Uses an externally controlled cancellation token.
    pub fn token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Token that stops the build at its next checkpoint.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Packages every architecture and builds the targets.
    ///
    /// Outcomes are returned in architecture order. Cancellation is not an
    /// error: architectures that did not finish report
    /// [`PackOutcome::Cancelled`] with the last stage they completed.
    pub async fn pack(&self) -> Result<Vec<PackOutcome>> {
        let icon = resolve_icon(&self.settings, self.collaborators.icon_converter.as_ref()).await?;
        if let Some(icon) = &icon {
            log::debug!("application icon: {icon:?}");
        }

        let archs = self.settings.archs().to_vec();
        let target_names: Vec<String> = self.targets.iter().map(|t| t.name().to_string()).collect();
        let outcomes: Arc<Mutex<Vec<Option<PackOutcome>>>> = Arc::new(Mutex::new(vec![None; archs.len()]));
        let mut progress = Vec::with_capacity(archs.len());

        let mut manager = TaskManager::new(self.token.clone());
        for (index, arch) in archs.iter().copied().enumerate() {
            let packager = PlatformPackager::new(
                self.settings.clone(),
                self.collaborators.clone(),
                arch,
                target_names.clone(),
                self.token.clone(),
            )
            .with_icon(icon.clone());
            progress.push(packager.progress());

            let outcomes = outcomes.clone();
            let targets = self.targets.clone();
            let token = self.token.clone();
            manager.add(async move {
                let outcome = packager.run().await?;
                let report = outcome.report().cloned();
                if let Ok(mut outcomes) = outcomes.lock() {
                    outcomes[index] = Some(outcome);
                }

                if let Some(report) = report
                    && !targets.is_empty()
                {
                    let mut builds = TaskManager::new(token);
                    builds.add_targets(&targets, report.app_out_dir, report.arch);
                    builds.await_settled().await?;
                }
                Ok(())
            });
        }

        // Pipelines stop at their own checkpoints; wait for them so nothing
        // is still writing when the outcomes are reported.
        match manager.await_settled().await {
            Ok(()) => {}
            Err(error) if error.is_cancelled() => log::info!("packaging cancelled"),
            Err(error) => return Err(error),
        }

        let finished = outcomes.lock().map(|o| o.clone()).unwrap_or_default();
        Ok(finished
            .into_iter()
            .zip(progress)
            .map(|(outcome, progress)| {
                outcome.unwrap_or_else(|| PackOutcome::Cancelled {
                    after: progress.lock().map(|stage| *stage).unwrap_or(PackStage::Init),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{Arch, BundleSettings, PackageSettings, Platform, SettingsBuilder, target::ChecksumTarget};
    use std::path::Path;
    use tempfile::TempDir;

    fn app(root: &Path) {
        let app = root.join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join("package.json"), r#"{"name":"demo","version":"1.0.0","main":"main.js"}"#).unwrap();
        std::fs::write(app.join("main.js"), "console.log(1)").unwrap();
    }

    fn settings(root: &Path, archs: Vec<Arch>) -> Settings {
        SettingsBuilder::new()
            .project_dir(root)
            .app_dir(root.join("app"))
            .output_dir(root.join("dist"))
            .platform(Platform::Linux)
            .archs(archs)
            .package_settings(PackageSettings {
                name: "demo".into(),
                version: "1.0.0".into(),
                ..Default::default()
            })
            .bundle_settings(BundleSettings::default())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_packs_each_arch_in_order() {
        let tmp = TempDir::new().unwrap();
        app(tmp.path());
        let outcomes = Packager::new(settings(tmp.path(), vec![Arch::X64, Arch::Arm64]))
            .pack()
            .await
            .unwrap();

        let reports: Vec<_> = outcomes.iter().map(|o| o.report().unwrap()).collect();
        assert_eq!(reports[0].arch, Arch::X64);
        assert_eq!(reports[1].arch, Arch::Arm64);
        assert_eq!(reports[0].stage, PackStage::Done);
        assert!(tmp.path().join("dist/linux-unpacked/resources/app.asar").is_file());
        assert!(tmp.path().join("dist/linux-arm64-unpacked/resources/app.asar").is_file());
    }

    #[tokio::test]
    async fn test_targets_run_after_packing() {
        let tmp = TempDir::new().unwrap();
        app(tmp.path());
        Packager::new(settings(tmp.path(), vec![Arch::X64]))
            .targets(vec![Arc::new(ChecksumTarget) as Arc<dyn Target>])
            .pack()
            .await
            .unwrap();
        let out = tmp.path().join("dist/linux-unpacked");
        assert!(ChecksumTarget::checksum_path(&out).is_file());
    }

    /// Cancels the build, then keeps working for a while.
    #[derive(Debug)]
    struct SlowCancellingStage {
        token: CancellationToken,
        marker: std::path::PathBuf,
    }

    #[async_trait::async_trait]
    impl StagePreparer for SlowCancellingStage {
        async fn prepare(&self, _context: &crate::bundler::PackContext) -> Result<()> {
            self.token.cancel();
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            tokio::fs::write(&self.marker, b"done").await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_pack_waits_for_cancelled_pipelines() {
        let tmp = TempDir::new().unwrap();
        app(tmp.path());
        let token = CancellationToken::new();
        let marker = tmp.path().join("stage-finished");

        let outcomes = Packager::new(settings(tmp.path(), vec![Arch::X64]))
            .token(token.clone())
            .stage(SlowCancellingStage {
                token,
                marker: marker.clone(),
            })
            .pack()
            .await
            .unwrap();

        assert!(marker.is_file());
        assert_eq!(outcomes, vec![PackOutcome::Cancelled { after: PackStage::FilesCopied }]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let tmp = TempDir::new().unwrap();
        app(tmp.path());
        let packager = Packager::new(settings(tmp.path(), vec![Arch::X64]));
        packager.cancellation_token().cancel();
        let outcomes = packager.pack().await.unwrap();
        assert_eq!(outcomes, vec![PackOutcome::Cancelled { after: PackStage::Init }]);
        assert!(!tmp.path().join("dist/linux-unpacked").exists());
    }
}
