//! Packaging pipeline for one output directory and architecture.
//!
//! ```text
//! Init -> StagePrepared -> ExcludePatternsComputed -> FilesCopied
//!      -> ExtraFilesCopied -> PostPackHookRun -> SanityChecked
//!      -> Signed -> PostSignHookRun -> Done
//! ```
//!
//! Cancellation is observed after `FilesCopied` and after
//! `ExtraFilesCopied`; a cancelled run stops there without running hooks,
//! the sanity check or the signer.

use super::{
    context::PackContext,
    hooks::{NoopStage, PackHook, StagePreparer},
    sanity,
    signing::{NoopSigner, Signer},
};
use crate::bundler::{
    Arch, Result, Settings,
    archive::{self, ARCHIVE_NAME, IntegrityExemptions, IntegrityRecord, UnpackFilter},
    error::Context,
    files::{
        AppFiles, ExcludeSet, FileMatcher, FileSet, PackageDescriptorTransformer,
        TransformerChain, compute_app_file_set, compute_exclude_set, compute_file_group,
        copy_file_set,
    },
    macros::{ExpandMode, MacroExpander, sanitize_file_name},
    naming::ArtifactNamer,
    resources::{IconConverter, ImageIconConverter, ResolvedIcon},
    settings::FileSetConfig,
    tasks::checkpoint,
    utils::fs,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Pipeline states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PackStage {
    Init,
    StagePrepared,
    ExcludePatternsComputed,
    FilesCopied,
    ExtraFilesCopied,
    PostPackHookRun,
    SanityChecked,
    Signed,
    PostSignHookRun,
    Done,
}

impl fmt::Display for PackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Summary of one finished pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackReport {
    pub arch: Arch,
    pub app_out_dir: PathBuf,
    pub resources_dir: PathBuf,
    /// Archive path when the application was packed or passed through.
    pub archive: Option<PathBuf>,
    /// Digest of a freshly packed archive.
    pub integrity: Option<IntegrityRecord>,
    /// Application files written (archive members or copied files).
    pub files: usize,
    /// Last stage reached; `Init` when a prepackaged directory was used.
    pub stage: PackStage,
}

/// How one pipeline ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackOutcome {
    Completed(PackReport),
    /// Stopped at a checkpoint; `after` is the last completed stage.
    Cancelled { after: PackStage },
}

impl PackOutcome {
    pub fn report(&self) -> Option<&PackReport> {
        match self {
            PackOutcome::Completed(report) => Some(report),
            PackOutcome::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PackOutcome::Cancelled { .. })
    }
}

/// External collaborators of the pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub stage: Arc<dyn StagePreparer>,
    pub signer: Arc<dyn Signer>,
    pub after_pack: Option<Arc<dyn PackHook>>,
    pub after_sign: Option<Arc<dyn PackHook>>,
    pub icon_converter: Arc<dyn IconConverter>,
    /// Consulted for extra files, and before the main transformers when not archiving.
    pub extra_transformers: TransformerChain,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            stage: Arc::new(NoopStage),
            signer: Arc::new(NoopSigner),
            after_pack: None,
            after_sign: None,
            icon_converter: Arc::new(ImageIconConverter),
            extra_transformers: TransformerChain::new(),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("stage", &self.stage)
            .field("signer", &self.signer)
            .field("after_pack", &self.after_pack.is_some())
            .field("after_sign", &self.after_sign.is_some())
            .field("icon_converter", &self.icon_converter)
            .finish_non_exhaustive()
    }
}

/// One run of the pipeline.
pub struct PlatformPackager {
    settings: Arc<Settings>,
    collaborators: Collaborators,
    token: CancellationToken,
    context: PackContext,
    expander: MacroExpander,
    stage: PackStage,
    progress: Arc<Mutex<PackStage>>,
}

impl PlatformPackager {
    /// Prepares a run for `arch`, building into `settings.app_out_dir(arch)`.
    pub fn new(
        settings: Arc<Settings>,
        collaborators: Collaborators,
        arch: Arch,
        targets: Vec<String>,
        token: CancellationToken,
    ) -> Self {
        let app_out_dir = settings.app_out_dir(arch);
        let product_name = sanitize_file_name(settings.product_name());
        let resources_dir = settings
            .platform()
            .resources_dir(&app_out_dir, &product_name);
        let context = PackContext {
            app_out_dir,
            resources_dir,
            arch,
            platform: settings.platform(),
            targets,
            product_name,
            archive: None,
            icon: None,
            artifact_namer: ArtifactNamer::from_settings(&settings),
        };
        Self {
            expander: MacroExpander::from_settings(&settings),
            settings,
            collaborators,
            token,
            context,
            stage: PackStage::Init,
            progress: Arc::new(Mutex::new(PackStage::Init)),
        }
    }

    /// Makes the resolved icon available to collaborators.
    pub fn with_icon(mut self, icon: Option<ResolvedIcon>) -> Self {
        self.context.icon = icon;
        self
    }

    /// Shared view of the last completed stage.
    pub fn progress(&self) -> Arc<Mutex<PackStage>> {
        self.progress.clone()
    }

    fn advance(&mut self, next: PackStage) {
        log::debug!(
            "[{} {}] {} -> {}",
            self.context.app_out_dir.display(),
            self.context.arch,
            self.stage,
            next
        );
        self.stage = next;
        if let Ok(mut progress) = self.progress.lock() {
            *progress = next;
        }
    }

    fn cancelled(&self) -> bool {
        if checkpoint(&self.token).is_err() {
            log::info!(
                "packaging for {} cancelled after {}",
                self.context.arch,
                self.stage
            );
            return true;
        }
        false
    }

    /// Runs the pipeline to completion or to the first observed cancellation.
    pub async fn run(mut self) -> Result<PackOutcome> {
        if let Some(prepackaged) = self.settings.prepackaged() {
            log::info!("using prepackaged {}", prepackaged.display());
            return Ok(PackOutcome::Completed(PackReport {
                arch: self.context.arch,
                app_out_dir: prepackaged.to_path_buf(),
                resources_dir: self
                    .context
                    .platform
                    .resources_dir(prepackaged, &self.context.product_name),
                archive: None,
                integrity: None,
                files: 0,
                stage: PackStage::Init,
            }));
        }
        if self.cancelled() {
            return Ok(PackOutcome::Cancelled { after: self.stage });
        }

        log::info!(
            "packaging {} for {} {} into {}",
            self.settings.product_name(),
            self.context.platform,
            self.context.arch,
            self.context.app_out_dir.display()
        );

        fs::create_dir_all(&self.context.app_out_dir, true).await?;
        self.collaborators.stage.prepare(&self.context).await?;
        self.advance(PackStage::StagePrepared);

        let extra_matchers = self.extra_matchers()?;
        let app_exclude = self.app_exclude_set(&extra_matchers);
        self.advance(PackStage::ExcludePatternsComputed);

        let (files, integrity) = self.copy_app(&app_exclude).await?;
        self.advance(PackStage::FilesCopied);
        if self.cancelled() {
            return Ok(PackOutcome::Cancelled { after: self.stage });
        }

        self.copy_extra(&extra_matchers).await?;
        self.advance(PackStage::ExtraFilesCopied);
        if self.cancelled() {
            return Ok(PackOutcome::Cancelled { after: self.stage });
        }

        if let Some(hook) = &self.collaborators.after_pack {
            hook.run(&self.context).await.context("after-pack hook failed")?;
        }
        self.advance(PackStage::PostPackHookRun);

        sanity::check_output(
            &self.context.app_out_dir,
            &self.app_dir_out(),
            self.context.archive.as_deref(),
        )
        .await?;
        self.advance(PackStage::SanityChecked);

        let is_asar = self.context.is_asar();
        self.collaborators.signer.sign(&self.context, is_asar).await?;
        self.advance(PackStage::Signed);

        if let Some(hook) = &self.collaborators.after_sign {
            hook.run(&self.context).await.context("after-sign hook failed")?;
        }
        self.advance(PackStage::PostSignHookRun);
        self.advance(PackStage::Done);

        Ok(PackOutcome::Completed(PackReport {
            arch: self.context.arch,
            app_out_dir: self.context.app_out_dir.clone(),
            resources_dir: self.context.resources_dir.clone(),
            archive: self.context.archive.clone(),
            integrity,
            files,
            stage: self.stage,
        }))
    }

    /// Unpacked application directory (`resources/app`).
    fn app_dir_out(&self) -> PathBuf {
        self.context.resources_dir.join("app")
    }

    /// Resources directory relative to the output root.
    fn resources_rel(&self) -> PathBuf {
        self.context
            .resources_dir
            .strip_prefix(&self.context.app_out_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from("resources"))
    }

    fn expand_path(&self, path: &Path) -> Result<PathBuf> {
        let expanded = self.expander.expand_with(
            &path.to_string_lossy(),
            Some(self.context.arch.name()),
            &[],
            ExpandMode::lenient(),
        )?;
        Ok(PathBuf::from(expanded))
    }

    fn matcher_for(&self, config: &FileSetConfig, dest_root: &Path) -> Result<FileMatcher> {
        let project_dir = self.settings.project_dir();
        let from = match &config.from {
            Some(from) => project_dir.join(self.expand_path(from)?),
            None => project_dir.to_path_buf(),
        };
        let to = match &config.to {
            Some(to) => dest_root.join(self.expand_path(to)?),
            None => dest_root.to_path_buf(),
        };
        let patterns = if config.filter.is_empty() {
            vec!["**/*".to_string()]
        } else {
            config.filter.clone()
        };
        FileMatcher::compile(
            &patterns,
            from,
            to,
            Some(&self.expander),
            Some(self.context.arch.name()),
        )
    }

    /// Extra resource matchers followed by extra file matchers, destinations
    /// relative to the output root.
    fn extra_matchers(&self) -> Result<Vec<FileMatcher>> {
        let resources_rel = self.resources_rel();
        let mut matchers = Vec::new();
        for config in self.settings.extra_resources() {
            matchers.push(self.matcher_for(&config, &resources_rel)?);
        }
        for config in self.settings.extra_files() {
            matchers.push(self.matcher_for(&config, Path::new(""))?);
        }
        Ok(matchers)
    }

    /// Extra sets reading from inside the app dir are kept out of the app copy.
    fn app_exclude_set(&self, extra_matchers: &[FileMatcher]) -> ExcludeSet {
        let app_dir = self.settings.app_dir();
        let rebased: Vec<FileMatcher> = extra_matchers
            .iter()
            .filter_map(|m| {
                m.from()
                    .strip_prefix(app_dir)
                    .ok()
                    .map(|relative| m.rebased(relative))
            })
            .collect();
        compute_exclude_set(&rebased.iter().collect::<Vec<_>>())
    }

    fn main_transformers(&self) -> TransformerChain {
        TransformerChain::new().with(Arc::new(PackageDescriptorTransformer::new(
            self.settings.bundle_settings().extra_metadata.as_ref(),
        )))
    }

    async fn copy_app(&mut self, exclude: &ExcludeSet) -> Result<(usize, Option<IntegrityRecord>)> {
        let app_dir = self.settings.app_dir().to_path_buf();
        let pre_archived = app_dir.join(ARCHIVE_NAME);
        let archive_path = self.context.resources_dir.join(ARCHIVE_NAME);

        if pre_archived.is_file() {
            log::info!("{} is already archived, copying it through", app_dir.display());
            fs::copy_file(&pre_archived, &archive_path).await?;
            let mirror = archive::unpacked_dir(&pre_archived);
            if mirror.is_dir() {
                fs::copy_dir(&mirror, &archive::unpacked_dir(&archive_path)).await?;
            }
            self.context.archive = Some(archive_path);
            return Ok((1, None));
        }

        let bundle = self.settings.bundle_settings();
        let patterns = self.settings.file_patterns();
        let mut ignored = vec![self.settings.output_dir().to_path_buf()];
        let build_resources = self.settings.build_resources_dir();
        if build_resources.starts_with(&app_dir) {
            ignored.push(build_resources);
        }
        let app = AppFiles {
            app_dir: &app_dir,
            patterns: &patterns,
            dependencies: bundle.dependencies,
            expander: &self.expander,
            arch: self.context.arch.name(),
            ignored_dirs: &ignored,
        };

        if !self.settings.is_asar() {
            let chain = self.collaborators.extra_transformers.clone().then(&self.main_transformers());
            let set = compute_app_file_set(&app, exclude, &chain).await?;
            let target = self.app_dir_out();
            fs::remove_dir_all(&target).await?;
            let written = copy_file_set(&set, &target).await?;
            return Ok((written, None));
        }

        let set = compute_app_file_set(&app, exclude, &self.main_transformers()).await?;
        let unpack = UnpackFilter::new(&bundle.asar.unpack, bundle.asar.smart_unpack)?;
        let exempt = IntegrityExemptions::new(&bundle.asar.integrity_exempt)?;
        let packed = archive::pack(&set, &archive_path, &unpack, &exempt).await?;
        let files = packed.header.files().len();
        self.context.archive = Some(packed.path);
        Ok((files, Some(packed.integrity)))
    }

    async fn copy_extra(&self, matchers: &[FileMatcher]) -> Result<usize> {
        if matchers.is_empty() {
            return Ok(0);
        }
        let chain = &self.collaborators.extra_transformers;
        let mut set = FileSet::new();
        for (index, matcher) in matchers.iter().enumerate() {
            let earlier: Vec<&FileMatcher> = matchers[..index].iter().collect();
            let exclude = compute_exclude_set(&earlier);
            set.push_group(compute_file_group(matcher, &exclude, chain).await?);
        }
        copy_file_set(&set, &self.context.app_out_dir).await
    }
}
