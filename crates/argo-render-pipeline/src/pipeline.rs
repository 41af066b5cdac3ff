//! Render job orchestration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use argo_render_core::{Config, HelmConfig, Workspace};
use argo_render_engine::{
    Datasource, DatasourceRegistry, Engine, FileDatasource, OverlayPreprocessor, StagedFiles,
};

use crate::error::{PipelineError, Result};
use crate::stage::{Progress, Stage};
use crate::tools::helm::{ChartRender, ReleaseDefaults};
use crate::tools::kustomize::OverlayBuild;
use crate::tools::{ProcessRunner, ToolRunner};

/// Template identity of the final pass over the built output
pub const POST_RENDER_TEMPLATE: &str = "postrender";

/// Per-process settings shared by every job
#[derive(Clone)]
pub struct PipelineOptions {
    /// Registered as the `terraform` datasource when present
    pub terraform: Option<Arc<dyn Datasource>>,

    /// Expand the combined overlay output once more as a template
    pub post_render: bool,

    pub release: ReleaseDefaults,

    pub helm_bin: String,

    pub kustomize_bin: String,

    /// Parent of the temporary workspace; the system temp dir when unset
    pub temp_root: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            terraform: None,
            post_render: false,
            release: ReleaseDefaults::default(),
            helm_bin: "helm".to_string(),
            kustomize_bin: "kustomize".to_string(),
            temp_root: None,
        }
    }
}

impl PipelineOptions {
    pub fn terraform(mut self, source: Arc<dyn Datasource>) -> Self {
        self.terraform = Some(source);
        self
    }

    pub fn post_render(mut self, enabled: bool) -> Self {
        self.post_render = enabled;
        self
    }

    pub fn release(mut self, defaults: ReleaseDefaults) -> Self {
        self.release = defaults;
        self
    }

    pub fn helm_bin(mut self, program: impl Into<String>) -> Self {
        self.helm_bin = program.into();
        self
    }

    pub fn kustomize_bin(mut self, program: impl Into<String>) -> Self {
        self.kustomize_bin = program.into();
        self
    }

    pub fn temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }
}

impl std::fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("terraform", &self.terraform.is_some())
            .field("post_render", &self.post_render)
            .field("release", &self.release)
            .field("helm_bin", &self.helm_bin)
            .field("kustomize_bin", &self.kustomize_bin)
            .field("temp_root", &self.temp_root)
            .finish()
    }
}

/// Runs render jobs
#[derive(Debug)]
pub struct Pipeline<R = ProcessRunner> {
    options: PipelineOptions,
    runner: R,
}

impl Pipeline<ProcessRunner> {
    pub fn new(options: PipelineOptions) -> Self {
        Self::with_runner(options, ProcessRunner)
    }
}

impl<R: ToolRunner> Pipeline<R> {
    pub fn with_runner(options: PipelineOptions, runner: R) -> Self {
        Self { options, runner }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Render the job described by `config`
    ///
    /// `app_file` is the config file path relative to `repo_root`. The
    /// config is validated before anything touches the filesystem, and the
    /// workspace is gone by the time this returns.
    pub fn run(&self, config: &Config, repo_root: &Path, app_file: &Path) -> Result<String> {
        let mut progress = Progress::new();
        let result = self.run_stages(config, repo_root, app_file, &mut progress);

        match &result {
            Ok(output) => tracing::info!(bytes = output.len(), "render complete"),
            Err(e) => tracing::debug!(stage = %progress.stage(), error = %e, "render failed"),
        }
        result
    }

    fn run_stages(
        &self,
        config: &Config,
        repo_root: &Path,
        app_file: &Path,
        progress: &mut Progress,
    ) -> Result<String> {
        config.validate()?;

        let workspace = match &self.options.temp_root {
            Some(parent) => Workspace::prepare_in(parent, repo_root, app_file)?,
            None => Workspace::prepare(repo_root, app_file)?,
        };
        progress.advance(Stage::WorkspacePrepared);

        // Expansions waiting to be written; the `file` datasource reads through it
        let staged = StagedFiles::new();
        let engine = Engine::new(self.registry(&workspace, &staged))?;
        progress.advance(Stage::DatasourcesRegistered);

        if let Some(helm) = &config.helm {
            self.render_chart(helm, &workspace, &engine, &staged, progress)?;
        }

        let overlay = workspace.resolve(config.overlay_path());
        let expanded = OverlayPreprocessor::new(&engine)
            .with_staged(staged)
            .preprocess(&overlay)?;
        tracing::debug!(overlay = %overlay.display(), expanded, "overlay preprocessed");
        progress.advance(Stage::OverlayPreprocessed);

        let build = OverlayBuild::new(&overlay);
        let mut output = self
            .runner
            .run(&build.invocation(&self.options.kustomize_bin, workspace.app_dir()))?;
        progress.advance(Stage::OverlayBuilt);

        if self.options.post_render {
            output = engine.render(POST_RENDER_TEMPLATE, &output)?;
            progress.advance(Stage::PostRendered);
        }

        if let Err(e) = workspace.close() {
            tracing::warn!(error = %e, "failed to remove workspace");
        }
        progress.advance(Stage::Done);
        Ok(output)
    }

    /// Datasources for one job, rooted in its workspace
    fn registry(&self, workspace: &Workspace, staged: &StagedFiles) -> DatasourceRegistry {
        let mut registry = DatasourceRegistry::new();
        registry.register(
            "file",
            FileDatasource::new(workspace.root(), workspace.app_dir()).with_staged(staged.clone()),
        );
        if let Some(terraform) = &self.options.terraform {
            registry.register_arc("terraform", Arc::clone(terraform));
        }
        tracing::debug!(datasources = ?registry.names(), "datasources registered");
        registry
    }

    fn render_chart(
        &self,
        helm: &HelmConfig,
        workspace: &Workspace,
        engine: &Engine,
        staged: &StagedFiles,
        progress: &mut Progress,
    ) -> Result<()> {
        let values: Vec<PathBuf> = helm.values.iter().map(|v| workspace.resolve(v)).collect();
        let chart = ChartRender::resolve(helm, &self.options.release, workspace, values)?;

        for file in &chart.values {
            staged.expand(engine, file)?;
        }
        staged.materialize()?;
        progress.advance(Stage::ValuesTemplated);

        let rendered = self
            .runner
            .run(&chart.invocation(&self.options.helm_bin, workspace.app_dir()))?;

        let output = workspace.resolve(&helm.output);
        write_output(&output, &rendered)?;
        tracing::debug!(output = %output.display(), release = %chart.release, "chart rendered");
        progress.advance(Stage::ChartRendered);
        Ok(())
    }
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    let write_err = |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, content).map_err(write_err)
}
