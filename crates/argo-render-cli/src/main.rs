//! argo-render - render an application's manifests for Argo CD
//!
//! Reads `app.yaml`, copies the enclosing git checkout into a temporary
//! workspace, expands `@<< >>@` templates against the registered
//! datasources, runs `helm template` and `kustomize build`, and prints the
//! result on stdout.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use argo_render_core::{Config, find_repo_root};
use argo_render_engine::Datasource;
use argo_render_pipeline::{Pipeline, PipelineOptions, ReleaseDefaults};
use argo_render_tfstate::{CachedFetcher, S3Fetcher, S3Options, TerraformState};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod error;
mod exit_codes;

use error::{CliError, Result};

#[derive(Parser, Debug)]
#[command(name = "argo-render")]
#[command(version)]
#[command(about = "Render helm + kustomize manifests with templated datasources", long_about = None)]
struct Cli {
    /// Path to the job config file
    #[arg(long, default_value = "app.yaml")]
    config: PathBuf,

    /// Register the `terraform` datasource (needs AWS credentials)
    #[arg(long)]
    enable_terraform: bool,

    /// Expand templates in the final kustomize output as well
    #[arg(long)]
    enable_post_render: bool,

    /// Enable debug logging on stderr
    #[arg(long)]
    debug: bool,

    /// Release name used when helm.releaseName is unset
    #[arg(long, env = "ARGOCD_APP_NAME")]
    release_name: Option<String>,

    /// Namespace used when helm.namespace is unset
    #[arg(long, env = "ARGOCD_APP_NAMESPACE")]
    namespace: Option<String>,

    #[arg(long, default_value = "helm")]
    helm_bin: String,

    #[arg(long, default_value = "kustomize")]
    kustomize_bin: String,

    /// Region of the terraform state buckets
    #[arg(long, env = "AWS_REGION")]
    s3_region: Option<String>,

    /// S3-compatible endpoint for the terraform state buckets
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    s3_endpoint: Option<String>,
}

/// Empty environment values count as unset
fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let app_file = std::path::absolute(&cli.config)?;
    let config = Config::load(&app_file)?;

    let app_dir = app_file.parent().unwrap_or(Path::new("/"));
    let repo_root = find_repo_root(app_dir)?;
    let app_rel = app_file.strip_prefix(&repo_root).map_err(|_| {
        CliError::config(format!(
            "{} is not inside {}",
            app_file.display(),
            repo_root.display()
        ))
    })?;
    tracing::debug!(repo = %repo_root.display(), app = %app_rel.display(), "job located");

    let mut options = PipelineOptions::default()
        .post_render(cli.enable_post_render)
        .release(ReleaseDefaults {
            name: non_empty(&cli.release_name),
            namespace: non_empty(&cli.namespace),
        })
        .helm_bin(&cli.helm_bin)
        .kustomize_bin(&cli.kustomize_bin);

    if cli.enable_terraform {
        options = options.terraform(terraform_datasource(cli)?);
    }

    let output = Pipeline::new(options).run(&config, &repo_root, app_rel)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Terraform states from S3, fetched at most once per key for this run
fn terraform_datasource(cli: &Cli) -> Result<Arc<dyn Datasource>> {
    let fetcher = S3Fetcher::new(S3Options {
        region: non_empty(&cli.s3_region),
        endpoint: non_empty(&cli.s3_endpoint),
    })?;
    Ok(Arc::new(TerraformState::new(CachedFetcher::new(fetcher))))
}
