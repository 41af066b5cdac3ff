//! Chart rendering through `helm template`

use std::path::{Path, PathBuf};

use argo_render_core::{HelmConfig, Workspace};

use crate::error::{PipelineError, Result};
use crate::tools::Invocation;

/// Release identity used when the config leaves it unset
///
/// The binary fills this from `ARGOCD_APP_NAME` / `ARGOCD_APP_NAMESPACE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseDefaults {
    pub name: Option<String>,
    pub namespace: Option<String>,
}

/// A resolved `helm template` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRender {
    pub release: String,
    /// Local chart path, or chart name inside `repo`
    pub chart: String,
    pub repo: Option<String>,
    pub version: Option<String>,
    pub namespace: Option<String>,
    pub values: Vec<PathBuf>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl ChartRender {
    /// Resolve config against the workspace and the release defaults
    ///
    /// The release name must come from one of the two; the namespace may
    /// stay unset, in which case helm picks its own.
    pub fn resolve(
        helm: &HelmConfig,
        defaults: &ReleaseDefaults,
        workspace: &Workspace,
        values: Vec<PathBuf>,
    ) -> Result<Self> {
        let release = non_empty(&helm.release_name)
            .or_else(|| defaults.name.clone().filter(|n| !n.is_empty()))
            .ok_or(PipelineError::MissingReleaseName)?;

        let namespace = non_empty(&helm.namespace)
            .or_else(|| defaults.namespace.clone().filter(|n| !n.is_empty()));

        let (chart, repo, version) = if helm.is_remote() {
            (
                helm.chart.clone(),
                Some(helm.repo.clone()),
                non_empty(&helm.version),
            )
        } else {
            let path = workspace.resolve(&helm.chart);
            (path.to_string_lossy().into_owned(), None, None)
        };

        Ok(Self {
            release,
            chart,
            repo,
            version,
            namespace,
            values,
        })
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["template".to_string(), self.release.clone(), self.chart.clone()];

        if let Some(repo) = &self.repo {
            args.extend(["--repo".to_string(), repo.clone()]);
            if let Some(version) = &self.version {
                args.extend(["--version".to_string(), version.clone()]);
            }
        }
        if let Some(namespace) = &self.namespace {
            args.extend(["--namespace".to_string(), namespace.clone()]);
        }
        for file in &self.values {
            args.extend(["--values".to_string(), file.to_string_lossy().into_owned()]);
        }

        args
    }

    pub fn invocation(&self, program: &str, cwd: &Path) -> Invocation {
        Invocation::new(program, self.args(), cwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, TempDir, Workspace) {
        let repo = TempDir::new().unwrap();
        std::fs::create_dir_all(repo.path().join("apps/web")).unwrap();
        let parent = TempDir::new().unwrap();
        let ws = Workspace::prepare_in(parent.path(), repo.path(), Path::new("apps/web/app.yaml"))
            .unwrap();
        (repo, parent, ws)
    }

    fn helm(chart: &str) -> HelmConfig {
        HelmConfig {
            chart: chart.to_string(),
            output: "base/helm.yaml".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_remote_chart_args() {
        let render = ChartRender {
            release: "ingress".to_string(),
            chart: "ingress-nginx".to_string(),
            repo: Some("https://kubernetes.github.io/ingress-nginx".to_string()),
            version: Some("4.10.0".to_string()),
            namespace: Some("ingress-system".to_string()),
            values: vec![PathBuf::from("/ws/values.yaml"), PathBuf::from("/ws/prod.yaml")],
        };
        insta::assert_snapshot!(
            render.args().join(" "),
            @"template ingress ingress-nginx --repo https://kubernetes.github.io/ingress-nginx --version 4.10.0 --namespace ingress-system --values /ws/values.yaml --values /ws/prod.yaml"
        );
    }

    #[test]
    fn test_local_chart_args() {
        let render = ChartRender {
            release: "web".to_string(),
            chart: "/ws/charts/web".to_string(),
            repo: None,
            version: Some("ignored".to_string()),
            namespace: None,
            values: vec![],
        };
        insta::assert_snapshot!(render.args().join(" "), @"template web /ws/charts/web");
    }

    #[test]
    fn test_local_chart_resolved_in_workspace() {
        let (_repo, _parent, ws) = workspace();
        let mut cfg = helm("/charts/web");
        cfg.release_name = "web".to_string();
        cfg.version = "1.0.0".to_string();

        let render = ChartRender::resolve(&cfg, &ReleaseDefaults::default(), &ws, vec![]).unwrap();
        assert_eq!(PathBuf::from(&render.chart), ws.root().join("charts/web"));
        assert_eq!(render.version, None);

        let render = ChartRender::resolve(&helm("chart"), &named("x"), &ws, vec![]).unwrap();
        assert_eq!(PathBuf::from(&render.chart), ws.app_dir().join("chart"));
    }

    fn named(name: &str) -> ReleaseDefaults {
        ReleaseDefaults {
            name: Some(name.to_string()),
            namespace: Some("from-env".to_string()),
        }
    }

    #[test]
    fn test_release_falls_back_to_defaults() {
        let (_repo, _parent, ws) = workspace();
        let render = ChartRender::resolve(&helm("c"), &named("argo-app"), &ws, vec![]).unwrap();
        assert_eq!(render.release, "argo-app");
        assert_eq!(render.namespace.as_deref(), Some("from-env"));

        let mut cfg = helm("c");
        cfg.release_name = "explicit".to_string();
        cfg.namespace = "explicit-ns".to_string();
        let render = ChartRender::resolve(&cfg, &named("argo-app"), &ws, vec![]).unwrap();
        assert_eq!(render.release, "explicit");
        assert_eq!(render.namespace.as_deref(), Some("explicit-ns"));
    }

    #[test]
    fn test_release_name_required() {
        let (_repo, _parent, ws) = workspace();
        let defaults = ReleaseDefaults {
            name: Some(String::new()),
            namespace: None,
        };
        let err = ChartRender::resolve(&helm("c"), &defaults, &ws, vec![]).unwrap_err();
        assert!(matches!(err, PipelineError::MissingReleaseName));
    }

    #[test]
    fn test_namespace_may_stay_empty() {
        let (_repo, _parent, ws) = workspace();
        let defaults = ReleaseDefaults {
            name: Some("web".to_string()),
            namespace: None,
        };
        let render = ChartRender::resolve(&helm("c"), &defaults, &ws, vec![]).unwrap();
        assert!(!render.args().contains(&"--namespace".to_string()));
    }
}
