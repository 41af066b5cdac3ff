//! Integration tests driving the argo-render binary
//!
//! `helm` and `kustomize` are replaced by small shell scripts.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Prints every yaml file of the overlay directory (`$2`) in name order
const FAKE_KUSTOMIZE: &str = "#!/bin/sh\nfor f in \"$2\"/*.yaml; do cat \"$f\"; done\n";

/// Prints the release name and the content of the last values file
const FAKE_HELM: &str = "#!/bin/sh\nprintf '# release %s\\n' \"$2\"\nfor last; do :; done\ncat \"$last\"\n";

struct Fixture {
    repo: TempDir,
    tools: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let repo = TempDir::new().unwrap();
        std::fs::create_dir_all(repo.path().join(".git")).unwrap();
        let fixture = Self {
            repo,
            tools: TempDir::new().unwrap(),
        };
        fixture.write("env/prod.yaml", "image: nginx\nreplicas: 2\n");
        fixture.write("apps/web/overlay/kustomization.yaml", "resources: []\n");
        fixture.tool("kustomize", FAKE_KUSTOMIZE);
        fixture.tool("helm", FAKE_HELM);
        fixture
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.repo.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn tool(&self, name: &str, script: &str) {
        let path = self.tools.path().join(name);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn tool_path(&self, name: &str) -> PathBuf {
        self.tools.path().join(name)
    }

    fn app_file(&self) -> PathBuf {
        self.repo.path().join("apps/web/app.yaml")
    }

    /// Run the binary against `apps/web/app.yaml`
    fn run(&self, extra: &[&str], env: &[(&str, &str)]) -> Output {
        argo_render(
            &self.app_file(),
            &self.tool_path("helm"),
            &self.tool_path("kustomize"),
            extra,
            env,
        )
    }
}

fn argo_render(
    config: &Path,
    helm: &Path,
    kustomize: &Path,
    extra: &[&str],
    env: &[(&str, &str)],
) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_argo-render"));
    cmd.arg("--config")
        .arg(config)
        .arg("--helm-bin")
        .arg(helm)
        .arg("--kustomize-bin")
        .arg(kustomize)
        .args(extra)
        .env_remove("ARGOCD_APP_NAME")
        .env_remove("ARGOCD_APP_NAMESPACE")
        .env_remove("RUST_LOG");
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.output().expect("Failed to execute argo-render")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Diagnostics may be wrapped and framed; compare without layout
fn stderr_flat(output: &Output) -> String {
    stderr(output)
        .chars()
        .filter(|c| !c.is_whitespace() && !"│×╰╭├─┬┴".contains(*c))
        .collect()
}

mod validation {
    use super::*;

    #[test]
    fn test_missing_kustomize_path() {
        let fx = Fixture::new();
        fx.write("apps/web/app.yaml", "kustomize: {}\n");

        let output = fx.run(&[], &[]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stdout(&output).is_empty());
        assert!(stderr_flat(&output).contains("kustomize.path"));
    }

    #[test]
    fn test_helm_without_output() {
        let fx = Fixture::new();
        fx.write("apps/web/app.yaml", "helm:\n  chart: ./chart\nkustomize:\n  path: overlay\n");

        let output = fx.run(&[], &[]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr_flat(&output).contains("helm.output"));
    }

    #[test]
    fn test_missing_config_file() {
        let fx = Fixture::new();

        let output = fx.run(&[], &[]);

        assert_eq!(output.status.code(), Some(5));
        assert!(stdout(&output).is_empty());
    }
}

mod render {
    use super::*;

    #[test]
    fn test_kustomize_only() {
        let fx = Fixture::new();
        fx.write("apps/web/app.yaml", "kustomize:\n  path: overlay\n");
        fx.write(
            "apps/web/overlay/deploy.tmpl.yaml",
            "image: @<< datasource(\"file\", \"/env/prod.yaml\").image >>@\n",
        );

        let output = fx.run(&[], &[]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(stdout(&output), "image: nginx\nresources: []\n");
    }

    #[test]
    fn test_source_files_are_not_modified() {
        let fx = Fixture::new();
        fx.write("apps/web/app.yaml", "kustomize:\n  path: overlay\n");
        let template = "replicas: @<< datasource(\"file\", \"../../env/prod.yaml\").replicas >>@\n";
        fx.write("apps/web/overlay/deploy.tmpl.yaml", template);

        let output = fx.run(&[], &[]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).starts_with("replicas: 2\n"));
        let source =
            std::fs::read_to_string(fx.repo.path().join("apps/web/overlay/deploy.tmpl.yaml"))
                .unwrap();
        assert_eq!(source, template);
    }

    #[test]
    fn test_helm_then_kustomize() {
        let fx = Fixture::new();
        fx.write(
            "apps/web/app.yaml",
            "helm:\n  chart: ./chart\n  values: [values.tmpl.yaml]\n  output: overlay/helm.yaml\nkustomize:\n  path: overlay\n",
        );
        fx.write(
            "apps/web/values.tmpl.yaml",
            "replicaCount: @<< datasource(\"file\", \"/env/prod.yaml\").replicas >>@\n",
        );

        let output = fx.run(&[], &[("ARGOCD_APP_NAME", "web")]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(
            stdout(&output),
            "# release web\nreplicaCount: 2\nresources: []\n"
        );
    }

    #[test]
    fn test_release_name_required() {
        let fx = Fixture::new();
        fx.write(
            "apps/web/app.yaml",
            "helm:\n  chart: ./chart\n  output: overlay/helm.yaml\nkustomize:\n  path: overlay\n",
        );

        let output = fx.run(&[], &[("ARGOCD_APP_NAME", "")]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr_flat(&output).contains("releasenameisrequired"));
    }

    #[test]
    fn test_post_render() {
        let fx = Fixture::new();
        fx.write("apps/web/app.yaml", "kustomize:\n  path: overlay\n");
        // Not a .tmpl file: only the post-render pass expands it
        fx.write(
            "apps/web/overlay/plain.yaml",
            "image: @<< datasource(\"file\", \"/env/prod.yaml\").image >>@\n",
        );

        let output = fx.run(&[], &[]);
        assert!(stdout(&output).contains("@<<"));

        let output = fx.run(&["--enable-post-render"], &[]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(stdout(&output), "resources: []\nimage: nginx\n");
    }

    #[test]
    fn test_unknown_datasource() {
        let fx = Fixture::new();
        fx.write("apps/web/app.yaml", "kustomize:\n  path: overlay\n");
        fx.write(
            "apps/web/overlay/deploy.tmpl.yaml",
            "cluster: @<< datasource(\"terraform\", \"tf/prod.tfstate\").name >>@\n",
        );

        let output = fx.run(&[], &[]);

        assert_eq!(output.status.code(), Some(4));
        assert!(stdout(&output).is_empty());
        assert!(stderr_flat(&output).contains("datasourcenotfound:terraform"));
    }

    #[test]
    fn test_failing_tool() {
        let fx = Fixture::new();
        fx.write("apps/web/app.yaml", "kustomize:\n  path: overlay\n");
        fx.tool("kustomize", "#!/bin/sh\necho 'accumulating resources failed' >&2\nexit 1\n");

        let output = fx.run(&[], &[]);

        assert_eq!(output.status.code(), Some(6));
        assert!(stdout(&output).is_empty());
        assert!(stderr_flat(&output).contains("accumulatingresourcesfailed"));
    }
}
