//! Declarative render job description (`app.yaml`)
//!
//! ```yaml
//! helm:
//!   chart: ./chart
//!   releaseName: myapp
//!   values: [/env/prod/values.tmpl.yaml]
//!   output: ./base/helm.yaml
//! kustomize:
//!   path: ./overlays/prod
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoreError, Result};

/// One render job: an optional chart stage and a mandatory overlay stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kustomize: Option<KustomizeConfig>,
}

/// Chart-render section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HelmConfig {
    /// Chart path, or chart name when `repo` is set
    pub chart: String,

    /// Remote chart repository URL
    pub repo: String,

    /// Chart version (only meaningful with `repo`)
    pub version: String,

    pub release_name: String,

    pub namespace: String,

    /// Value files, expanded as templates before the chart is rendered
    pub values: Vec<String>,

    /// Where the rendered chart is written
    pub output: String,
}

impl HelmConfig {
    /// Whether `chart` names a chart in a remote repository rather than a local path
    pub fn is_remote(&self) -> bool {
        !self.repo.is_empty()
    }
}

/// Overlay-build section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KustomizeConfig {
    pub path: String,
}

impl Config {
    /// Read, parse and validate a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config =
            serde_yaml::from_str(&content).map_err(|source| CoreError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(yaml).map_err(|source| CoreError::ConfigParse {
                path: "<inline>".into(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let kustomize = self
            .kustomize
            .as_ref()
            .ok_or_else(|| CoreError::invalid_config("kustomize", "section is required"))?;

        if kustomize.path.is_empty() {
            return Err(CoreError::invalid_config("kustomize.path", "is required"));
        }

        if let Some(helm) = &self.helm {
            if helm.chart.is_empty() {
                return Err(CoreError::invalid_config(
                    "helm.chart",
                    "is required when helm is specified",
                ));
            }
            if helm.output.is_empty() {
                return Err(CoreError::invalid_config(
                    "helm.output",
                    "is required when helm is specified",
                ));
            }
        }

        Ok(())
    }

    /// The overlay directory; only call on a validated config
    pub fn overlay_path(&self) -> &str {
        self.kustomize.as_ref().map(|k| k.path.as_str()).unwrap_or_default()
    }
}
