//! Overlay building through `kustomize build`

use std::path::{Path, PathBuf};

use crate::tools::Invocation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayBuild {
    pub dir: PathBuf,
}

impl OverlayBuild {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn args(&self) -> Vec<String> {
        vec!["build".to_string(), self.dir.to_string_lossy().into_owned()]
    }

    pub fn invocation(&self, program: &str, cwd: &Path) -> Invocation {
        Invocation::new(program, self.args(), cwd)
    }
}
