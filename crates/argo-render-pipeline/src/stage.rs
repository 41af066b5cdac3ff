//! Pipeline progress markers

use std::fmt;

/// Where a job currently is; stages only ever move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Init,
    WorkspacePrepared,
    DatasourcesRegistered,
    ValuesTemplated,
    ChartRendered,
    OverlayPreprocessed,
    OverlayBuilt,
    PostRendered,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::WorkspacePrepared => "workspace-prepared",
            Self::DatasourcesRegistered => "datasources-registered",
            Self::ValuesTemplated => "values-templated",
            Self::ChartRendered => "chart-rendered",
            Self::OverlayPreprocessed => "overlay-preprocessed",
            Self::OverlayBuilt => "overlay-built",
            Self::PostRendered => "post-rendered",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current stage of a running job
#[derive(Debug)]
pub(crate) struct Progress {
    stage: Stage,
}

impl Progress {
    pub(crate) fn new() -> Self {
        Self { stage: Stage::Init }
    }

    pub(crate) fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "stage {next} cannot follow {}", self.stage);
        tracing::debug!(from = %self.stage, to = %next, "stage");
        self.stage = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert!(Stage::Init < Stage::WorkspacePrepared);
        assert!(Stage::ChartRendered < Stage::OverlayPreprocessed);
        assert!(Stage::PostRendered < Stage::Done);
    }

    #[test]
    fn test_progress_skips_optional_stages() {
        let mut progress = Progress::new();
        progress.advance(Stage::WorkspacePrepared);
        progress.advance(Stage::DatasourcesRegistered);
        progress.advance(Stage::OverlayPreprocessed);
        progress.advance(Stage::OverlayBuilt);
        progress.advance(Stage::Done);
        assert_eq!(progress.stage(), Stage::Done);
        assert_eq!(progress.stage().to_string(), "done");
    }
}
