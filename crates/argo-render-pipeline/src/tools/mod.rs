//! External build tools
//!
//! Both tools are opaque text producers: arguments in, manifests on stdout,
//! diagnostics on stderr (passed straight through to ours).

pub mod helm;
pub mod kustomize;

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{PipelineError, Result};

/// A fully resolved tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child process
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.into(),
        }
    }

    /// `program arg1 arg2 ...`, for logs and errors
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs an invocation to completion and returns its standard output
pub trait ToolRunner {
    fn run(&self, invocation: &Invocation) -> Result<String>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, invocation: &Invocation) -> Result<String> {
        (**self).run(invocation)
    }
}

/// Spawns real child processes and blocks until they exit
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<String> {
        let command = invocation.command_line();
        tracing::debug!(%command, cwd = %invocation.cwd.display(), "running");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| PipelineError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PipelineError::ToolFailed {
                command,
                status: output.status,
            });
        }

        String::from_utf8(output.stdout).map_err(|_| PipelineError::ToolOutput { command })
    }
}
