//! Process exit codes
//!
//! Argument errors are reported by clap itself with its usual code 2.

/// Manifests were written to stdout
pub const SUCCESS: u8 = 0;

/// Unclassified failure
pub const ERROR: u8 = 1;

/// Invalid `app.yaml`, missing release name, no enclosing git checkout
pub const CONFIG_ERROR: u8 = 2;

/// Template syntax or evaluation failed
pub const TEMPLATE_ERROR: u8 = 3;

/// A datasource could not be resolved (unknown name, unreadable file, remote state)
pub const DATASOURCE_ERROR: u8 = 4;

/// File not found, permission denied, etc.
pub const IO_ERROR: u8 = 5;

/// helm or kustomize could not be started or exited non-zero
pub const TOOL_ERROR: u8 = 6;
