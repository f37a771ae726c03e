//! Quake - a task runner driven by Quakefiles
//!
//! A Quakefile declares named tasks with their shell commands, dependencies,
//! arguments, variables and namespaces. This crate parses Quakefiles into a
//! syntax tree and evaluates tasks through the host shell.

// Public modules
pub mod cli;
pub mod error;
pub mod quakefile;
pub mod runner;
pub mod ui;

// Re-export commonly used types
pub use error::{QuakeError, Result};
pub use quakefile::{parse_quakefile, QuakeFile};
pub use runner::{Context, Evaluator, Verbosity};

/// Current version of Quake
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
