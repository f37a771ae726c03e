//! Error types for Quake

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Quake operations
pub type Result<T> = std::result::Result<T, QuakeError>;

/// Main error type for Quake
#[derive(Error, Debug)]
pub enum QuakeError {
    /// Quakefile syntax errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Loading and validation errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// AST dump failures
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Malformed Quakefile source.
///
/// Positions are 1-based and count characters, not bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unterminated {quote} quote starting at line {line}, column {column}")]
    UnterminatedQuote {
        quote: char,
        line: usize,
        column: usize,
    },

    #[error("unterminated {what} opened at line {line}, column {column}: missing '}}'")]
    UnterminatedBlock {
        what: &'static str,
        line: usize,
        column: usize,
    },

    #[error("unterminated multi-line string starting at line {line}, column {column}")]
    UnterminatedMultiline { line: usize, column: usize },

    #[error("unterminated command substitution starting at line {line}, column {column}")]
    UnterminatedSubstitution { line: usize, column: usize },

    #[error("unterminated expression starting at line {line}, column {column}: missing '}}}}'")]
    UnterminatedExpression { line: usize, column: usize },

    #[error("invalid expression '{source_text}' at line {line}, column {column}: {reason}")]
    InvalidExpression {
        source_text: String,
        reason: String,
        line: usize,
        column: usize,
    },

    #[error("expected {expected} at line {line}, column {column}")]
    Expected {
        expected: String,
        line: usize,
        column: usize,
    },

    #[error("unexpected input '{found}' at line {line}, column {column}")]
    UnexpectedInput {
        found: String,
        line: usize,
        column: usize,
    },

    #[error("file namespace declared twice ('{first}' and '{second}') at line {line}")]
    DuplicateFileNamespace {
        first: String,
        second: String,
        line: usize,
    },

    #[error("file namespace '{name}' cannot be combined with namespace blocks (line {line})")]
    MixedNamespaceForms { name: String, line: usize },
}

impl ParseError {
    /// Line the error points at.
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnterminatedQuote { line, .. }
            | ParseError::UnterminatedBlock { line, .. }
            | ParseError::UnterminatedMultiline { line, .. }
            | ParseError::UnterminatedSubstitution { line, .. }
            | ParseError::UnterminatedExpression { line, .. }
            | ParseError::InvalidExpression { line, .. }
            | ParseError::Expected { line, .. }
            | ParseError::UnexpectedInput { line, .. }
            | ParseError::DuplicateFileNamespace { line, .. }
            | ParseError::MixedNamespaceForms { line, .. } => *line,
        }
    }
}

/// Quakefile discovery, loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No Quakefile found (searched: {0})")]
    NotFound(String),

    #[error("Failed to read '{path}': {error}")]
    Read { path: PathBuf, error: io::Error },

    #[error("Failed to parse '{path}': {error}")]
    Parse { path: PathBuf, error: ParseError },

    #[error("Task '{0}' is defined more than once")]
    DuplicateTask(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("task '{0}' not found")]
    TaskNotFound(String),

    #[error("dependency '{dependency}' of task '{task}' failed: {source}")]
    DependencyFailed {
        task: String,
        dependency: String,
        #[source]
        source: Box<ExecutionError>,
    },

    #[error("command failed ({}): {command}", exit_status(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("external task '{0}' has no registered dispatcher")]
    ExternalUnavailable(String),

    #[error("external task '{name}' failed: {message}")]
    External { name: String, message: String },
}

impl ExecutionError {
    /// The innermost error beneath any dependency-chain wrapping.
    pub fn root_cause(&self) -> &ExecutionError {
        match self {
            ExecutionError::DependencyFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether the chain bottoms out in an unknown task.
    pub fn is_task_not_found(&self) -> bool {
        matches!(self.root_cause(), ExecutionError::TaskNotFound(_))
    }
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

/// Specialized result type for parsing
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Specialized result type for loading and validation
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
