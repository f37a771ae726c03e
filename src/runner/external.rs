//! Tasks implemented outside the Quakefile
//!
//! A [`Task`] carrying [`ExternalDispatch`] metadata has no commands of its
//! own; the evaluator hands it to the [`ExternalTask`] registered under the
//! same name.

use crate::error::{ExecutionError, ExecutionResult};
use crate::quakefile::types::{ExternalDispatch, QuakeFile, Task};
use crate::runner::Context;
use std::collections::HashMap;
use std::process::{Command as StdCommand, Stdio};
use tracing::debug;

/// A callable task supplied from outside the Quakefile
pub trait ExternalTask {
    /// Qualified task name
    fn name(&self) -> &str;

    /// Names of the positional arguments the task accepts
    fn arg_spec(&self) -> &[String];

    /// Run the task with invocation arguments
    fn invoke(&self, args: &[String], ctx: &Context) -> ExecutionResult<()>;
}

/// Registry of external tasks, keyed by name
#[derive(Default)]
pub struct ExternalTasks {
    tasks: HashMap<String, Box<dyn ExternalTask>>,
}

impl ExternalTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process dispatcher for every task in `file` with dispatch metadata
    pub fn from_quakefile(file: &QuakeFile) -> Self {
        let mut registry = Self::new();
        for (name, task) in file.qualified_tasks() {
            let Some(dispatch) = &task.external else {
                continue;
            };
            match ProcessDispatch::from_dispatch(&name, task, dispatch) {
                Some(dispatcher) => registry.register(Box::new(dispatcher)),
                None => debug!(task = %name, "external task has an empty dispatcher"),
            }
        }
        registry
    }

    /// Add or replace a task
    pub fn register(&mut self, task: Box<dyn ExternalTask>) {
        self.tasks.insert(task.name().to_string(), task);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ExternalTask> {
        self.tasks.get(name).map(|task| task.as_ref())
    }
}

/// Runs an external task as `program [prefix args...] NAME [args...]`
#[derive(Debug, Clone)]
pub struct ProcessDispatch {
    name: String,
    program: String,
    prefix_args: Vec<String>,
    arg_spec: Vec<String>,
}

impl ProcessDispatch {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        ProcessDispatch {
            name: name.into(),
            program: program.into(),
            prefix_args: Vec::new(),
            arg_spec: Vec::new(),
        }
    }

    /// Arguments placed between the program and the task name
    pub fn with_prefix_args(mut self, args: Vec<String>) -> Self {
        self.prefix_args = args;
        self
    }

    pub fn with_arg_spec(mut self, arg_spec: Vec<String>) -> Self {
        self.arg_spec = arg_spec;
        self
    }

    /// Build from task metadata.
    ///
    /// The dispatcher string is split on whitespace into program and prefix
    /// arguments; a source directory becomes the last prefix argument, so
    /// `go run` with `./qtasks` runs `go run ./qtasks NAME args...`.
    pub fn from_dispatch(name: &str, task: &Task, dispatch: &ExternalDispatch) -> Option<Self> {
        let mut words = dispatch.dispatcher.split_whitespace().map(String::from);
        let program = words.next()?;
        let mut prefix_args: Vec<String> = words.collect();
        if let Some(dir) = &dispatch.source_dir {
            prefix_args.push(dir.clone());
        }
        Some(
            ProcessDispatch::new(name, program)
                .with_prefix_args(prefix_args)
                .with_arg_spec(task.arguments.clone()),
        )
    }
}

impl ExternalTask for ProcessDispatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn arg_spec(&self) -> &[String] {
        &self.arg_spec
    }

    fn invoke(&self, args: &[String], ctx: &Context) -> ExecutionResult<()> {
        // only the last segment of a qualified name is passed to the dispatcher
        let task_name = self.name.rsplit(':').next().unwrap_or(&self.name);

        let mut command = StdCommand::new(&self.program);
        command.args(&self.prefix_args);
        command.arg(task_name);
        command.args(args);
        command.current_dir(&ctx.working_dir);
        command.envs(&ctx.vars);
        command.stdin(Stdio::inherit());
        command.stdout(Stdio::inherit());
        command.stderr(Stdio::inherit());

        debug!(task = %self.name, program = %self.program, "dispatching external task");

        let status = command.status().map_err(|e| ExecutionError::External {
            name: self.name.clone(),
            message: format!("failed to start '{}': {}", self.program, e),
        })?;

        if !status.success() {
            return Err(ExecutionError::External {
                name: self.name.clone(),
                message: match status.code() {
                    Some(code) => format!("exited with code {}", code),
                    None => "terminated by signal".to_string(),
                },
            });
        }
        Ok(())
    }
}
