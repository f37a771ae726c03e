//! Execution context for task running
//!
//! The context tracks all the state needed during task execution.

use crate::ui;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Execution context that tracks state during task execution
pub struct Context {
    /// Directory every command runs in
    pub working_dir: PathBuf,

    /// Evaluated variables and bound arguments, exported to child processes
    pub vars: HashMap<String, String>,

    /// Command interpreter (e.g., ["bash", "-c"])
    pub interpreter: Vec<String>,

    /// Stack of tasks being executed (for detecting recursion)
    pub task_stack: Vec<String>,

    /// Verbosity level
    pub verbosity: Verbosity,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

/// A variable's value before a scoped binding replaced it
#[derive(Debug)]
pub struct SavedVar {
    name: String,
    previous: Option<String>,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            vars: HashMap::new(),
            interpreter: vec!["sh".to_string(), "-c".to_string()],
            task_stack: Vec::new(),
            verbosity: Verbosity::Normal,
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the Quakefile path; commands run in its directory
    pub fn with_quakefile_path(mut self, path: PathBuf) -> Self {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            self.working_dir = dir.to_path_buf();
        }
        self
    }

    /// Set a single variable
    pub fn set_var(&mut self, key: String, value: String) {
        self.vars.insert(key, value);
    }

    /// Resolve a name against context variables, then the host environment
    pub fn lookup(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .cloned()
            .or_else(|| env::var(name).ok())
    }

    /// Bind a variable for the duration of a scope; hand the result back to
    /// [`Context::restore_vars`] when the scope ends
    pub fn bind_var(&mut self, name: impl Into<String>, value: impl Into<String>) -> SavedVar {
        let name = name.into();
        let previous = self.vars.insert(name.clone(), value.into());
        SavedVar { name, previous }
    }

    /// Undo scoped bindings, most recent first
    pub fn restore_vars(&mut self, saved: Vec<SavedVar>) {
        for SavedVar { name, previous } in saved.into_iter().rev() {
            match previous {
                Some(value) => {
                    self.vars.insert(name, value);
                }
                None => {
                    self.vars.remove(&name);
                }
            }
        }
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Push a task onto the execution stack
    pub fn push_task(&mut self, task_name: String) {
        self.task_stack.push(task_name);
    }

    /// Pop a task from the execution stack
    pub fn pop_task(&mut self) -> Option<String> {
        self.task_stack.pop()
    }

    /// Check if a task is in the execution stack (detect recursion)
    pub fn is_task_in_stack(&self, task_name: &str) -> bool {
        self.task_stack.iter().any(|t| t == task_name)
    }

    /// The call chain from the outermost task to `next`, e.g. `a -> b -> a`
    pub fn call_chain(&self, next: &str) -> String {
        let mut chain = self.task_stack.clone();
        chain.push(next.to_string());
        chain.join(" -> ")
    }

    /// Print a line of task output (headers, command echo)
    pub fn print_info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            println!("{}", message);
        }
    }

    /// Print a warning
    pub fn print_warning(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{}", ui::warning(message));
        }
    }

    /// Print debug message (only in verbose mode)
    pub fn print_debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("[DEBUG] {}", message);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
