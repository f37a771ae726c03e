//! Core Quakefile types
//!
//! This module defines the syntax tree produced by parsing a Quakefile.
//! All nodes are plain owned data: built once by the parser (or by a loader
//! merging fragments) and read-only afterwards.

use serde::{Deserialize, Serialize};

/// Root of a parsed Quakefile
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuakeFile {
    /// Top-level tasks in declaration order
    #[serde(default)]
    pub tasks: Vec<Task>,

    /// Namespace blocks in declaration order
    #[serde(default)]
    pub namespaces: Vec<Namespace>,

    /// File-scope variables in declaration order
    #[serde(default)]
    pub variables: Vec<Variable>,

    /// Bare `namespace NAME` directive, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_namespace: Option<String>,
}

impl QuakeFile {
    /// Create an empty file
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a top-level task by exact name (first match wins)
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Find a namespace block by name
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| ns.name == name)
    }

    /// Every invocable task paired with its fully qualified name.
    ///
    /// Top-level tasks come first, followed by namespace tasks in depth-first order.
    pub fn qualified_tasks(&self) -> Vec<(String, &Task)> {
        let mut out: Vec<(String, &Task)> =
            self.tasks.iter().map(|t| (t.name.clone(), t)).collect();
        for ns in &self.namespaces {
            ns.collect_qualified(&ns.name, &mut out);
        }
        out
    }

    /// Look up a task by the name it is invoked with.
    ///
    /// Flat top-level tasks are tried first (this covers compound names such
    /// as `docs:generate` and merged fragment tasks). A `:`-qualified name
    /// whose first segment is this file's own namespace falls back to the
    /// flat task of the remaining name; otherwise the namespace tree is
    /// walked segment by segment.
    pub fn resolve(&self, name: &str) -> Option<ResolvedTask<'_>> {
        if let Some(task) = self.task(name) {
            return Some(ResolvedTask {
                qualified: name.to_string(),
                task,
                scopes: Vec::new(),
            });
        }

        let (path, task_name) = name.rsplit_once(':')?;

        if let Some((head, rest)) = name.split_once(':') {
            if self.file_namespace.as_deref() == Some(head) {
                if let Some(task) = self.task(rest) {
                    return Some(ResolvedTask {
                        qualified: rest.to_string(),
                        task,
                        scopes: Vec::new(),
                    });
                }
            }
        }

        let mut segments = path.split(':');
        let mut ns = self.namespace(segments.next()?)?;
        let mut scopes = vec![ns];
        for segment in segments {
            ns = ns.namespace(segment)?;
            scopes.push(ns);
        }
        let task = ns.task(task_name)?;
        Some(ResolvedTask {
            qualified: name.to_string(),
            task,
            scopes,
        })
    }

    /// Resolve a dependency named inside the task at `from`, trying the
    /// task's own namespace path before the name as written.
    pub fn resolve_from(&self, from: &ResolvedTask<'_>, name: &str) -> Option<ResolvedTask<'_>> {
        let scope = from.scope_path();
        if !scope.is_empty() {
            if let Some(found) = self.resolve(&format!("{}:{}", scope, name)) {
                return Some(found);
            }
        }
        self.resolve(name)
    }

    /// Append another file's declarations after this one's.
    ///
    /// The other file's file-level namespace, if any, becomes a `ns:` prefix on
    /// its top-level tasks so the merged file stays addressable.
    pub fn merge(&mut self, other: QuakeFile) {
        let prefix = other.file_namespace;
        self.tasks.extend(other.tasks.into_iter().map(|mut task| {
            if let Some(ns) = &prefix {
                task.name = format!("{}:{}", ns, task.name);
                task.namespace = Some(ns.clone());
            }
            task
        }));
        self.variables.extend(other.variables);
        self.namespaces.extend(other.namespaces);
    }
}

/// A task found by [`QuakeFile::resolve`]
#[derive(Debug, Clone)]
pub struct ResolvedTask<'a> {
    /// Name the task is known by after resolution
    pub qualified: String,

    pub task: &'a Task,

    /// Enclosing namespace blocks, outermost first
    pub scopes: Vec<&'a Namespace>,
}

impl ResolvedTask<'_> {
    /// Namespace the task was declared in (`db:seed` for `db:seed:users`).
    ///
    /// Empty for top-level tasks, even ones with a compound name such as
    /// `docs:generate`.
    pub fn scope_path(&self) -> &str {
        if self.scopes.is_empty() {
            return self.task.namespace.as_deref().unwrap_or("");
        }
        self.qualified
            .rsplit_once(':')
            .map(|(path, _)| path)
            .unwrap_or("")
    }
}

/// A task declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Task {
    /// Task name, possibly `:`-qualified
    pub name: String,

    /// Comment block immediately preceding the declaration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Positional argument names
    #[serde(default)]
    pub arguments: Vec<String>,

    /// Names of tasks (or file-like targets) to run first
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Commands in body order
    #[serde(default)]
    pub commands: Vec<Command>,

    /// Dispatch metadata for tasks implemented outside the Quakefile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalDispatch>,

    /// File the task was loaded from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,

    /// File-level namespace of the fragment the task was merged from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Task {
    /// Create an empty task with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Task {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether execution is delegated to an external callable
    pub fn is_external(&self) -> bool {
        self.external.is_some()
    }

    /// First non-empty line of the description
    pub fn summary(&self) -> Option<&str> {
        self.description
            .as_deref()?
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
    }
}

/// Opaque metadata for an externally sourced task
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExternalDispatch {
    /// Identifier of the dispatcher that knows how to run the task
    pub dispatcher: String,

    /// Directory the task was discovered in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,
}

/// A namespace block
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Namespace {
    pub name: String,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub variables: Vec<Variable>,

    #[serde(default)]
    pub namespaces: Vec<Namespace>,
}

impl Namespace {
    /// Create an empty namespace
    pub fn new(name: impl Into<String>) -> Self {
        Namespace {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Find a direct child task
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Find a direct child namespace
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| ns.name == name)
    }

    fn collect_qualified<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Task)>) {
        for task in &self.tasks {
            out.push((format!("{}:{}", prefix, task.name), task));
        }
        for nested in &self.namespaces {
            nested.collect_qualified(&format!("{}:{}", prefix, nested.name), out);
        }
    }
}

/// A variable assignment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Variable {
    pub name: String,
    pub value: VariableValue,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: VariableValue) -> Self {
        Variable {
            name: name.into(),
            value,
        }
    }
}

/// The right-hand side of a variable assignment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariableValue {
    /// Double-quoted literal; escapes are kept as written
    Literal { value: String },

    /// Backtick command whose trimmed stdout becomes the value
    CommandSubstitution { command: String },

    /// `{{ }}` expression
    Expression { expression: Expression },

    /// `"""` block, verbatim
    Multiline { value: String },
}

impl VariableValue {
    pub fn literal(value: impl Into<String>) -> Self {
        VariableValue::Literal {
            value: value.into(),
        }
    }

    pub fn command(command: impl Into<String>) -> Self {
        VariableValue::CommandSubstitution {
            command: command.into(),
        }
    }
}

/// One logical command line in a task body
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Command {
    #[serde(default)]
    pub elements: Vec<CommandElement>,

    /// `@` prefix: do not echo before running
    #[serde(default)]
    pub silent: bool,

    /// `-` prefix: a failure is downgraded to a warning
    #[serde(default)]
    pub continue_on_error: bool,
}

/// A piece of a command line
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandElement {
    /// Literal text passed through to the shell
    String { value: String },

    /// `$NAME`
    Variable { name: String },

    /// `` `cmd` ``, left for the shell to evaluate
    Backtick { command: String },

    /// `{{ expr }}`
    Expression { expression: Expression },
}

impl CommandElement {
    pub fn text(value: impl Into<String>) -> Self {
        CommandElement::String {
            value: value.into(),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        CommandElement::Variable { name: name.into() }
    }

    pub fn backtick(command: impl Into<String>) -> Self {
        CommandElement::Backtick {
            command: command.into(),
        }
    }

    pub fn expression(expression: Expression) -> Self {
        CommandElement::Expression { expression }
    }
}

/// The `{{ }}` expression language
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    Identifier {
        name: String,
    },
    /// `object.property`; only `env.NAME` resolves to anything
    AccessId {
        object: Box<Expression>,
        property: String,
    },
    StringLiteral {
        value: String,
    },
    /// Left if non-empty, else right
    Or {
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn ident(name: impl Into<String>) -> Self {
        Expression::Identifier { name: name.into() }
    }

    pub fn access(object: Expression, property: impl Into<String>) -> Self {
        Expression::AccessId {
            object: Box::new(object),
            property: property.into(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::StringLiteral {
            value: value.into(),
        }
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}
