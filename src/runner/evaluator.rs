//! Task evaluation
//!
//! The [`Evaluator`] owns a parsed Quakefile and an execution [`Context`].
//! Running a task resolves it, binds its arguments, runs its dependencies,
//! then renders and executes its commands one at a time.

use crate::error::{ExecutionError, ExecutionResult};
use crate::quakefile::lexer::unescape;
use crate::quakefile::types::{Command, QuakeFile, ResolvedTask, VariableValue};
use crate::runner::command::{capture_shell, execute_shell};
use crate::runner::echo::native_echo;
use crate::runner::external::{ExternalTask, ExternalTasks};
use crate::runner::interpolate::expand_variables;
use crate::runner::render::{eval_expression, render_command};
use crate::runner::Context;
use crate::ui;
use tracing::{debug, warn};

/// Name run when no task is requested
pub const DEFAULT_TASK: &str = "default";

/// Runs tasks from one Quakefile
pub struct Evaluator {
    file: QuakeFile,
    ctx: Context,
    external: ExternalTasks,
}

impl Evaluator {
    /// Create an evaluator with a default context
    pub fn new(file: QuakeFile) -> Self {
        Self::with_context(file, Context::new())
    }

    /// Create an evaluator over `file`, evaluating its file-scope variables
    /// into `ctx` in declaration order
    pub fn with_context(file: QuakeFile, mut ctx: Context) -> Self {
        for variable in &file.variables {
            let value = evaluate_variable(&variable.value, &ctx);
            debug!(name = %variable.name, "variable initialised");
            ctx.set_var(variable.name.clone(), value);
        }

        let external = ExternalTasks::from_quakefile(&file);
        Evaluator {
            file,
            ctx,
            external,
        }
    }

    /// Register (or replace) the callable behind an external task
    pub fn register_external(&mut self, task: Box<dyn ExternalTask>) {
        self.external.register(task);
    }

    pub fn quakefile(&self) -> &QuakeFile {
        &self.file
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Run a task without arguments
    pub fn run_task(&mut self, name: &str) -> ExecutionResult<()> {
        self.run_task_with_args(name, &[])
    }

    /// Run a task and its dependencies.
    ///
    /// An empty name runs `default`. Missing arguments bind to the empty
    /// string and extra arguments are ignored.
    pub fn run_task_with_args(&mut self, name: &str, args: &[String]) -> ExecutionResult<()> {
        let name = if name.is_empty() { DEFAULT_TASK } else { name };
        let (file, external, ctx) = (&self.file, &self.external, &mut self.ctx);

        let resolved = file
            .resolve(name)
            .ok_or_else(|| ExecutionError::TaskNotFound(name.to_string()))?;

        Invocation { file, external }.invoke(ctx, resolved, args)
    }
}

/// Borrowed pieces of an [`Evaluator`] needed while its context is mutated
struct Invocation<'a> {
    file: &'a QuakeFile,
    external: &'a ExternalTasks,
}

impl<'a> Invocation<'a> {
    fn invoke(
        &self,
        ctx: &mut Context,
        resolved: ResolvedTask<'a>,
        args: &[String],
    ) -> ExecutionResult<()> {
        let name = resolved.qualified.clone();
        if ctx.is_task_in_stack(&name) {
            return Err(ExecutionError::CircularDependency(ctx.call_chain(&name)));
        }

        debug!(task = %name, args = ?args, "invoking");
        ctx.print_debug(&format!("Running task: {}", name));

        // namespace variables (outermost first), then arguments, all restored on return
        let mut saved = Vec::new();
        for ns in &resolved.scopes {
            for variable in &ns.variables {
                let value = evaluate_variable(&variable.value, ctx);
                saved.push(ctx.bind_var(variable.name.clone(), value));
            }
        }
        for (i, arg) in resolved.task.arguments.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or_default();
            saved.push(ctx.bind_var(arg.clone(), value));
        }

        ctx.push_task(name);
        let result = self.run(ctx, &resolved, args);
        ctx.pop_task();
        ctx.restore_vars(saved);

        result
    }

    fn run(
        &self,
        ctx: &mut Context,
        resolved: &ResolvedTask<'a>,
        args: &[String],
    ) -> ExecutionResult<()> {
        let task = resolved.task;

        for dep in &task.dependencies {
            let wrap = |source: ExecutionError| ExecutionError::DependencyFailed {
                task: resolved.qualified.clone(),
                dependency: dep.clone(),
                source: Box::new(source),
            };
            let Some(target) = self.file.resolve_from(resolved, dep) else {
                return Err(wrap(ExecutionError::TaskNotFound(dep.clone())));
            };
            self.invoke(ctx, target, &[]).map_err(wrap)?;
        }

        ctx.print_info(&ui::task_header(&resolved.qualified, args));

        if task.is_external() {
            let Some(external) = self.external.get(&resolved.qualified) else {
                return Err(ExecutionError::ExternalUnavailable(resolved.qualified.clone()));
            };
            return external.invoke(args, ctx);
        }

        let last = task.commands.len().saturating_sub(1);
        for (i, command) in task.commands.iter().enumerate() {
            match run_command(command, ctx, i == last) {
                Ok(()) => {}
                Err(e) if command.continue_on_error => {
                    debug!(task = %resolved.qualified, error = %e, "continuing after failure");
                    ctx.print_warning(&format!("command failed but continuing: {}", e));
                }
                Err(e) => return Err(e),
            }
        }

        ctx.print_debug(&format!("Task completed: {}", resolved.qualified));
        Ok(())
    }
}

fn run_command(command: &Command, ctx: &Context, last: bool) -> ExecutionResult<()> {
    if let Some(text) = native_echo(command, ctx) {
        println!("{}", ui::echo_line(&text));
        return Ok(());
    }

    let rendered = render_command(&command.elements, ctx);
    if !command.silent {
        ctx.print_info(&ui::command_line(&rendered, last));
    }
    execute_shell(&rendered, ctx)
}

/// Compute a variable's value against everything defined so far.
///
/// Quoted and multi-line values are unescaped and have `$NAME` expanded;
/// a failing command substitution yields the empty string.
pub fn evaluate_variable(value: &VariableValue, ctx: &Context) -> String {
    match value {
        VariableValue::Literal { value } => {
            expand_variables(&unescape(value), |name| ctx.lookup(name))
        }
        VariableValue::Multiline { value } => expand_variables(value, |name| ctx.lookup(name)),
        VariableValue::Expression { expression } => eval_expression(expression, ctx),
        VariableValue::CommandSubstitution { command } => match capture_shell(command, ctx) {
            Ok(output) => output,
            Err(e) => {
                warn!(command = %command, error = %e, "command substitution failed");
                String::new()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quakefile::grammar::parse_quakefile;
    use crate::runner::Verbosity;
    use std::fs;
    use tempfile::TempDir;

    fn evaluator(src: &str, dir: &TempDir) -> Evaluator {
        let file = parse_quakefile(src).unwrap();
        let ctx = Context::new()
            .with_working_dir(dir.path().to_path_buf())
            .with_verbosity(Verbosity::Silent);
        Evaluator::with_context(file, ctx)
    }

    fn log(dir: &TempDir) -> String {
        fs::read_to_string(dir.path().join("log")).unwrap_or_default()
    }

    #[test]
    fn test_variables_are_sequential() {
        let dir = TempDir::new().unwrap();
        let ev = evaluator(
            concat!(
                "A = \"one\"\n",
                "B = \"$A and ${A}\"\n",
                "C = \"$LATER\"\n",
                "LATER = \"x\"\n",
                "D = `echo $A-sub`\n",
                "E = {{ missing_quake_var || B }}\n",
                "F = \"tab\\there \\\"q\\\"\"\n",
                "G = \"\"\"\n  keep $A\n\"\"\"\n",
                "H = `exit 1`\n",
            ),
            &dir,
        );
        let vars = &ev.context().vars;
        assert_eq!(vars["A"], "one");
        assert_eq!(vars["B"], "one and one");
        assert_eq!(vars["C"], "");
        assert_eq!(vars["D"], "one-sub");
        assert_eq!(vars["E"], "one and one");
        assert_eq!(vars["F"], "tab\there \"q\"");
        assert_eq!(vars["G"], "  keep one\n");
        assert_eq!(vars["H"], "");
    }

    #[test]
    fn test_dependencies_run_first() {
        let dir = TempDir::new().unwrap();
        let mut ev = evaluator(
            "task a { echo a >> log }\ntask b => a { echo b >> log }\n",
            &dir,
        );
        ev.run_task("b").unwrap();
        assert_eq!(log(&dir), "a\nb\n");

        // no memoization across invocations
        ev.run_task("b").unwrap();
        assert_eq!(log(&dir), "a\nb\na\nb\n");
    }

    #[test]
    fn test_missing_argument_binds_empty() {
        let dir = TempDir::new().unwrap();
        let mut ev = evaluator(
            "task f(x, y) { echo \"[$x] [{{y || \"dflt\"}}]\" >> log }\n",
            &dir,
        );
        ev.run_task("f").unwrap();
        ev.run_task_with_args("f", &["1".to_string(), "2".to_string(), "extra".to_string()])
            .unwrap();
        assert_eq!(log(&dir), "[] [dflt]\n[1] [2]\n");
    }

    #[test]
    fn test_arguments_are_restored() {
        let dir = TempDir::new().unwrap();
        let mut ev = evaluator("X = \"global\"\ntask f(X) { true }\n", &dir);
        ev.run_task_with_args("f", &["local".to_string()]).unwrap();
        assert_eq!(ev.context().vars["X"], "global");
        ev.run_task("f").unwrap();
        assert_eq!(ev.context().vars["X"], "global");
        assert!(ev.context().task_stack.is_empty());
    }

    #[test]
    fn test_continue_on_error() {
        let dir = TempDir::new().unwrap();
        let mut ev = evaluator(
            "task soft {\n    -false\n    echo after >> log\n}\ntask hard {\n    false\n    echo never >> log\n}\n",
            &dir,
        );
        ev.run_task("soft").unwrap();
        assert!(matches!(
            ev.run_task("hard"),
            Err(ExecutionError::CommandFailed { code: Some(1), .. })
        ));
        assert_eq!(log(&dir), "after\n");
    }

    #[test]
    fn test_failing_dependency_aborts_chain() {
        let dir = TempDir::new().unwrap();
        let mut ev = evaluator(
            "task bad { false }\ntask top => bad { echo top >> log }\n",
            &dir,
        );
        match ev.run_task("top") {
            Err(ExecutionError::DependencyFailed { task, dependency, source }) => {
                assert_eq!(task, "top");
                assert_eq!(dependency, "bad");
                assert!(matches!(*source, ExecutionError::CommandFailed { .. }));
            }
            other => panic!("expected dependency failure, got {:?}", other),
        }
        assert_eq!(log(&dir), "");
    }

    #[test]
    fn test_task_not_found() {
        let dir = TempDir::new().unwrap();
        let mut ev = evaluator("task top => ghost { true }\n", &dir);
        assert!(matches!(
            ev.run_task("nope"),
            Err(ExecutionError::TaskNotFound(name)) if name == "nope"
        ));
        let err = ev.run_task("top").unwrap_err();
        assert!(err.is_task_not_found());
        assert!(matches!(err, ExecutionError::DependencyFailed { .. }));
    }

    #[test]
    fn test_default_task() {
        let dir = TempDir::new().unwrap();
        let mut ev = evaluator("task default { echo default >> log }\n", &dir);
        ev.run_task("").unwrap();
        assert_eq!(log(&dir), "default\n");
    }

    #[test]
    fn test_namespace_lookup_and_variables() {
        let dir = TempDir::new().unwrap();
        let mut ev = evaluator(
            concat!(
                "HOST = \"global\"\n",
                "task setup { echo root-setup >> log }\n",
                "namespace db {\n",
                "    HOST = \"db-host\"\n",
                "    task setup { echo db-setup >> log }\n",
                "    task migrate => setup { echo \"migrate $HOST\" >> log }\n",
                "    namespace seed {\n",
                "        task users => setup db:migrate { echo \"users $HOST\" >> log }\n",
                "    }\n",
                "}\n",
            ),
            &dir,
        );
        ev.run_task("db:migrate").unwrap();
        assert_eq!(ev.context().vars["HOST"], "global");
        ev.run_task("db:seed:users").unwrap();
        assert_eq!(
            log(&dir),
            "db-setup\nmigrate db-host\nroot-setup\ndb-setup\nmigrate db-host\nusers db-host\n"
        );
    }

    #[test]
    fn test_runtime_cycle_detection() {
        let dir = TempDir::new().unwrap();
        let mut ev = evaluator("task a => b { true }\ntask b => a { true }\n", &dir);
        let err = ev.run_task("a").unwrap_err();
        match err.root_cause() {
            ExecutionError::CircularDependency(chain) => assert_eq!(chain, "a -> b -> a"),
            other => panic!("expected cycle, got {:?}", other),
        }
        assert!(ev.context().task_stack.is_empty());
    }

    #[test]
    fn test_variables_reach_child_environment() {
        let dir = TempDir::new().unwrap();
        let mut ev = evaluator(
            "GREETING = \"hi there\"\ntask t(who) {\n    printenv GREETING >> log\n    printenv who >> log\n}\n",
            &dir,
        );
        ev.run_task_with_args("t", &["bob".to_string()]).unwrap();
        assert_eq!(log(&dir), "hi there\nbob\n");
    }

    #[test]
    fn test_external_task_dispatch() {
        use crate::quakefile::types::{ExternalDispatch, Task};

        let dir = TempDir::new().unwrap();
        let mut file = parse_quakefile("task prep { echo prep >> log }\n").unwrap();
        let mut ext = Task::new("gen");
        ext.dependencies = vec!["prep".to_string()];
        ext.external = Some(ExternalDispatch {
            dispatcher: "sh ./dispatch.sh".to_string(),
            source_dir: None,
        });
        file.tasks.push(ext);
        let mut missing = Task::new("unregistered");
        missing.external = Some(ExternalDispatch::default());
        file.tasks.push(missing);

        fs::write(dir.path().join("dispatch.sh"), "echo \"ext $1 $2\" >> log\n").unwrap();
        let ctx = Context::new()
            .with_working_dir(dir.path().to_path_buf())
            .with_verbosity(Verbosity::Silent);
        let mut ev = Evaluator::with_context(file, ctx);

        ev.run_task_with_args("gen", &["a".to_string()]).unwrap();
        assert_eq!(log(&dir), "prep\next gen a\n");

        assert!(matches!(
            ev.run_task("unregistered"),
            Err(ExecutionError::ExternalUnavailable(name)) if name == "unregistered"
        ));
    }

    #[test]
    fn test_compound_name_dependency_resolves_top_level_first() {
        let dir = TempDir::new().unwrap();
        let mut ev = evaluator(
            "task build { echo root >> log }\n\
             task docs:build { echo docs >> log }\n\
             task docs:generate => build { echo generate >> log }\n",
            &dir,
        );
        ev.run_task("docs:generate").unwrap();
        assert_eq!(log(&dir), "root\ngenerate\n");
    }

    struct Recorder {
        arg_spec: Vec<String>,
        calls: std::rc::Rc<std::cell::RefCell<Vec<(Vec<String>, String)>>>,
    }

    impl ExternalTask for Recorder {
        fn name(&self) -> &str {
            "codegen"
        }

        fn arg_spec(&self) -> &[String] {
            &self.arg_spec
        }

        fn invoke(&self, args: &[String], ctx: &Context) -> ExecutionResult<()> {
            let seen = fs::read_to_string(ctx.working_dir.join("log")).unwrap_or_default();
            self.calls.borrow_mut().push((args.to_vec(), seen));
            Ok(())
        }
    }

    #[test]
    fn test_registered_external_task() {
        use crate::quakefile::types::{ExternalDispatch, Task};

        let dir = TempDir::new().unwrap();
        let mut file = parse_quakefile("task prep { echo prep >> log }\n").unwrap();
        let mut ext = Task::new("codegen");
        ext.arguments = vec!["lang".to_string()];
        ext.dependencies = vec!["prep".to_string()];
        ext.external = Some(ExternalDispatch::default());
        file.tasks.push(ext);

        let ctx = Context::new()
            .with_working_dir(dir.path().to_path_buf())
            .with_verbosity(Verbosity::Silent);
        let mut ev = Evaluator::with_context(file, ctx);

        let calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        ev.register_external(Box::new(Recorder {
            arg_spec: vec!["lang".to_string()],
            calls: calls.clone(),
        }));

        ev.run_task_with_args("codegen", &["rust".to_string()]).unwrap();
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec!["rust".to_string()]);
        assert_eq!(calls[0].1, "prep\n");
    }
}
