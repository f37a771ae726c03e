//! Command execution
//!
//! This module hands rendered command strings to the host shell.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::Context;
use std::process::{Command as StdCommand, Stdio};
use tracing::debug;

/// Build the interpreter invocation for `cmd_str`
fn shell_command(cmd_str: &str, ctx: &Context) -> ExecutionResult<StdCommand> {
    let Some((program, interpreter_args)) = ctx.interpreter.split_first() else {
        return Err(ExecutionError::CommandFailed {
            command: cmd_str.to_string(),
            code: None,
        });
    };

    let mut command = StdCommand::new(program);
    command.args(interpreter_args);
    command.arg(cmd_str);
    command.current_dir(&ctx.working_dir);

    // Quakefile variables and bound arguments are visible to the child
    for (key, value) in &ctx.vars {
        command.env(key, value);
    }

    Ok(command)
}

/// Run a command with inherited standard streams, waiting for it to exit
pub fn execute_shell(cmd_str: &str, ctx: &Context) -> ExecutionResult<()> {
    debug!(command = cmd_str, dir = %ctx.working_dir.display(), "executing");

    let mut command = shell_command(cmd_str, ctx)?;
    command.stdin(Stdio::inherit());
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    let status = command.status().map_err(|e| {
        debug!(command = cmd_str, error = %e, "failed to spawn");
        ExecutionError::CommandFailed {
            command: cmd_str.to_string(),
            code: None,
        }
    })?;

    if !status.success() {
        return Err(ExecutionError::CommandFailed {
            command: cmd_str.to_string(),
            code: status.code(),
        });
    }

    Ok(())
}

/// Run a command and capture its standard output, trimmed.
///
/// Standard error passes through to the terminal.
pub fn capture_shell(cmd_str: &str, ctx: &Context) -> ExecutionResult<String> {
    debug!(command = cmd_str, "capturing");

    let mut command = shell_command(cmd_str, ctx)?;
    command.stdin(Stdio::null());
    command.stderr(Stdio::inherit());

    let output = command.output().map_err(|_| ExecutionError::CommandFailed {
        command: cmd_str.to_string(),
        code: None,
    })?;

    if !output.status.success() {
        return Err(ExecutionError::CommandFailed {
            command: cmd_str.to_string(),
            code: output.status.code(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_simple_command() {
        let ctx = Context::new();
        assert!(execute_shell("true", &ctx).is_ok());
    }

    #[test]
    fn test_execute_failing_command() {
        let ctx = Context::new();
        let result = execute_shell("exit 3", &ctx);
        assert!(matches!(
            result,
            Err(ExecutionError::CommandFailed { code: Some(3), .. })
        ));
    }

    #[test]
    fn test_spawn_failure_has_no_code() {
        let ctx = Context::new().with_interpreter(vec!["/nonexistent/quake-shell".to_string()]);
        assert!(matches!(
            execute_shell("true", &ctx),
            Err(ExecutionError::CommandFailed { code: None, .. })
        ));

        let ctx = Context::new().with_interpreter(Vec::new());
        assert!(matches!(
            execute_shell("true", &ctx),
            Err(ExecutionError::CommandFailed { code: None, .. })
        ));
    }

    #[test]
    fn test_capture_trims_output() {
        let ctx = Context::new();
        assert_eq!(capture_shell("printf '  hi\\n\\n'", &ctx).unwrap(), "hi");
    }

    #[test]
    fn test_capture_sees_context_vars() {
        let mut ctx = Context::new();
        ctx.set_var("QUAKE_GREETING".to_string(), "hello".to_string());
        assert_eq!(capture_shell("echo $QUAKE_GREETING", &ctx).unwrap(), "hello");
    }

    #[test]
    fn test_capture_failure() {
        let ctx = Context::new();
        assert!(capture_shell("echo partial; false", &ctx).is_err());
    }

    #[test]
    fn test_runs_in_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = Context::new().with_working_dir(dir.path().to_path_buf());
        execute_shell("touch marker", &ctx).unwrap();
        assert!(dir.path().join("marker").exists());
    }
}
