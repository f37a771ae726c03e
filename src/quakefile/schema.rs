//! Quakefile validation
//!
//! Checks that need the whole (merged) file: duplicate task names and
//! dependency cycles.

use crate::error::{ConfigError, ConfigResult};
use crate::quakefile::types::QuakeFile;
use std::collections::HashSet;

/// Validate a complete, merged Quakefile
pub fn validate_quakefile(file: &QuakeFile) -> ConfigResult<()> {
    detect_duplicate_tasks(file)?;
    detect_circular_task_dependencies(file)?;
    Ok(())
}

/// Every task must be addressable by exactly one qualified name
fn detect_duplicate_tasks(file: &QuakeFile) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for (name, _) in file.qualified_tasks() {
        if !seen.insert(name.clone()) {
            return Err(ConfigError::DuplicateTask(name));
        }
    }
    Ok(())
}

/// Detect cycles through task dependencies.
///
/// Dependencies that do not resolve to a task are file-like targets and are
/// not followed.
fn detect_circular_task_dependencies(file: &QuakeFile) -> ConfigResult<()> {
    let mut visited = HashSet::new();
    for (task_name, _) in file.qualified_tasks() {
        let mut stack = Vec::new();
        check_task_cycle(file, &task_name, &mut visited, &mut stack)?;
    }
    Ok(())
}

/// Recursively check for cycles in task dependencies
fn check_task_cycle(
    file: &QuakeFile,
    task_name: &str,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) -> ConfigResult<()> {
    if stack.iter().any(|name| name == task_name) {
        stack.push(task_name.to_string());
        return Err(ConfigError::CircularDependency(stack.join(" -> ")));
    }

    if visited.contains(task_name) {
        return Ok(());
    }

    let Some(resolved) = file.resolve(task_name) else {
        return Ok(());
    };

    stack.push(resolved.qualified.clone());
    for dep in &resolved.task.dependencies {
        if let Some(target) = file.resolve_from(&resolved, dep) {
            check_task_cycle(file, &target.qualified, visited, stack)?;
        }
    }
    stack.pop();
    visited.insert(task_name.to_string());

    Ok(())
}
