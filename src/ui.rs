//! Tree-drawing output helpers
//!
//! Task output is framed as a small tree:
//!
//! ```text
//! ┌──── [ build release, x86_64 ]
//! ├ cargo build
//! └ cargo test
//! ```
//!
//! Colors are applied with `colored`, which disables itself when stdout is
//! not a terminal or `NO_COLOR` is set.

use colored::Colorize;

/// Header printed when a task starts running its own commands
pub fn task_header(name: &str, args: &[String]) -> String {
    let label = if args.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, args.join(", "))
    };
    format!("{} {}", "┌────".dimmed(), format!("[ {} ]", label).bold())
}

/// Echo line for a command about to run; `last` selects the closing glyph
pub fn command_line(command: &str, last: bool) -> String {
    let glyph = if last { "└" } else { "├" };
    format!("{} {}", glyph.dimmed(), command)
}

/// Line of output produced by the built-in echo
pub fn echo_line(text: &str) -> String {
    format!("{} {}", "│".dimmed(), text)
}

pub fn warning(message: &str) -> String {
    format!("{} {}", "Warning:".yellow().bold(), message)
}

pub fn error(message: &str) -> String {
    format!("{} {}", "Error:".red().bold(), message)
}
