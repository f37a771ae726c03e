//! Built-in `echo` for silent commands
//!
//! `@echo ...` lines are printed directly instead of spawning a shell. Quotes
//! are removed and variables expanded the way `sh` would for the simple
//! cases, and unquoted values are split into words. Anything the shell
//! would treat specially (flags, backticks, pipes, redirects, globs,
//! unbalanced quotes) is left to the shell.

use crate::quakefile::types::{Command, CommandElement};
use crate::runner::interpolate::expand_variables;
use crate::runner::render::eval_expression;
use crate::runner::Context;

/// Unquoted characters whose meaning depends on the shell
const SHELL_METACHARS: &[char] = &['|', '&', ';', '<', '>', '(', ')', '*', '?', '[', '~', '#'];

/// The text a silent `echo` command prints, or `None` when it must go
/// through the shell.
pub fn native_echo(cmd: &Command, ctx: &Context) -> Option<String> {
    if !cmd.silent {
        return None;
    }
    let (first, rest) = cmd.elements.split_first()?;
    let CommandElement::String { value } = first else {
        return None;
    };
    let args = value.trim_start().strip_prefix("echo")?;
    if args.chars().next().is_some_and(|c| !c.is_whitespace()) {
        return None;
    }
    let args = args.trim_start();
    if args.starts_with('-') {
        return None;
    }

    let mut writer = EchoWriter::new(ctx);
    writer.text(args)?;
    for element in rest {
        match element {
            CommandElement::String { value } => writer.text(value)?,
            CommandElement::Variable { name } => writer.variable(name)?,
            CommandElement::Expression { expression } => {
                let value = eval_expression(expression, ctx);
                writer.value(&value)?;
            }
            CommandElement::Backtick { .. } => return None,
        }
    }
    writer.finish()
}

struct EchoWriter<'c> {
    ctx: &'c Context,
    out: String,
    /// Double-quoted or unquoted text awaiting `${NAME}` expansion
    pending: String,
    in_double: bool,
    in_single: bool,
    need_space: bool,
}

impl<'c> EchoWriter<'c> {
    fn new(ctx: &'c Context) -> Self {
        EchoWriter {
            ctx,
            out: String::new(),
            pending: String::new(),
            in_double: false,
            in_single: false,
            need_space: false,
        }
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let expanded = expand_variables(&self.pending, |name| self.ctx.lookup(name));
            self.out.push_str(&expanded);
            self.pending.clear();
        }
    }

    /// Emit the single space separating two words
    fn separate(&mut self) {
        if self.need_space {
            self.flush();
            if !self.out.is_empty() {
                self.out.push(' ');
            }
            self.need_space = false;
        }
    }

    fn expandable(&mut self, c: char) {
        self.separate();
        self.pending.push(c);
    }

    fn raw(&mut self, s: &str) {
        self.separate();
        self.flush();
        self.out.push_str(s);
    }

    fn text(&mut self, s: &str) -> Option<()> {
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if self.in_single {
                if c == '\'' {
                    self.in_single = false;
                } else {
                    self.raw(c.encode_utf8(&mut [0; 4]));
                }
                continue;
            }

            if self.in_double {
                match c {
                    '"' => self.in_double = false,
                    '\\' => match chars.next() {
                        Some(next @ ('"' | '\\' | '$' | '`')) => {
                            self.raw(next.encode_utf8(&mut [0; 4]))
                        }
                        Some(next) => {
                            self.expandable('\\');
                            self.expandable(next);
                        }
                        None => self.expandable('\\'),
                    },
                    _ => self.expandable(c),
                }
                continue;
            }

            match c {
                '\'' => {
                    self.separate();
                    self.in_single = true;
                }
                '"' => {
                    self.separate();
                    self.in_double = true;
                }
                '\\' => {
                    let next = chars.next()?;
                    self.raw(next.encode_utf8(&mut [0; 4]));
                }
                c if c.is_whitespace() => {
                    self.flush();
                    self.need_space = true;
                }
                c if SHELL_METACHARS.contains(&c) => return None,
                c => self.expandable(c),
            }
        }
        Some(())
    }

    fn variable(&mut self, name: &str) -> Option<()> {
        if self.in_single {
            self.raw(&format!("${}", name));
            return Some(());
        }
        let value = self.ctx.lookup(name).unwrap_or_default();
        self.value(&value)
    }

    /// Substituted text; outside quotes it is split into words like `sh` does
    fn value(&mut self, value: &str) -> Option<()> {
        if self.in_single || self.in_double {
            self.raw(value);
            return Some(());
        }
        // unquoted globs would be expanded by the shell
        if value.contains(['*', '?', '[']) {
            return None;
        }
        if value.starts_with(char::is_whitespace) {
            self.flush();
            self.need_space = true;
        }
        for (i, word) in value.split_whitespace().enumerate() {
            if i > 0 {
                self.need_space = true;
            }
            self.raw(word);
        }
        if value.ends_with(char::is_whitespace) {
            self.need_space = true;
        }
        Some(())
    }

    fn finish(mut self) -> Option<String> {
        if self.in_single || self.in_double {
            return None;
        }
        self.flush();
        Some(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quakefile::command::parse_commands;

    fn echo(line: &str) -> Option<String> {
        let mut ctx = Context::new();
        ctx.set_var("name".to_string(), "world".to_string());
        ctx.set_var("spaced".to_string(), "a  b".to_string());
        let cmds = parse_commands(line);
        native_echo(&cmds[0], &ctx)
    }

    #[test]
    fn test_double_quotes_are_stripped_and_expanded() {
        assert_eq!(echo(r#"@echo "Hello, $name!""#).as_deref(), Some("Hello, world!"));
        assert_eq!(echo(r#"@echo "${name}s""#).as_deref(), Some("worlds"));
        assert_eq!(echo(r#"@echo "keep   spacing""#).as_deref(), Some("keep   spacing"));
    }

    #[test]
    fn test_single_quotes_are_literal() {
        assert_eq!(echo("@echo 'no $name here'").as_deref(), Some("no $name here"));
        assert_eq!(echo("@echo '${name}'").as_deref(), Some("${name}"));
    }

    #[test]
    fn test_mixed_quoting_and_word_splitting() {
        assert_eq!(
            echo(r#"@echo   unquoted    words "and  quoted" 'parts'"#).as_deref(),
            Some("unquoted words and  quoted parts")
        );
        assert_eq!(echo(r#"@echo it\'s "a \"quote\"""#).as_deref(), Some(r#"it's a "quote""#));
        assert_eq!(echo(r#"@echo "$spaced""#).as_deref(), Some("a  b"));
    }

    #[test]
    fn test_unquoted_values_are_word_split() {
        assert_eq!(echo("@echo $spaced").as_deref(), Some("a b"));
        assert_eq!(echo("@echo x$spaced:y").as_deref(), Some("xa b:y"));
        assert_eq!(echo("@echo '$spaced'").as_deref(), Some("$spaced"));
        assert_eq!(echo("@echo {{ spaced }} end").as_deref(), Some("a b end"));
    }

    #[test]
    fn test_expressions_are_evaluated() {
        assert_eq!(
            echo(r#"@echo "Env: {{missing_quake_var || "dev"}}""#).as_deref(),
            Some("Env: dev")
        );
    }

    #[test]
    fn test_bare_echo_prints_empty_line() {
        assert_eq!(echo("@echo").as_deref(), Some(""));
    }

    #[test]
    fn test_falls_back_to_shell() {
        for line in [
            "echo not silent",
            "@echo -n no newline",
            "@echo `date`",
            "@echo hi | tr a-z A-Z",
            "@echo hi > out.txt",
            "@echo *.rs",
            "@echo \"unbalanced",
            "@echoes word",
            "@printf hi",
            "@`echo hi`",
        ] {
            assert_eq!(echo(line), None, "line {:?}", line);
        }
    }

    #[test]
    fn test_quoted_metachars_are_fine() {
        assert_eq!(echo(r#"@echo "a | b; c > d""#).as_deref(), Some("a | b; c > d"));
    }
}
