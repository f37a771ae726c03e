//! Quakefile grammar
//!
//! Ordered alternation over top-level declarations, first match wins:
//!
//! ```text
//! file      := ( comment | variable | task | namespace )*
//! variable  := WORD '=' ( '"""' .. '"""' | '`' .. '`' | '{{' expr '}}' | '"' .. '"' )
//! task      := 'task' NAME [ '(' args ')' ] [ '=>' deps ] [ '{' balanced '}' ]
//! namespace := 'namespace' WORD ( '{' ( comment | variable | task | namespace )* '}' | )
//! ```
//!
//! Every declaration ends at a newline, the end of input, or the `}` of an
//! enclosing namespace block.

use crate::error::{ParseError, ParseResult};
use crate::quakefile::command::parse_commands;
use crate::quakefile::expression::parse_expression;
use crate::quakefile::lexer::{is_task_name_char, Cursor};
use crate::quakefile::types::{Namespace, QuakeFile, Task, Variable, VariableValue};
use tracing::debug;

/// Parse Quakefile source text into its syntax tree.
///
/// The whole input must be consumed; anything that is not a recognised
/// declaration is an error.
pub fn parse_quakefile(src: &str) -> ParseResult<QuakeFile> {
    let mut parser = Parser {
        cur: Cursor::new(src),
        file_namespace: None,
    };
    let mut root = Namespace::default();
    parser.parse_scope(&mut root, None)?;

    let file = QuakeFile {
        tasks: root.tasks,
        namespaces: root.namespaces,
        variables: root.variables,
        file_namespace: parser.file_namespace,
    };
    debug!(
        tasks = file.tasks.len(),
        namespaces = file.namespaces.len(),
        variables = file.variables.len(),
        "parsed Quakefile"
    );
    Ok(file)
}

struct Parser<'a> {
    cur: Cursor<'a>,
    file_namespace: Option<String>,
}

impl<'a> Parser<'a> {
    /// Parse declarations into `scope`.
    ///
    /// `open` is the offset of the `{` of the enclosing namespace block, or
    /// `None` at file level.
    fn parse_scope(&mut self, scope: &mut Namespace, open: Option<usize>) -> ParseResult<()> {
        let mut doc: Vec<String> = Vec::new();

        loop {
            // a blank line detaches a comment from the next declaration
            if self.cur.skip_ws() > 1 {
                doc.clear();
            }

            match self.cur.peek() {
                None => {
                    return match open {
                        Some(at) => Err(self.unterminated("namespace block", at)),
                        None => Ok(()),
                    };
                }
                Some('}') if open.is_some() => {
                    self.cur.bump();
                    return Ok(());
                }
                Some('#') => {
                    let line = self.cur.take_line();
                    doc.push(line[1..].trim().to_string());
                    continue;
                }
                _ => {}
            }

            let start = self.cur.pos();
            if let Some(variable) = self.variable()? {
                scope.variables.push(variable);
            } else if self.cur.eat_keyword("task") {
                let mut task = self.task()?;
                if !doc.is_empty() {
                    task.description = Some(doc.join("\n"));
                }
                scope.tasks.push(task);
            } else if self.cur.eat_keyword("namespace") {
                self.namespace(scope, open.is_none(), start)?;
            } else {
                return Err(self.unexpected());
            }

            doc.clear();
            self.end_of_declaration()?;
        }
    }

    fn variable(&mut self) -> ParseResult<Option<Variable>> {
        let start = self.cur.pos();
        let Some(name) = self.cur.word() else {
            return Ok(None);
        };
        self.cur.skip_inline_ws();
        if self.cur.starts_with("=>") || !self.cur.eat("=") {
            self.cur.reset(start);
            return Ok(None);
        }
        self.cur.skip_inline_ws();

        let value = self.variable_value()?;
        debug!(name, "parsed variable");
        Ok(Some(Variable::new(name, value)))
    }

    fn variable_value(&mut self) -> ParseResult<VariableValue> {
        let start = self.cur.pos();

        if self.cur.eat("\"\"\"") {
            if !self.cur.eat("\r\n") {
                self.cur.eat("\n");
            }
            let Some(value) = self.cur.take_until("\"\"\"") else {
                let (line, column) = self.cur.line_col_at(start);
                return Err(ParseError::UnterminatedMultiline { line, column });
            };
            self.cur.eat("\"\"\"");
            return Ok(VariableValue::Multiline {
                value: value.to_string(),
            });
        }

        if self.cur.eat("`") {
            let Some(command) = self.cur.take_until("`") else {
                let (line, column) = self.cur.line_col_at(start);
                return Err(ParseError::UnterminatedSubstitution { line, column });
            };
            self.cur.eat("`");
            return Ok(VariableValue::command(command));
        }

        if self.cur.eat("{{") {
            let Some(inner) = self.cur.take_until("}}") else {
                let (line, column) = self.cur.line_col_at(start);
                return Err(ParseError::UnterminatedExpression { line, column });
            };
            self.cur.eat("}}");
            let expression = parse_expression(inner).map_err(|e| self.relocate(e, start))?;
            return Ok(VariableValue::Expression { expression });
        }

        if self.cur.peek() == Some('"') {
            let raw = self.cur.quoted('"')?;
            return Ok(VariableValue::literal(raw));
        }

        Err(self.expected("a quoted string, `command`, {{ expression }} or \"\"\" block"))
    }

    fn task(&mut self) -> ParseResult<Task> {
        self.cur.skip_inline_ws();
        let name = self.cur.take_while(is_task_name_char);
        if name.is_empty() {
            return Err(self.expected("task name"));
        }
        let mut task = Task::new(name);
        self.cur.skip_inline_ws();

        if self.cur.peek() == Some('(') {
            let open = self.cur.pos();
            self.cur.bump();
            let Some(args) = self.cur.take_until(")") else {
                let (line, column) = self.cur.line_col_at(open);
                return Err(ParseError::Expected {
                    expected: "')' to close argument list".to_string(),
                    line,
                    column,
                });
            };
            self.cur.bump();
            task.arguments = split_arguments(args);
            self.cur.skip_inline_ws();
        }

        if self.cur.eat("=>") {
            let deps = self.cur.take_while(|c| c != '{' && c != '\n');
            task.dependencies = split_dependencies(deps);
        }

        // the body may open on a later line; without one the task is bodyless
        let header_end = self.cur.pos();
        self.cur.skip_ws();
        if self.cur.peek() == Some('{') {
            let open = self.cur.pos();
            self.cur.bump();
            let body = match self.cur.balanced() {
                Ok(body) => body,
                Err(ParseError::UnterminatedBlock { what: "block", .. }) => {
                    return Err(self.unterminated("task body", open));
                }
                Err(e) => return Err(e),
            };
            self.cur.bump();
            task.commands = parse_commands(body);
        } else {
            self.cur.reset(header_end);
        }

        debug!(
            task = %task.name,
            arguments = task.arguments.len(),
            dependencies = task.dependencies.len(),
            commands = task.commands.len(),
            "parsed task"
        );
        Ok(task)
    }

    fn namespace(&mut self, scope: &mut Namespace, top_level: bool, start: usize) -> ParseResult<()> {
        self.cur.skip_inline_ws();
        let Some(name) = self.cur.word() else {
            return Err(self.expected("namespace name"));
        };
        self.cur.skip_inline_ws();
        let (line, _) = self.cur.line_col_at(start);

        if self.cur.peek() == Some('{') {
            if top_level {
                if let Some(file_ns) = &self.file_namespace {
                    return Err(ParseError::MixedNamespaceForms {
                        name: file_ns.clone(),
                        line,
                    });
                }
            }
            let open = self.cur.pos();
            self.cur.bump();
            let mut ns = Namespace::new(name);
            self.parse_scope(&mut ns, Some(open))?;
            debug!(namespace = name, tasks = ns.tasks.len(), "parsed namespace block");
            scope.namespaces.push(ns);
            return Ok(());
        }

        if !top_level {
            return Err(self.expected("'{' after nested namespace name"));
        }
        if let Some(first) = &self.file_namespace {
            return Err(ParseError::DuplicateFileNamespace {
                first: first.clone(),
                second: name.to_string(),
                line,
            });
        }
        if !scope.namespaces.is_empty() {
            return Err(ParseError::MixedNamespaceForms {
                name: name.to_string(),
                line,
            });
        }
        self.file_namespace = Some(name.to_string());
        Ok(())
    }

    fn end_of_declaration(&mut self) -> ParseResult<()> {
        self.cur.skip_inline_ws();
        if self.cur.peek() == Some('#') {
            self.cur.take_line();
        }
        if self.cur.eat_line_end() || self.cur.peek() == Some('}') {
            return Ok(());
        }
        Err(self.expected("end of line"))
    }

    fn relocate(&self, err: ParseError, at: usize) -> ParseError {
        let (line, column) = self.cur.line_col_at(at);
        match err {
            ParseError::InvalidExpression {
                source_text, reason, ..
            } => ParseError::InvalidExpression {
                source_text,
                reason,
                line,
                column,
            },
            other => other,
        }
    }

    fn unterminated(&self, what: &'static str, at: usize) -> ParseError {
        let (line, column) = self.cur.line_col_at(at);
        ParseError::UnterminatedBlock { what, line, column }
    }

    fn expected(&self, expected: &str) -> ParseError {
        let (line, column) = self.cur.line_col();
        ParseError::Expected {
            expected: expected.to_string(),
            line,
            column,
        }
    }

    fn unexpected(&self) -> ParseError {
        let (line, column) = self.cur.line_col();
        let found: String = self
            .cur
            .rest()
            .lines()
            .next()
            .unwrap_or("")
            .trim_end()
            .chars()
            .take(40)
            .collect();
        ParseError::UnexpectedInput {
            found,
            line,
            column,
        }
    }
}

fn split_arguments(args: &str) -> Vec<String> {
    args.split(',')
        .map(str::trim)
        .filter(|arg| !arg.is_empty())
        .map(String::from)
        .collect()
}

fn split_dependencies(deps: &str) -> Vec<String> {
    deps.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|dep| !dep.is_empty())
        .map(String::from)
        .collect()
}
