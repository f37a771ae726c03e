//! Command-line grammar
//!
//! A task body is split into physical lines; each non-blank line becomes a
//! [`Command`] whose text is broken into [`CommandElement`]s by fixed-priority
//! alternation: `{{ expr }}`, then `` `cmd` ``, then `$NAME`, then plain text.

use crate::quakefile::expression::parse_expression;
use crate::quakefile::lexer::Cursor;
use crate::quakefile::types::{Command, CommandElement};
use tracing::debug;

/// Split one logical command line into elements.
///
/// Never fails: an unterminated `{{` or backtick, or an expression that does
/// not parse, is kept as literal text.
pub fn parse_command_line(text: &str) -> Vec<CommandElement> {
    let mut elements = Vec::new();
    let mut literal = String::new();
    let mut cur = Cursor::new(text);

    while !cur.is_eof() {
        let start = cur.pos();

        if cur.eat("{{") {
            if let Some(inner) = cur.take_until("}}") {
                cur.eat("}}");
                match parse_expression(inner) {
                    Ok(expression) => {
                        flush(&mut literal, &mut elements);
                        elements.push(CommandElement::expression(expression));
                    }
                    Err(e) => {
                        debug!(expression = inner, error = %e, "keeping unparseable expression as text");
                        literal.push_str(&text[start..cur.pos()]);
                    }
                }
                continue;
            }
            literal.push_str("{{");
            continue;
        }

        if cur.eat("`") {
            if let Some(inner) = cur.take_until("`") {
                cur.eat("`");
                flush(&mut literal, &mut elements);
                elements.push(CommandElement::backtick(inner));
                continue;
            }
            literal.push('`');
            continue;
        }

        if cur.eat("$") {
            match cur.word() {
                Some(name) => {
                    flush(&mut literal, &mut elements);
                    elements.push(CommandElement::variable(name));
                }
                None => literal.push('$'),
            }
            continue;
        }

        let chunk = cur.take_while(|c| !matches!(c, '{' | '`' | '$'));
        if chunk.is_empty() {
            // a lone '{' that does not open an expression
            if let Some(c) = cur.bump() {
                literal.push(c);
            }
        } else {
            literal.push_str(chunk);
        }
    }

    flush(&mut literal, &mut elements);
    elements
}

fn flush(literal: &mut String, elements: &mut Vec<CommandElement>) {
    if !literal.is_empty() {
        elements.push(CommandElement::text(std::mem::take(literal)));
    }
}

/// Turn the content of a task body into commands.
///
/// Lines are trimmed; a leading `@` marks the command silent and a leading `-`
/// marks it continue-on-error (either order, both allowed). Blank lines, `#`
/// comment lines, and lines that are empty once the modifiers are removed,
/// produce nothing.
pub fn parse_commands(body: &str) -> Vec<Command> {
    let mut commands = Vec::new();

    for line in body.split('\n') {
        let mut text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let mut silent = false;
        let mut continue_on_error = false;
        loop {
            if !silent && text.starts_with('@') {
                silent = true;
            } else if !continue_on_error && text.starts_with('-') {
                continue_on_error = true;
            } else {
                break;
            }
            text = text[1..].trim_start();
        }

        if text.is_empty() {
            continue;
        }

        commands.push(Command {
            elements: parse_command_line(text),
            silent,
            continue_on_error,
        });
    }

    commands
}
