//! Rendering command elements into shell strings

use crate::quakefile::types::{CommandElement, Expression};
use crate::runner::Context;

/// Resolve an expression to a string.
///
/// Misses are empty strings, never errors, so `||` can supply a default.
pub fn eval_expression(expr: &Expression, ctx: &Context) -> String {
    match expr {
        Expression::Identifier { name } => ctx.lookup(name).unwrap_or_default(),
        Expression::StringLiteral { value } => value.clone(),
        Expression::AccessId { object, property } => match object.as_ref() {
            Expression::Identifier { name } if name == "env" => {
                ctx.lookup(property).unwrap_or_default()
            }
            _ => String::new(),
        },
        Expression::Or { left, right } => {
            let left = eval_expression(left, ctx);
            if left.is_empty() {
                eval_expression(right, ctx)
            } else {
                left
            }
        }
    }
}

/// Render a command line for the shell.
///
/// Unknown `$NAME` references and backtick spans are passed through for the
/// shell to evaluate.
pub fn render_command(elements: &[CommandElement], ctx: &Context) -> String {
    let mut out = String::new();
    for element in elements {
        match element {
            CommandElement::String { value } => out.push_str(value),
            CommandElement::Variable { name } => match ctx.lookup(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            },
            CommandElement::Backtick { command } => {
                out.push('`');
                out.push_str(command);
                out.push('`');
            }
            CommandElement::Expression { expression } => {
                out.push_str(&eval_expression(expression, ctx))
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        let mut ctx = Context::new();
        ctx.set_var("present".to_string(), "value".to_string());
        ctx.set_var("empty".to_string(), String::new());
        ctx
    }

    #[test]
    fn test_fallback_expression() {
        let ctx = ctx();
        let missing = Expression::or(Expression::ident("missing_quake_var"), Expression::string("default"));
        assert_eq!(eval_expression(&missing, &ctx), "default");

        let present = Expression::or(Expression::ident("present"), Expression::string("default"));
        assert_eq!(eval_expression(&present, &ctx), "value");

        let empty = Expression::or(Expression::ident("empty"), Expression::string("default"));
        assert_eq!(eval_expression(&empty, &ctx), "default");
    }

    #[test]
    fn test_env_access() {
        let ctx = ctx();
        let env_path = Expression::access(Expression::ident("env"), "PATH");
        assert_eq!(eval_expression(&env_path, &ctx), std::env::var("PATH").unwrap());

        let env_ctx = Expression::access(Expression::ident("env"), "present");
        assert_eq!(eval_expression(&env_ctx, &ctx), "value");

        let other = Expression::access(Expression::ident("config"), "present");
        assert_eq!(eval_expression(&other, &ctx), "");
    }

    #[test]
    fn test_render_command() {
        let ctx = ctx();
        let elements = vec![
            CommandElement::text("echo "),
            CommandElement::variable("present"),
            CommandElement::text(" "),
            CommandElement::variable("missing_quake_var"),
            CommandElement::text(" "),
            CommandElement::backtick("date"),
            CommandElement::text(" "),
            CommandElement::expression(Expression::or(
                Expression::ident("missing_quake_var"),
                Expression::string("d"),
            )),
        ];
        assert_eq!(
            render_command(&elements, &ctx),
            "echo value $missing_quake_var `date` d"
        );
    }
}
