//! Expression grammar for `{{ ... }}`
//!
//! ```text
//! expr    := primary ( '||' primary )*
//! primary := IDENT ( '.' IDENT )* | '"' string '"'
//! ```
//!
//! `||` is left-associative. There are no parentheses or numbers.

use crate::error::{ParseError, ParseResult};
use crate::quakefile::lexer::{unescape, Cursor};
use crate::quakefile::types::Expression;

/// Parse the text between `{{` and `}}`.
///
/// Positions in errors are relative to `input`.
pub fn parse_expression(input: &str) -> ParseResult<Expression> {
    let mut cur = Cursor::new(input);
    cur.skip_ws();
    let mut expr = parse_primary(&mut cur, input)?;
    loop {
        cur.skip_ws();
        if !cur.eat("||") {
            break;
        }
        cur.skip_ws();
        let right = parse_primary(&mut cur, input)?;
        expr = Expression::or(expr, right);
    }
    if !cur.is_eof() {
        return Err(invalid(
            &cur,
            input,
            format!("unexpected '{}'", cur.rest().trim_end()),
        ));
    }
    Ok(expr)
}

fn parse_primary(cur: &mut Cursor<'_>, input: &str) -> ParseResult<Expression> {
    match cur.peek() {
        Some('"') => match cur.quoted('"') {
            Ok(raw) => Ok(Expression::string(unescape(raw))),
            Err(_) => Err(invalid(cur, input, "unterminated string literal".to_string())),
        },
        Some(_) => {
            let Some(name) = cur.word() else {
                return Err(invalid(cur, input, "expected identifier or string".to_string()));
            };
            let mut expr = Expression::ident(name);
            while cur.eat(".") {
                let Some(property) = cur.word() else {
                    return Err(invalid(cur, input, "expected property name after '.'".to_string()));
                };
                expr = Expression::access(expr, property);
            }
            Ok(expr)
        }
        None => Err(invalid(cur, input, "empty expression".to_string())),
    }
}

fn invalid(cur: &Cursor<'_>, input: &str, reason: String) -> ParseError {
    let (line, column) = cur.line_col();
    ParseError::InvalidExpression {
        source_text: input.trim().to_string(),
        reason,
        line,
        column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(parse_expression("target").unwrap(), Expression::ident("target"));
    }

    #[test]
    fn test_access() {
        assert_eq!(
            parse_expression("env.API_KEY").unwrap(),
            Expression::access(Expression::ident("env"), "API_KEY")
        );
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(
            parse_expression(r#""development""#).unwrap(),
            Expression::string("development")
        );
        assert_eq!(
            parse_expression(r#""say \"hi\"""#).unwrap(),
            Expression::string("say \"hi\"")
        );
    }

    #[test]
    fn test_or_with_spacing() {
        assert_eq!(
            parse_expression(r#"  env.DEPLOY_ENV ||  "development" "#).unwrap(),
            Expression::or(
                Expression::access(Expression::ident("env"), "DEPLOY_ENV"),
                Expression::string("development"),
            )
        );
    }

    #[test]
    fn test_or_is_left_associative() {
        assert_eq!(
            parse_expression(r#"a || b || "c""#).unwrap(),
            Expression::or(
                Expression::or(Expression::ident("a"), Expression::ident("b")),
                Expression::string("c"),
            )
        );
    }

    #[test]
    fn test_invalid_expressions() {
        for input in ["", "a ||", "a b", "(a)", "a.", r#""open"#, "a | b"] {
            assert!(
                matches!(
                    parse_expression(input),
                    Err(ParseError::InvalidExpression { .. })
                ),
                "expected failure for {:?}",
                input
            );
        }
    }
}
