//! Lexical primitives shared by the Quakefile, command and expression grammars
//!
//! [`Cursor`] walks a `&str` by byte offset. Every scanner either consumes what
//! it matched or leaves the cursor untouched, so callers can try alternatives
//! in order and fall through on a miss.

use crate::error::{ParseError, ParseResult};

/// Characters allowed in variable, argument and namespace names
pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Characters allowed in task names (`docs:generate`, `output.txt`, `build-all`)
pub fn is_task_name_char(c: char) -> bool {
    is_word_char(c) || matches!(c, ':' | '.' | '-' | '/')
}

/// Resolve `\"`, `\\`, `\n` and `\t`; any other backslash pair is kept as written
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Compute the 1-based line and column of a byte offset
pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(src.len());
    let before = &src[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Cursor { src, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Rewind (or advance) to a previously observed offset
    pub fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn source(&self) -> &'a str {
        self.src
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consume `s` if the input continues with it
    pub fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Consume a keyword that must not run on into a task-name character
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        let rest = self.rest();
        if !rest.starts_with(keyword) {
            return false;
        }
        match rest[keyword.len()..].chars().next() {
            Some(c) if is_task_name_char(c) => false,
            _ => {
                self.pos += keyword.len();
                true
            }
        }
    }

    pub fn line_col(&self) -> (usize, usize) {
        line_col(self.src, self.pos)
    }

    pub fn line_col_at(&self, offset: usize) -> (usize, usize) {
        line_col(self.src, offset)
    }

    /// Skip spaces, tabs, carriage returns and newlines; returns newlines skipped
    pub fn skip_ws(&mut self) -> usize {
        let mut newlines = 0;
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {}
                '\n' => newlines += 1,
                _ => break,
            }
            self.pos += 1;
        }
        newlines
    }

    /// Skip spaces and tabs only
    pub fn skip_inline_ws(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.pos += 1;
        }
        self.pos > start
    }

    /// Consume a line terminator; end of input counts as one
    pub fn eat_line_end(&mut self) -> bool {
        if self.is_eof() {
            return true;
        }
        let save = self.pos;
        self.eat("\r");
        if self.eat("\n") {
            return true;
        }
        self.pos = save;
        false
    }

    /// Consume a run of characters matching `pred`
    pub fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    /// Consume `[A-Za-z0-9_]+`
    pub fn word(&mut self) -> Option<&'a str> {
        let w = self.take_while(is_word_char);
        (!w.is_empty()).then_some(w)
    }

    /// Consume everything up to (not including) `delim`; `None` if it never appears
    pub fn take_until(&mut self, delim: &str) -> Option<&'a str> {
        let idx = self.rest().find(delim)?;
        let out = &self.rest()[..idx];
        self.pos += idx;
        Some(out)
    }

    /// Consume everything up to the end of the current line (terminator excluded)
    pub fn take_line(&mut self) -> &'a str {
        let line = self.take_while(|c| c != '\n');
        line.strip_suffix('\r').map_or(line, |l| {
            self.pos -= 1;
            l
        })
    }

    /// Scan a quoted span starting at the opening `quote`.
    ///
    /// Backslash escapes the following character, so `\"` does not close a
    /// double-quoted span. Returns the raw inner text with escapes preserved.
    pub fn quoted(&mut self, quote: char) -> ParseResult<&'a str> {
        let start = self.pos;
        if self.peek() != Some(quote) {
            let (line, column) = self.line_col();
            return Err(ParseError::Expected {
                expected: format!("'{}'", quote),
                line,
                column,
            });
        }
        self.pos += quote.len_utf8();
        let inner_start = self.pos;
        while let Some(c) = self.bump() {
            if c == '\\' {
                self.bump();
            } else if c == quote {
                return Ok(&self.src[inner_start..self.pos - quote.len_utf8()]);
            }
        }
        self.pos = start;
        let (line, column) = self.line_col();
        Err(ParseError::UnterminatedQuote {
            quote,
            line,
            column,
        })
    }

    /// Scan brace-balanced content up to the first unmatched `}`.
    ///
    /// The cursor must sit just after an opening `{`. On success it is left on
    /// the closing `}` (not consumed) and the content in between is returned.
    /// Braces inside single or double quotes are ordinary text, a backslash
    /// outside quotes escapes the next character, and nested `{ ... }` groups
    /// are consumed recursively. A line whose first non-blank character is
    /// `#` is a comment: its quotes and braces are not scanned.
    pub fn balanced(&mut self) -> ParseResult<&'a str> {
        let start = self.pos;
        self.balanced_inner()?;
        Ok(&self.src[start..self.pos])
    }

    fn balanced_inner(&mut self) -> ParseResult<()> {
        let mut line_start = false;
        loop {
            match self.peek() {
                Some('\n') => {
                    line_start = true;
                    self.pos += 1;
                    continue;
                }
                Some(' ' | '\t' | '\r') => {
                    self.pos += 1;
                    continue;
                }
                Some('#') if line_start => {
                    self.take_while(|c| c != '\n');
                    continue;
                }
                _ => line_start = false,
            }

            match self.peek() {
                None => {
                    let (line, column) = self.line_col();
                    return Err(ParseError::UnterminatedBlock {
                        what: "block",
                        line,
                        column,
                    });
                }
                Some('}') => return Ok(()),
                Some(q @ ('"' | '\'')) => {
                    self.quoted(q)?;
                }
                Some('{') => {
                    let open = self.pos;
                    self.pos += 1;
                    match self.balanced_inner() {
                        Ok(()) => {
                            self.pos += 1;
                        }
                        Err(ParseError::UnterminatedBlock { .. }) => {
                            let (line, column) = self.line_col_at(open);
                            return Err(ParseError::UnterminatedBlock {
                                what: "nested block",
                                line,
                                column,
                            });
                        }
                        Err(e) => return Err(e),
                    }
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced(src: &str) -> ParseResult<&str> {
        let mut cur = Cursor::new(src);
        cur.balanced()
    }

    #[test]
    fn test_balanced_stops_at_unmatched_brace() {
        assert_eq!(balanced("echo hi } rest").unwrap(), "echo hi ");
        assert_eq!(balanced("} rest").unwrap(), "");
    }

    #[test]
    fn test_balanced_recurses_into_nested_groups() {
        assert_eq!(balanced("{ echo 1; } }").unwrap(), "{ echo 1; } ");
        assert_eq!(balanced("{{ a }} x}").unwrap(), "{{ a }} x");
        assert_eq!(balanced("a {b {c}} d} e").unwrap(), "a {b {c}} d");
    }

    #[test]
    fn test_balanced_ignores_braces_in_quotes() {
        assert_eq!(balanced(r#"echo "a } b"}"#).unwrap(), r#"echo "a } b""#);
        assert_eq!(
            balanced("awk '{ print $1 }' f}").unwrap(),
            "awk '{ print $1 }' f"
        );
        assert_eq!(balanced(r#"echo "a \" } b"}"#).unwrap(), r#"echo "a \" } b""#);
    }

    #[test]
    fn test_balanced_escaped_brace_outside_quotes() {
        assert_eq!(balanced(r"echo \} x}").unwrap(), r"echo \} x");
    }

    #[test]
    fn test_balanced_skips_comment_lines() {
        let body = "\n    # don't }\n    echo it's\n";
        assert!(balanced(body).is_err());

        let body = "\n    # don't stop }\n    echo ok\n} rest";
        assert_eq!(balanced(body).unwrap(), "\n    # don't stop }\n    echo ok\n");
        assert_eq!(balanced("echo a # it's }").unwrap_err().line(), 1);
    }

    #[test]
    fn test_balanced_unterminated() {
        assert!(matches!(
            balanced("echo {"),
            Err(ParseError::UnterminatedBlock { .. })
        ));
        assert!(matches!(
            balanced("echo 'oops }"),
            Err(ParseError::UnterminatedQuote { quote: '\'', .. })
        ));
    }

    #[test]
    fn test_quoted_keeps_escapes() {
        let mut cur = Cursor::new(r#""say \"hi\"" tail"#);
        assert_eq!(cur.quoted('"').unwrap(), r#"say \"hi\""#);
        assert_eq!(cur.rest(), " tail");
    }

    #[test]
    fn test_quoted_unterminated_restores_position() {
        let mut cur = Cursor::new("\"abc");
        let err = cur.quoted('"').unwrap_err();
        assert_eq!(
            err,
            ParseError::UnterminatedQuote {
                quote: '"',
                line: 1,
                column: 1
            }
        );
        assert_eq!(cur.pos(), 0);
    }

    #[test]
    fn test_keyword_requires_boundary() {
        let mut cur = Cursor::new("tasks");
        assert!(!cur.eat_keyword("task"));
        let mut cur = Cursor::new("task build");
        assert!(cur.eat_keyword("task"));
        assert_eq!(cur.rest(), " build");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#"a\"b\\c\nd\te"#), "a\"b\\c\nd\te");
        assert_eq!(unescape(r"keep \$ and trailing \"), r"keep \$ and trailing \");
    }

    #[test]
    fn test_line_col() {
        let src = "ab\ncd\nef";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 4), (2, 2));
        assert_eq!(line_col(src, 6), (3, 1));
    }

    #[test]
    fn test_skip_ws_counts_newlines() {
        let mut cur = Cursor::new(" \n\t\n x");
        assert_eq!(cur.skip_ws(), 2);
        assert_eq!(cur.peek(), Some('x'));
    }
}
