//! Placeholder expression parser.
//!
//! The inner content of a placeholder is a key followed by any number of
//! pipe-separated filter calls:
//!
//! ```text
//! name | def("eva") | upper | substr(0, 3)
//! ```
//!
//! Pipes inside quoted literals do not split.  Filter arguments are string
//! literals (`'…'` or `"…"`) or decimal numbers; a call without parentheses
//! takes no arguments.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::RenderError;
use crate::registry::is_filter_name;
use crate::value::Value;

/// Parsed form of a placeholder's inner content.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// Data key, trimmed of surrounding whitespace.
    pub key: String,
    /// Filters in application order.
    pub filters: Vec<FilterCall>,
}

/// One `name(args…)` step of a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Value>,
}

/// Parse the inner content of a placeholder found at byte `position`.
pub fn parse_expression(content: &str, position: usize) -> Result<Expression, RenderError> {
    let mut segments = split_pipes(content).into_iter().map(str::trim);
    let key = segments.next().unwrap_or_default().to_owned();
    let filters = segments
        .map(|seg| parse_filter_call(seg, position))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expression { key, filters })
}

/// Split on `|` outside of quoted string literals.
fn split_pipes(content: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in content.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '|' => {
                    parts.push(&content[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&content[start..]);
    parts
}

fn parse_filter_call(segment: &str, position: usize) -> Result<FilterCall, RenderError> {
    let name_end = segment
        .find(|c: char| c == '(' || c.is_whitespace())
        .unwrap_or(segment.len());
    let (name, rest) = segment.split_at(name_end);
    let rest = rest.trim_start();

    if !is_filter_name(name) || !(rest.is_empty() || rest.starts_with('(')) {
        return Err(RenderError::InvalidFilterName {
            name: segment.to_owned(),
            position,
        });
    }

    let args = match rest.strip_prefix('(') {
        Some(arg_src) => parse_args(arg_src).map_err(|message| {
            RenderError::MalformedFilterArguments {
                position,
                message: format!("{name}: {message}"),
            }
        })?,
        None => Vec::new(),
    };

    Ok(FilterCall {
        name: name.to_owned(),
        args,
    })
}

// ── Argument lexer ────────────────────────────────────────────────────────────

/// Parse a comma-separated literal list; `src` starts just after the `(`.
fn parse_args(src: &str) -> Result<Vec<Value>, String> {
    let mut lx = ArgLexer {
        chars: src.chars().peekable(),
    };
    let mut args = Vec::new();

    lx.skip_ws();
    if lx.eat(')') {
        return lx.finish(args);
    }

    loop {
        lx.skip_ws();
        args.push(lx.read_literal()?);
        lx.skip_ws();
        match lx.chars.next() {
            Some(',') => continue,
            Some(')') => break,
            Some(c) => return Err(format!("unexpected `{c}` in argument list")),
            None => return Err("unclosed '('".into()),
        }
    }

    lx.finish(args)
}

struct ArgLexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl ArgLexer<'_> {
    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn eat(&mut self, ch: char) -> bool {
        self.chars.next_if_eq(&ch).is_some()
    }

    fn finish(mut self, args: Vec<Value>) -> Result<Vec<Value>, String> {
        self.skip_ws();
        match self.chars.next() {
            None => Ok(args),
            Some(c) => Err(format!("unexpected `{c}` after ')'")),
        }
    }

    fn read_literal(&mut self) -> Result<Value, String> {
        match self.chars.peek().copied() {
            Some(q @ ('\'' | '"')) => {
                self.chars.next();
                self.read_string(q)
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.read_number(),
            Some(')') | Some(',') => Err("expected a literal".into()),
            Some(c) => Err(format!("expected a string or number literal, found `{c}`")),
            None => Err("unclosed '('".into()),
        }
    }

    /// Read up to the closing `quote`.  `\\`, `\'`, `\"`, `\n` and `\t` are
    /// unescaped; any other backslash pair is kept as written so regex
    /// escapes like `\w` reach the `replace` filter intact.
    fn read_string(&mut self, quote: char) -> Result<Value, String> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                None => return Err("unterminated string literal".into()),
                Some('\\') => match self.chars.next() {
                    Some(c @ ('\\' | '\'' | '"')) => s.push(c),
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(c) => {
                        s.push('\\');
                        s.push(c);
                    }
                    None => return Err("unterminated string literal".into()),
                },
                Some(c) if c == quote => return Ok(Value::Str(s)),
                Some(c) => s.push(c),
            }
        }
    }

    fn read_number(&mut self) -> Result<Value, String> {
        let mut s = String::new();
        let mut is_float = false;

        if let Some(sign) = self.chars.next_if(|c| matches!(c, '-' | '+')) {
            s.push(sign);
        }
        while let Some(c) = self
            .chars
            .next_if(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E'))
        {
            if matches!(c, '.' | 'e' | 'E') {
                is_float = true;
            }
            s.push(c);
            if matches!(c, 'e' | 'E') {
                if let Some(sign) = self.chars.next_if(|c| matches!(c, '-' | '+')) {
                    s.push(sign);
                }
            }
        }

        let parsed = if is_float {
            s.parse::<f64>().ok().map(Value::Float)
        } else {
            s.parse::<i64>().ok().map(Value::Int)
        };
        parsed.ok_or_else(|| format!("invalid number `{s}`"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
