//! Built-in filters.
//!
//! Each filter receives the current value of the chain plus its own literal
//! arguments, and returns the next value.  The current value is always read
//! through its string form, so an absent key (which resolves to `""`) is
//! handled the same as an empty string.
//!
//! | Filter | Example | Result for `"O'Neal"` / `"Tjatse"` |
//! |--------|---------|------------------------------------|
//! | `esc` | `${ v \| esc }` | `O\'Neal` |
//! | `capitalize` | `${ v \| capitalize }` | `Tjatse` |
//! | `upper` | `${ v \| upper }` | `TJATSE` |
//! | `lower` | `${ v \| lower }` | `tjatse` |
//! | `def` | `${ v \| def('x') }` | `Tjatse` (`x` when empty) |
//! | `replace` | `${ v \| replace('^T', 't') }` | `tjatse` |
//! | `substr` | `${ v \| substr(0, 2) }` | `Tj` |

use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

use aho_corasick::AhoCorasick;
use regex::{Captures, NoExpand, Regex, RegexBuilder};
use tracing::trace;

use crate::error::FilterError;
use crate::value::Value;

/// Signature shared by every built-in.
pub type BuiltinFn = fn(&Value, &[Value]) -> Result<Value, FilterError>;

/// Names of all built-in filters, in documentation order.
pub const BUILTIN_NAMES: &[&str] = &[
    "esc",
    "capitalize",
    "upper",
    "lower",
    "def",
    "replace",
    "substr",
];

/// Look up a built-in filter by name.
pub fn builtin(name: &str) -> Option<BuiltinFn> {
    let f: BuiltinFn = match name {
        "esc" => esc,
        "capitalize" => capitalize,
        "upper" => upper,
        "lower" => lower,
        "def" => def,
        "replace" => replace,
        "substr" => substr,
        _ => return None,
    };
    Some(f)
}

// ── String case ───────────────────────────────────────────────────────────────

static ESCAPES: LazyLock<AhoCorasick> = LazyLock::new(|| AhoCorasick::new(["\\", "'", "\""]));

fn esc(value: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let s = value.as_str();
    Ok(Value::Str(ESCAPES.replace_all(&s, &["\\\\", "\\'", "\\\""])))
}

fn capitalize(value: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let s = value.as_str();
    let mut chars = s.chars();
    let out = match chars.next() {
        Some(first) => {
            let mut out: String = first.to_uppercase().collect();
            out.push_str(&chars.as_str().to_lowercase());
            out
        }
        None => String::new(),
    };
    Ok(Value::Str(out))
}

fn upper(value: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(Value::Str(value.as_str().to_uppercase()))
}

fn lower(value: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(Value::Str(value.as_str().to_lowercase()))
}

// ── Defaults ──────────────────────────────────────────────────────────────────

fn def(value: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let fallback = get_arg(args, 0, "def")?;
    if value.is_empty() {
        Ok(fallback.clone())
    } else {
        Ok(value.clone())
    }
}

// ── Regex replace ─────────────────────────────────────────────────────────────

/// Compiled patterns keyed by `(pattern, flags)`, without the `g` flag.
static REGEX_CACHE: LazyLock<RwLock<HashMap<(String, String), Regex>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Entries kept before the cache is flushed.
const REGEX_CACHE_LIMIT: usize = 256;

/// `replace(pattern, replacement[, flags])`.
///
/// Flags follow the familiar single-letter set: `g` replaces every match
/// (only the first otherwise), `i`, `m` and `s` toggle case-insensitivity,
/// multi-line anchors and dot-matches-newline.  `u` is accepted and ignored
/// since patterns are always Unicode-aware.  Omitted or empty flags mean `g`.
///
/// The replacement understands `$1`..`$99`, `$&` (whole match), `` $` ``
/// (text before the match), `$'` (text after it) and `$$`.  Any other `$`
/// is literal.
fn replace(value: &Value, args: &[Value]) -> Result<Value, FilterError> {
    const NAME: &str = "replace";

    let pattern = get_arg(args, 0, NAME)?.as_str();
    let replacement = get_arg(args, 1, NAME)?.as_str();
    let flags = args
        .get(2)
        .map(Value::as_str)
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| "g".to_owned());

    let mut global = false;
    let mut key_flags = String::new();
    for flag in flags.chars() {
        match flag {
            'g' => global = true,
            'i' | 'm' | 's' => {
                if !key_flags.contains(flag) {
                    key_flags.push(flag);
                }
            }
            'u' => {}
            other => {
                return Err(FilterError::UnsupportedFlag {
                    filter: NAME.to_owned(),
                    flag: other,
                })
            }
        }
    }
    let re = cached_regex(&pattern, &key_flags)?;

    let haystack = value.as_str();
    let limit = if global { 0 } else { 1 };
    let out = if replacement.contains('$') {
        re.replacen(&haystack, limit, |caps: &Captures<'_>| {
            let mut dst = String::new();
            expand_replacement(&replacement, caps, &haystack, &mut dst);
            dst
        })
    } else {
        re.replacen(&haystack, limit, NoExpand(&replacement))
    };
    Ok(Value::Str(out.into_owned()))
}

fn cached_regex(pattern: &str, flags: &str) -> Result<Regex, FilterError> {
    let key = (pattern.to_owned(), flags.to_owned());
    if let Some(re) = REGEX_CACHE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(re.clone());
    }

    let re = RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|source| FilterError::InvalidRegex {
            filter: "replace".to_owned(),
            source,
        })?;

    let mut cache = REGEX_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    if cache.len() >= REGEX_CACHE_LIMIT {
        trace!(entries = cache.len(), "flushing regex cache");
        cache.clear();
    }
    cache.insert(key, re.clone());
    Ok(re)
}

/// Append `replacement` to `dst`, substituting `$` tokens for the match in
/// `caps`.  Group references that name no group stay literal; groups that
/// did not take part in the match expand to nothing.
fn expand_replacement(replacement: &str, caps: &Captures<'_>, haystack: &str, dst: &mut String) {
    let whole = caps.get(0).map_or(0..0, |m| m.range());
    let group = |n: usize| caps.get(n).map_or("", |m| m.as_str());
    let valid = |n: usize| (1..caps.len()).contains(&n);

    let mut rest = replacement;
    while let Some(i) = rest.find('$') {
        dst.push_str(&rest[..i]);
        rest = &rest[i + 1..];
        let bytes = rest.as_bytes();
        let used = match bytes.first() {
            Some(b'$') => {
                dst.push('$');
                1
            }
            Some(b'&') => {
                dst.push_str(&haystack[whole.clone()]);
                1
            }
            Some(b'`') => {
                dst.push_str(&haystack[..whole.start]);
                1
            }
            Some(b'\'') => {
                dst.push_str(&haystack[whole.end..]);
                1
            }
            Some(&d) if d.is_ascii_digit() => {
                let one = usize::from(d - b'0');
                let two = bytes
                    .get(1)
                    .filter(|b| b.is_ascii_digit())
                    .map(|&b| one * 10 + usize::from(b - b'0'));
                match two.filter(|&n| valid(n)) {
                    Some(n) => {
                        dst.push_str(group(n));
                        2
                    }
                    None if valid(one) => {
                        dst.push_str(group(one));
                        1
                    }
                    None => {
                        dst.push('$');
                        0
                    }
                }
            }
            _ => {
                dst.push('$');
                0
            }
        };
        rest = &rest[used..];
    }
    dst.push_str(rest);
}

// ── Substring ─────────────────────────────────────────────────────────────────

/// `substr(start[, length])`, counted in characters.
///
/// A negative `start` counts back from the end and stops at 0; a `start`
/// past the end yields `""`.  An omitted length runs to the end, a length
/// of zero or less yields `""`, and the end is clamped to the string length.
fn substr(value: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let s = value.as_str();
    let start = get_arg(args, 0, "substr")?.as_int();
    let len = s.chars().count() as i64;

    let start = if start < 0 { (len + start).max(0) } else { start.min(len) };
    let end = match args.get(1) {
        Some(n) => start.saturating_add(n.as_int().max(0)).min(len),
        None => len,
    };

    Ok(Value::Str(
        s.chars()
            .skip(start as usize)
            .take((end - start) as usize)
            .collect(),
    ))
}

// ── Argument accessors ────────────────────────────────────────────────────────

fn get_arg<'a>(args: &'a [Value], idx: usize, name: &str) -> Result<&'a Value, FilterError> {
    args.get(idx).ok_or_else(|| FilterError::MissingArgument {
        filter: name.to_owned(),
        index: idx,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
