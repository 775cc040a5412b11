//! Template compilation and rendering.
//!
//! A template is scanned once for placeholders matching its [`Delimiter`];
//! each placeholder is parsed into an [`Expression`] and the source is kept
//! as alternating literal and placeholder segments.  Rendering walks the
//! segments left to right, resolving keys and folding each filter chain over
//! the resolved value.  Output is accumulated privately and only returned
//! once every placeholder has rendered.

use std::fmt;
use std::ops::Range;

use regex::Regex;
use tracing::{debug, trace};

use crate::data::Data;
use crate::error::{FilterError, RenderError};
use crate::parse::{parse_expression, Expression};
use crate::registry::{global_filter, FilterFn, FilterRegistry, Filters};
use crate::value::Value;

/// Default placeholder pattern: `${ … }` with no braces inside.
pub const DEFAULT_DELIMITER: &str = r"\$\{([^{}]+)\}";

// ── Delimiter ─────────────────────────────────────────────────────────────────

/// A compiled placeholder pattern whose first capture group is the inner
/// content of a placeholder.
#[derive(Clone)]
pub struct Delimiter {
    re: Regex,
}

impl fmt::Debug for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Delimiter").field(&self.re.as_str()).finish()
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self {
            re: Regex::new(DEFAULT_DELIMITER).expect("default delimiter pattern is valid"),
        }
    }
}

impl Delimiter {
    /// Compile `pattern`.  Fails if it is not a valid regex or has no
    /// capture group.
    pub fn new(pattern: &str) -> Result<Self, RenderError> {
        let re = Regex::new(pattern).map_err(|e| RenderError::InvalidDelimiterPattern {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;
        Self::from_regex(re)
    }

    /// Wrap an already compiled regex.
    pub fn from_regex(re: Regex) -> Result<Self, RenderError> {
        // captures_len counts the implicit whole-match group.
        if re.captures_len() < 2 {
            return Err(RenderError::InvalidDelimiterPattern {
                pattern: re.as_str().to_owned(),
                reason: "pattern has no capture group for the placeholder content".into(),
            });
        }
        Ok(Self { re })
    }

    /// Placeholders opened by `open` and closed by `close`, e.g.
    /// `Delimiter::pair("{{", "}}")`.  The content may not contain braces.
    pub fn pair(open: &str, close: &str) -> Result<Self, RenderError> {
        Self::new(&format!(
            "{}([^{{}}]+){}",
            regex::escape(open),
            regex::escape(close)
        ))
    }

    pub fn as_str(&self) -> &str {
        self.re.as_str()
    }

    fn is_match(&self, text: &str) -> bool {
        self.re.is_match(text)
    }
}

// ── RenderOptions ─────────────────────────────────────────────────────────────

/// Per-template configuration.
///
/// ```rust
/// use subs::{Delimiter, RenderOptions, Value};
///
/// let opts = RenderOptions::default()
///     .with_delimiter(Delimiter::pair("{{", "}}").unwrap())
///     .with_filter("first", |v, _| Ok(Value::Str(v.as_str().chars().take(1).collect())));
/// let data = std::collections::HashMap::from([("name", "Tjatse")]);
/// assert_eq!(subs::render("{{ name | first }}", &data, &opts).unwrap(), "T");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub delimiter: Delimiter,
    /// Filters that shadow the registry for templates compiled with these
    /// options.  Never written back to the registry.
    pub filters: Filters,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_filter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, FilterError> + Send + Sync + 'static,
    {
        self.filters = self.filters.with(name, f);
        self
    }
}

// ── Template ──────────────────────────────────────────────────────────────────

/// A located placeholder within a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    /// Byte offset of the opening delimiter.
    pub start: usize,
    /// Byte offset just past the closing delimiter.
    pub end: usize,
    /// Inner content as written, before parsing.
    pub raw: String,
    pub expression: Expression,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(Range<usize>),
    Placeholder(Placeholder),
}

/// A parsed template, reusable across renders.
///
/// Compiling is the partial application of [`render`]: do it once, then
/// call [`Template::render`] with different data.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
    filters: Filters,
}

impl Template {
    /// Compile with the default `${ … }` delimiter and no extra filters.
    pub fn parse(source: &str) -> Result<Self, RenderError> {
        Self::compile(source, &RenderOptions::default())
    }

    /// Compile `source` using `options`.
    ///
    /// Filter names are not checked here: the registry may still grow
    /// before the first render.
    pub fn compile(source: &str, options: &RenderOptions) -> Result<Self, RenderError> {
        let filters = options.filters.clone();

        if !options.delimiter.is_match(source) {
            debug!(len = source.len(), "no placeholders; template is static");
            return Ok(Self {
                source: source.to_owned(),
                segments: Vec::new(),
                filters,
            });
        }

        let mut segments = Vec::new();
        let mut offset = 0;
        for caps in options.delimiter.re.captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

            if whole.start() > offset {
                segments.push(Segment::Literal(offset..whole.start()));
            }
            segments.push(Segment::Placeholder(Placeholder {
                start: whole.start(),
                end: whole.end(),
                raw: raw.to_owned(),
                expression: parse_expression(raw, whole.start())?,
            }));
            offset = whole.end();
        }
        if offset < source.len() {
            segments.push(Segment::Literal(offset..source.len()));
        }

        let tpl = Self {
            source: source.to_owned(),
            segments,
            filters,
        };
        debug!(placeholders = tpl.placeholders().count(), "compiled template");
        Ok(tpl)
    }

    /// The original template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// `true` when the template contains no placeholders and always renders
    /// as its source.
    pub fn is_static(&self) -> bool {
        self.segments.is_empty()
    }

    /// Placeholders in source order.
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.segments.iter().filter_map(|seg| match seg {
            Segment::Placeholder(p) => Some(p),
            Segment::Literal(_) => None,
        })
    }

    /// Render against `data`, resolving filters through the compile-time
    /// options and then the process-wide registry.
    pub fn render<D: Data + ?Sized>(&self, data: &D) -> Result<String, RenderError> {
        self.render_impl(data, None, None)
    }

    /// Like [`render`](Self::render), with `filters` shadowing everything
    /// else for this call only.
    pub fn render_with<D: Data + ?Sized>(
        &self,
        data: &D,
        filters: &Filters,
    ) -> Result<String, RenderError> {
        self.render_impl(data, Some(filters), None)
    }

    /// Render using `registry` in place of the process-wide registry.
    pub fn render_in<D: Data + ?Sized>(
        &self,
        data: &D,
        registry: &FilterRegistry,
    ) -> Result<String, RenderError> {
        self.render_impl(data, None, Some(registry))
    }

    fn render_impl<D: Data + ?Sized>(
        &self,
        data: &D,
        call_filters: Option<&Filters>,
        registry: Option<&FilterRegistry>,
    ) -> Result<String, RenderError> {
        if self.is_static() {
            return Ok(self.source.clone());
        }

        let mut out = String::with_capacity(self.source.len());
        for seg in &self.segments {
            match seg {
                Segment::Literal(range) => out.push_str(&self.source[range.clone()]),
                Segment::Placeholder(p) => {
                    let value = self.evaluate(p, data, call_filters, registry)?;
                    out.push_str(&value.as_str());
                }
            }
        }
        Ok(out)
    }

    fn evaluate<D: Data + ?Sized>(
        &self,
        p: &Placeholder,
        data: &D,
        call_filters: Option<&Filters>,
        registry: Option<&FilterRegistry>,
    ) -> Result<Value, RenderError> {
        let expr = &p.expression;
        let initial = data.lookup(&expr.key).unwrap_or_default();

        expr.filters.iter().try_fold(initial, |value, call| {
            let f = self
                .resolve(&call.name, call_filters, registry)
                .ok_or_else(|| RenderError::UnknownFilter {
                    name: call.name.clone(),
                    position: p.start,
                })?;
            trace!(filter = %call.name, key = %expr.key, "applying filter");
            f(&value, &call.args).map_err(|source| RenderError::Filter {
                name: call.name.clone(),
                position: p.start,
                source,
            })
        })
    }

    fn resolve(
        &self,
        name: &str,
        call_filters: Option<&Filters>,
        registry: Option<&FilterRegistry>,
    ) -> Option<FilterFn> {
        call_filters
            .and_then(|fs| fs.get(name))
            .or_else(|| self.filters.get(name))
            .cloned()
            .or_else(|| match registry {
                Some(reg) => reg.get(name),
                None => global_filter(name),
            })
    }
}

/// Compile `template` with `options` and render it against `data`.
///
/// ```rust
/// use std::collections::HashMap;
///
/// let data = HashMap::from([("name", "tjatse")]);
/// let out = subs::render("hi, ${ name | capitalize }", &data, &Default::default()).unwrap();
/// assert_eq!(out, "hi, Tjatse");
/// ```
pub fn render<D: Data + ?Sized>(
    template: &str,
    data: &D,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    Template::compile(template, options)?.render(data)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
