//! Filter registry.
//!
//! A [`FilterRegistry`] maps filter names to [`FilterFn`]s.  There is one
//! process-wide registry, created lazily with the built-ins on first use and
//! extended through [`register_filter`]; entries are never removed.  Built-in
//! names are reserved in every registry created by
//! [`FilterRegistry::with_builtins`].  Custom names are last-write-wins.
//!
//! Call-scoped overrides live in [`Filters`], which may shadow any name
//! (built-ins included) without touching a registry.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::builtins::{builtin, BUILTIN_NAMES};
use crate::error::{FilterError, RegistryError};
use crate::value::Value;

/// A shareable filter function: `(current value, literal args) -> next value`.
pub type FilterFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, FilterError> + Send + Sync>;

/// Wrap a closure as a [`FilterFn`].
pub fn filter_fn<F>(f: F) -> FilterFn
where
    F: Fn(&Value, &[Value]) -> Result<Value, FilterError> + Send + Sync + 'static,
{
    Arc::new(f)
}

// ── FilterRegistry ────────────────────────────────────────────────────────────

/// Named filters plus the set of names that may not be replaced.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
    reserve_builtins: bool,
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl FilterRegistry {
    /// An empty registry, without even the built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with every built-in filter.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        for &name in BUILTIN_NAMES {
            if let Some(f) = builtin(name) {
                reg.filters.insert(name.to_owned(), Arc::new(f));
            }
        }
        reg.reserve_builtins = true;
        reg
    }

    /// Add or replace a custom filter.
    ///
    /// Fails if `name` is not an identifier, or if it names a built-in and
    /// this registry was created with [`with_builtins`](Self::with_builtins).
    pub fn register(&mut self, name: &str, f: FilterFn) -> Result<(), RegistryError> {
        if !is_filter_name(name) {
            return Err(RegistryError::InvalidName(name.to_owned()));
        }
        if self.reserve_builtins && builtin(name).is_some() {
            return Err(RegistryError::BuiltinOverride(name.to_owned()));
        }
        if self.filters.insert(name.to_owned(), f).is_some() {
            warn!(filter = name, "replacing previously registered filter");
        } else {
            debug!(filter = name, "registered filter");
        }
        Ok(())
    }

    /// Look up a filter by name.
    pub fn get(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

// ── Process-wide registry ─────────────────────────────────────────────────────

static GLOBAL: LazyLock<RwLock<FilterRegistry>> =
    LazyLock::new(|| RwLock::new(FilterRegistry::with_builtins()));

/// Register a filter in the process-wide registry.
///
/// The filter is visible to every later render in the process, including
/// templates compiled before the call.  Registering an existing custom name
/// replaces it; built-in names are rejected.
///
/// ```rust
/// use subs::{filter_fn, register_filter, render, RenderOptions, Value};
///
/// register_filter("shout", filter_fn(|v, _| Ok(Value::Str(format!("{v}!"))))).unwrap();
/// let data = [("name", "eva")].into_iter().collect::<std::collections::HashMap<_, _>>();
/// let out = render("${ name | upper | shout }", &data, &RenderOptions::default()).unwrap();
/// assert_eq!(out, "EVA!");
/// ```
pub fn register_filter(name: &str, f: FilterFn) -> Result<(), RegistryError> {
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, f)
}

/// Look up a filter in the process-wide registry.
///
/// The read lock is released before returning, so a filter may itself render
/// templates.
pub fn global_filter(name: &str) -> Option<FilterFn> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
}

// ── Filters ───────────────────────────────────────────────────────────────────

/// Call-scoped filters that shadow the registry by name.
#[derive(Clone, Default)]
pub struct Filters {
    map: BTreeMap<String, FilterFn>,
}

impl fmt::Debug for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.keys()).finish()
    }
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter, replacing any previous one of the same name.
    pub fn insert(&mut self, name: impl Into<String>, f: FilterFn) -> &mut Self {
        self.map.insert(name.into(), f);
        self
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, FilterError> + Send + Sync + 'static,
    {
        self.map.insert(name.into(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FilterFn> {
        self.map.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// `true` if `name` is usable as a filter name inside a placeholder.
pub(crate) fn is_filter_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if is_ident_start(c)) && chars.all(is_ident_continue)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
