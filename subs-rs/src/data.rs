//! Data sources that placeholders resolve against.
//!
//! Anything implementing [`Data`] can back a render: standard maps, a closure
//! via [`data_fn`], or the process environment via [`Env`].  With the `json`
//! feature, `serde_json` objects work too.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use crate::value::Value;

/// Key → value lookup used by the evaluator.  Read-only.
pub trait Data {
    /// Look up `key`.  `None` renders as the empty string.
    fn lookup(&self, key: &str) -> Option<Value>;
}

impl<D: Data + ?Sized> Data for &D {
    fn lookup(&self, key: &str) -> Option<Value> {
        (**self).lookup(key)
    }
}

impl<K, V, S> Data for HashMap<K, V, S>
where
    K: Borrow<str> + Eq + Hash,
    V: Clone + Into<Value>,
    S: BuildHasher,
{
    fn lookup(&self, key: &str) -> Option<Value> {
        self.get(key).cloned().map(Into::into)
    }
}

impl<K, V> Data for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: Clone + Into<Value>,
{
    fn lookup(&self, key: &str) -> Option<Value> {
        self.get(key).cloned().map(Into::into)
    }
}

/// Data with no keys at all; every placeholder resolves empty.
impl Data for () {
    fn lookup(&self, _key: &str) -> Option<Value> {
        None
    }
}

// ── Closures ──────────────────────────────────────────────────────────────────

/// Adapter returned by [`data_fn`].
pub struct DataFn<F>(F);

impl<F> Data for DataFn<F>
where
    F: Fn(&str) -> Option<Value>,
{
    fn lookup(&self, key: &str) -> Option<Value> {
        (self.0)(key)
    }
}

/// Use a closure as a data source.
///
/// ```rust
/// use subs::{data_fn, render, RenderOptions, Value};
///
/// let data = data_fn(|k| (k == "name").then(|| Value::from("World")));
/// let out = render("Hello, ${name}!", &data, &RenderOptions::default()).unwrap();
/// assert_eq!(out, "Hello, World!");
/// ```
pub fn data_fn<F>(f: F) -> DataFn<F>
where
    F: Fn(&str) -> Option<Value>,
{
    DataFn(f)
}

// ── Environment ───────────────────────────────────────────────────────────────

/// The process environment as a data source: `${HOME}`, `${LANG | lower}`.
///
/// Variables are read at lookup time; unset or non-UTF-8 variables resolve
/// empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct Env;

impl Data for Env {
    fn lookup(&self, key: &str) -> Option<Value> {
        if key.is_empty() || key.contains(['=', '\0']) {
            return None;
        }
        std::env::var(key).ok().map(Value::Str)
    }
}

// ── JSON ──────────────────────────────────────────────────────────────────────

#[cfg(feature = "json")]
mod json {
    use serde_json::{Map, Value as Json};

    use super::Data;
    use crate::value::Value;

    fn scalar(v: &Json) -> Option<Value> {
        match v {
            Json::Null => None,
            Json::Bool(b) => Some(Value::Bool(*b)),
            Json::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float)),
            Json::String(s) => Some(Value::Str(s.clone())),
            // Compound values render as compact JSON.
            other => Some(Value::Str(other.to_string())),
        }
    }

    impl Data for Map<String, Json> {
        fn lookup(&self, key: &str) -> Option<Value> {
            self.get(key).and_then(scalar)
        }
    }

    /// Objects look up by key; any other JSON value has no keys.
    impl Data for Json {
        fn lookup(&self, key: &str) -> Option<Value> {
            self.as_object().and_then(|m| m.lookup(key))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashmap_lookup() {
        let mut m = HashMap::new();
        m.insert("name", "eva");
        assert_eq!(m.lookup("name"), Some(Value::Str("eva".into())));
        assert_eq!(m.lookup("missing"), None);
    }

    #[test]
    fn owned_keys_and_numeric_values() {
        let mut m: BTreeMap<String, i64> = BTreeMap::new();
        m.insert("n".to_owned(), 3);
        assert_eq!(m.lookup("n"), Some(Value::Int(3)));
    }

    #[test]
    fn value_maps() {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("x".into(), Value::Float(1.5));
        assert_eq!(m.lookup("x"), Some(Value::Float(1.5)));
    }

    #[test]
    fn unit_is_empty() {
        assert_eq!(().lookup("anything"), None);
    }

    #[test]
    fn closure_source() {
        let d = data_fn(|k| if k == "a" { Some(Value::Int(1)) } else { None });
        assert_eq!(d.lookup("a"), Some(Value::Int(1)));
        assert_eq!(d.lookup("b"), None);
    }

    #[test]
    fn env_rejects_bad_names() {
        assert_eq!(Env.lookup(""), None);
        assert_eq!(Env.lookup("A=B"), None);
    }

    #[test]
    fn env_reads_variables() {
        std::env::set_var("SUBS_DATA_ENV_TEST", "yes");
        assert_eq!(Env.lookup("SUBS_DATA_ENV_TEST"), Some(Value::Str("yes".into())));
        assert_eq!(Env.lookup("SUBS_DATA_ENV_TEST_UNSET"), None);
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_object_lookup() {
        let v = serde_json::json!({
            "name": "eva",
            "age": 7,
            "ratio": 0.5,
            "ok": true,
            "none": null,
            "tags": ["a", "b"],
        });
        assert_eq!(v.lookup("name"), Some(Value::Str("eva".into())));
        assert_eq!(v.lookup("age"), Some(Value::Int(7)));
        assert_eq!(v.lookup("ratio"), Some(Value::Float(0.5)));
        assert_eq!(v.lookup("ok"), Some(Value::Bool(true)));
        assert_eq!(v.lookup("none"), None);
        assert_eq!(v.lookup("tags"), Some(Value::Str(r#"["a","b"]"#.into())));
        assert_eq!(serde_json::json!([1, 2]).lookup("0"), None);
    }
}
