use std::collections::HashMap;

use proptest::prelude::*;
use subs::builtins::builtin;
use subs::{render, RenderOptions, Template, Value};

fn opts() -> RenderOptions {
    RenderOptions::default()
}

proptest! {
    /// Text without `$` can never contain a placeholder, so it renders as-is
    /// whatever the data.
    #[test]
    fn no_placeholder_is_identity(s in "[^$]*", v in "\\PC*") {
        let data = HashMap::from([("x", v)]);
        prop_assert_eq!(render(&s, &data, &opts()).unwrap(), s);
    }
}

proptest! {
    /// A bare key substitutes the value verbatim, with surrounding text intact.
    #[test]
    fn bare_key_substitutes_verbatim(
        pre in "[^$]*",
        post in "[^$]*",
        v in "\\PC*",
    ) {
        let data = HashMap::from([("key", v.clone())]);
        let out = render(&format!("{pre}${{ key }}{post}"), &data, &opts()).unwrap();
        prop_assert_eq!(out, format!("{pre}{v}{post}"));
    }
}

proptest! {
    /// Missing keys always resolve to the empty string.
    #[test]
    fn missing_key_is_empty(key in "[a-z_][a-z0-9_]{0,12}") {
        let data: HashMap<&str, &str> = HashMap::new();
        let out = render(&format!("[${{{key}}}]"), &data, &opts()).unwrap();
        prop_assert_eq!(out, "[]");
    }
}

proptest! {
    /// Compiling never panics on arbitrary input; it returns Ok or Err.
    #[test]
    fn compile_does_not_panic(s in "\\PC*") {
        let _ = Template::parse(&s);
    }
}

proptest! {
    /// upper|lower and lower alone agree on ASCII input.
    #[test]
    fn upper_then_lower_is_lower(v in "[ -~]*") {
        let data = HashMap::from([("x", v)]);
        let chained = render("${x|upper|lower}", &data, &opts()).unwrap();
        let single = render("${x|lower}", &data, &opts()).unwrap();
        prop_assert_eq!(chained, single);
    }
}

proptest! {
    /// substr: result is a contiguous run of the input and never longer.
    #[test]
    fn substr_properties(s in "\\PC*", start in -100i64..100i64, len in -10i64..100i64) {
        let f = builtin("substr").unwrap();
        let out = f(&Value::Str(s.clone()), &[Value::Int(start), Value::Int(len)])
            .unwrap()
            .as_str();
        prop_assert!(out.chars().count() <= s.chars().count());
        prop_assert!(s.contains(&out));
        if len <= 0 {
            prop_assert_eq!(out, "");
        }
    }
}

proptest! {
    /// esc output never contains an unescaped quote.
    #[test]
    fn esc_escapes_every_quote(s in "\\PC*") {
        let f = builtin("esc").unwrap();
        let out = f(&Value::Str(s), &[]).unwrap().as_str();
        let mut chars = out.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => { prop_assert!(matches!(chars.next(), Some('\\' | '\'' | '"'))); }
                '\'' | '"' => { prop_assert!(false, "bare quote in {:?}", out); }
                _ => {}
            }
        }
    }
}
