/// Behavioural tests: the substitution cases a `subs` user relies on, grouped
/// the way they are documented (basic usage, each built-in filter, chaining,
/// custom filters, custom delimiters).
///
/// Every case renders through the public API only.

use std::collections::HashMap;

use subs::{
    filter_fn, register_filter, render, Delimiter, Env, Filters, RegistryError, RenderError,
    RenderOptions, Template, Value,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn data(pairs: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
    pairs.iter().copied().collect()
}

fn subs(template: &str, pairs: &[(&'static str, &'static str)]) -> String {
    render(template, &data(pairs), &RenderOptions::default())
        .unwrap_or_else(|e| panic!("render {template:?} failed: {e}"))
}

/// Capitalise every space-separated word.
fn upper_first(v: &Value, _: &[Value]) -> Result<Value, subs::FilterError> {
    let words: Vec<String> = v
        .as_str()
        .split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.as_str().to_lowercase().chars())
                    .collect(),
                None => String::new(),
            }
        })
        .collect();
    Ok(Value::Str(words.join(" ")))
}

// ── Basic usage ───────────────────────────────────────────────────────────────

#[test]
fn invalid_text_substitutes_nothing() {
    assert_eq!(subs("hi, ${ name", &[("name", "tjatse")]), "hi, ${ name");
}

#[test]
fn without_filter_single() {
    assert_eq!(subs("hi, ${ name }", &[("name", "tjatse")]), "hi, tjatse");
}

#[test]
fn without_filter_multiple() {
    assert_eq!(
        subs(
            "hi, ${ name }, I am ${ whoami }",
            &[("name", "eva"), ("whoami", "tjatse")]
        ),
        "hi, eva, I am tjatse"
    );
}

#[test]
fn leading_and_trailing_text_kept() {
    assert_eq!(subs("[${a}]", &[("a", "x")]), "[x]");
    assert_eq!(subs("${a}", &[("a", "x")]), "x");
    assert_eq!(subs("${a}.", &[("a", "x")]), "x.");
}

#[test]
fn missing_key_is_empty() {
    assert_eq!(subs("hi, ${name}", &[]), "hi, ");
}

// ── Built-in filters ──────────────────────────────────────────────────────────

#[test]
fn def_uses_fallback_when_missing() {
    assert_eq!(subs(r#"hi, ${ name | def("eva") }"#, &[("name1", "tjatse")]), "hi, eva");
}

#[test]
fn def_keeps_present_value() {
    assert_eq!(subs("${x|def('Y')}", &[("x", "Z")]), "Z");
    assert_eq!(subs("${x|def('Y')}", &[("x", "")]), "Y");
}

#[test]
fn esc_backslash_escapes() {
    assert_eq!(subs("hi, ${ name | esc }", &[("name", "O'Neal")]), "hi, O\\'Neal");
}

#[test]
fn upper() {
    assert_eq!(subs("hi, ${ name | upper }", &[("name", "tjatse")]), "hi, TJATSE");
}

#[test]
fn lower() {
    assert_eq!(subs("hi, ${ name | lower }", &[("name", "TJATSE")]), "hi, tjatse");
}

#[test]
fn capitalize() {
    assert_eq!(subs("hi, ${ name | capitalize }", &[("name", "TJATSE")]), "hi, Tjatse");
}

#[test]
fn substr() {
    assert_eq!(subs("hi, ${ name | substr(0, 2) }", &[("name", "Tjatse")]), "hi, Tj");
}

#[test]
fn replace_string() {
    assert_eq!(
        subs(r#"hi, ${ name | replace("Chinese", "China") }"#, &[("name", "Chinese")]),
        "hi, China"
    );
}

#[test]
fn replace_regex() {
    assert_eq!(
        subs(r#"hi, ${ name | replace("^\w+-", "", "ig") }"#, &[("name", "China-Beijing")]),
        "hi, Beijing"
    );
}

#[test]
fn replace_backreferences() {
    assert_eq!(subs("${x|replace('(a)', '$1_x')}", &[("x", "ab")]), "a_xb");
    assert_eq!(subs("${x|replace('a', '[$&]')}", &[("x", "ab")]), "[a]b");
}

#[test]
fn replace_empty_flags_replace_all() {
    assert_eq!(subs("${x|replace('-', '+', '')}", &[("x", "a-b-c")]), "a+b+c");
}

#[test]
fn filters_tolerate_missing_values() {
    for f in ["esc", "capitalize", "upper", "lower", "substr(1)", "replace('a', 'b')"] {
        assert_eq!(subs(&format!("<${{ nope | {f} }}>"), &[]), "<>", "{f}");
    }
}

// ── Chaining ──────────────────────────────────────────────────────────────────

#[test]
fn chainable() {
    assert_eq!(
        subs(
            r#"hi, ${ name | def("China-Beijing") | upper | lower | capitalize | substr(3) | replace("^\w+-", "", "ig") }"#,
            &[]
        ),
        "hi, beijing"
    );
}

#[test]
fn chain_order_is_significant() {
    assert_eq!(subs("${x|upper|lower}", &[("x", "Ab")]), "ab");
    assert_eq!(subs("${x|lower|upper}", &[("x", "Ab")]), "AB");
}

// ── Custom filters ────────────────────────────────────────────────────────────

#[test]
fn custom_registered_filter_is_reused() {
    register_filter("upperFirst", filter_fn(upper_first)).unwrap();

    assert_eq!(
        subs("hi, ${ name | upperFirst }", &[("name", "jimmy brandon")]),
        "hi, Jimmy Brandon"
    );
    assert_eq!(
        subs("hi, ${ name | upperFirst }", &[("name", "tony misky")]),
        "hi, Tony Misky"
    );
    // Composes with built-ins.
    assert_eq!(
        subs("${ name | def('ann lee') | upperFirst | esc }", &[]),
        "Ann Lee"
    );
}

#[test]
fn template_compiled_before_registration_sees_filter() {
    let tpl = Template::parse("${ x | laterRegistered }").unwrap();
    assert!(matches!(
        tpl.render(&data(&[("x", "a")])),
        Err(RenderError::UnknownFilter { .. })
    ));
    register_filter(
        "laterRegistered",
        filter_fn(|v, _| Ok(Value::Str(format!("<{v}>")))),
    )
    .unwrap();
    assert_eq!(tpl.render(&data(&[("x", "a")])).unwrap(), "<a>");
}

#[test]
fn registering_builtin_name_is_rejected() {
    assert_eq!(
        register_filter("upper", filter_fn(upper_first)),
        Err(RegistryError::BuiltinOverride("upper".into()))
    );
    assert_eq!(
        register_filter("", filter_fn(upper_first)),
        Err(RegistryError::InvalidName(String::new()))
    );
}

#[test]
fn option_filter_is_call_scoped() {
    let opts = RenderOptions::default().with_filter("first", |v, _| {
        Ok(Value::Str(v.as_str().chars().take(1).collect()))
    });
    let out = render("hi, ${ name | first }", &data(&[("name", "Tjatse")]), &opts).unwrap();
    assert_eq!(out, "hi, T");

    let err = render(
        "hi, ${ name | first }",
        &data(&[("name", "Michael")]),
        &RenderOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RenderError::UnknownFilter { ref name, position: 4 } if name == "first"));
}

#[test]
fn render_with_per_call_filters() {
    let tpl = Template::parse("${ name | first }").unwrap();
    let filters = Filters::new().with("first", |v, _| {
        Ok(Value::Str(v.as_str().chars().take(1).collect()))
    });
    assert_eq!(tpl.render_with(&data(&[("name", "Michael")]), &filters).unwrap(), "M");
    assert!(tpl.render(&data(&[("name", "Michael")])).is_err());
}

#[test]
fn unknown_filter_produces_no_output() {
    let err = render("ok ${a} then ${b | nope}", &data(&[("a", "1")]), &RenderOptions::default());
    match err {
        Err(RenderError::UnknownFilter { name, position }) => {
            assert_eq!(name, "nope");
            assert_eq!(position, 13);
        }
        other => panic!("expected UnknownFilter, got {other:?}"),
    }
}

// ── Custom delimiters ─────────────────────────────────────────────────────────

#[test]
fn double_brace_delimiter() {
    let opts = RenderOptions::default()
        .with_delimiter(Delimiter::new(r"\{\{([^\{\}]+)\}\}").unwrap());
    let out = render("hi, {{ name | capitalize }}", &data(&[("name", "tjatse")]), &opts).unwrap();
    assert_eq!(out, "hi, Tjatse");
}

#[test]
fn erb_style_delimiter() {
    let opts = RenderOptions::default().with_delimiter(Delimiter::pair("<%=", "%>").unwrap());
    let out = render("hello, <%= who | upper %>!", &data(&[("who", "you")]), &opts).unwrap();
    assert_eq!(out, "hello, YOU!");
}

#[test]
fn delimiter_without_group_is_rejected() {
    let err = Delimiter::new(r"\{\{[^}]+\}\}").unwrap_err();
    assert!(matches!(err, RenderError::InvalidDelimiterPattern { .. }));
}

// ── Data sources ──────────────────────────────────────────────────────────────

#[test]
fn environment_data() {
    std::env::set_var("SUBS_COMPAT_LOGNAME", "tjatse");
    let out = render(
        "hello, ${ SUBS_COMPAT_LOGNAME | upper | lower | substr(0, 3) | replace('t', 'T') }!",
        &Env,
        &RenderOptions::default(),
    )
    .unwrap();
    assert_eq!(out, "hello, Tja!");
}
