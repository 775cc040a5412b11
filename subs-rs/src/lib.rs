//! Placeholder substitution with chainable filters.
//!
//! A template is plain text with `${ … }` placeholders.  Each placeholder
//! names a data key, optionally followed by a pipeline of filters applied
//! left to right:
//!
//! | Placeholder | Meaning |
//! |-------------|---------|
//! | `${ name }` | value of `name`, or `""` if absent |
//! | `${ name \| upper }` | `name`, uppercased |
//! | `${ name \| def("eva") \| capitalize }` | `name` or `eva`, capitalized |
//! | `${ name \| substr(0, 3) }` | first three characters |
//! | `${ name \| replace('^\w+-', '', 'ig') }` | regex replace |
//!
//! Built-in filters are `esc`, `capitalize`, `upper`, `lower`, `def`,
//! `replace` and `substr` (see [`builtins`]).  More can be added for the
//! whole process with [`register_filter`], for one template through
//! [`RenderOptions::with_filter`], or for one render through
//! [`Template::render_with`].
//!
//! # Quick start
//!
//! ```rust
//! use std::collections::HashMap;
//! use subs::{render, RenderOptions, Template};
//!
//! let data = HashMap::from([("name", "tjatse")]);
//! let out = render("hi, ${ name | capitalize }", &data, &RenderOptions::default()).unwrap();
//! assert_eq!(out, "hi, Tjatse");
//!
//! // Compile once, render many times.
//! let greet = Template::parse("hi, ${ name | upper }").unwrap();
//! assert_eq!(greet.render(&HashMap::from([("name", "eva")])).unwrap(), "hi, EVA");
//! ```
//!
//! Templates with no placeholder render as themselves; unterminated
//! placeholders such as `${ name` are ordinary text.

pub mod builtins;
pub mod data;
pub mod error;
pub mod parse;
pub mod registry;
pub mod template;
pub mod value;

// Re-exports for convenience.
pub use data::{data_fn, Data, DataFn, Env};
pub use error::{FilterError, RegistryError, RenderError};
pub use parse::{Expression, FilterCall};
pub use registry::{filter_fn, register_filter, FilterFn, FilterRegistry, Filters};
pub use template::{render, Delimiter, Placeholder, RenderOptions, Template};
pub use value::Value;
