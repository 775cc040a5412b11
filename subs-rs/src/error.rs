//! Error types.
//!
//! Rendering is all-or-nothing: any of these errors aborts the call and no
//! partially substituted text is returned.  A key missing from the data is
//! not an error and therefore has no variant here.

use thiserror::Error;

/// Failure compiling or rendering a template.
///
/// `position` fields are byte offsets of the offending placeholder's start
/// within the template source.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown filter `{name}` in placeholder at byte {position}")]
    UnknownFilter { name: String, position: usize },

    #[error("malformed filter arguments at byte {position}: {message}")]
    MalformedFilterArguments { position: usize, message: String },

    #[error("invalid filter name `{name}` at byte {position}")]
    InvalidFilterName { name: String, position: usize },

    #[error("invalid delimiter pattern `{pattern}`: {reason}")]
    InvalidDelimiterPattern { pattern: String, reason: String },

    #[error("filter `{name}` failed at byte {position}: {source}")]
    Filter {
        name: String,
        position: usize,
        #[source]
        source: FilterError,
    },
}

/// Failure raised by an individual filter function.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("{filter}: argument {index} missing")]
    MissingArgument { filter: String, index: usize },

    #[error("{filter}: invalid regular expression: {source}")]
    InvalidRegex {
        filter: String,
        #[source]
        source: regex::Error,
    },

    #[error("{filter}: unsupported regex flag `{flag}`")]
    UnsupportedFlag { filter: String, flag: char },

    /// Free-form failure for user-supplied filters.
    #[error("{0}")]
    Custom(String),
}

/// Failure registering a filter in a [`FilterRegistry`](crate::FilterRegistry).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid filter name `{0}`: expected an identifier")]
    InvalidName(String),

    #[error("cannot replace built-in filter `{0}`")]
    BuiltinOverride(String),
}
