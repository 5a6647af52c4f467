#![allow(unreachable_pub)]

//! # Derive
//!
//! Procedural macros shared by the Tally workspace.
//!
//! The only macro exported today is [`tally_error`], which every crate in the
//! workspace uses to declare its error enum.

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Turns an enum into a workspace error type.
///
/// # Generated items
///
/// * `#[derive(Debug, thiserror::Error)]` unless the enum already derives them.
/// * A `<Name>Ext` trait adding `.context(...)` to `Result<T, Name>`, and to
///   `Result<T, Source>` for every variant that wraps a source error.
/// * `From<Source>` for variants with a `source` (or `#[source]`/`#[from]`)
///   field and a `context` field.
/// * `From<&'static str>` and `From<String>` when an `Internal` variant exists.
/// * A private `format_context` helper usable inside `#[error(...)]` strings.
///
/// # Requirements
///
/// * Only enums are accepted, and every variant must use named fields.
/// * A `context` field must have the type `Option<Cow<'static, str>>`.
/// * A variant with a source must also carry a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[tally_derive::tally_error]
/// pub enum StoreError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Session {session_id} not found")]
///     NotFound { session_id: u64 },
///
///     #[error("Internal store error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load(path: &str) -> Result<Vec<u8>, StoreError> {
///     std::fs::read(path).context("Reading snapshot")
/// }
/// ```
#[proc_macro_attribute]
pub fn tally_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
