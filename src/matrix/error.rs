//! Error taxonomy for matrix construction and expansion.
//!
//! Everything in [`MatrixError`] is a configuration mistake in how the option
//! matrix was declared; none of these are recoverable at runtime.
//! [`MissingAssignment`] is different: it is an internal control-flow signal
//! used by the expansion algorithm to defer filters, and is only ever visible
//! to filter predicates themselves.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error in the option matrix.
#[derive(Debug, Error, Diagnostic)]
pub enum MatrixError {
    /// Two arguments registered under the same name.
    #[error("argument `{0}` is already registered")]
    #[diagnostic(code(armada::matrix::duplicate_arg))]
    DuplicateArg(String),

    /// Two arguments registered with the same short tag.
    #[error("short tag `{short}` is used by both `{first}` and `{second}`")]
    #[diagnostic(
        code(armada::matrix::duplicate_short),
        help("short tags become directory-name tokens and must be unique")
    )]
    DuplicateShortTag {
        short: String,
        first: String,
        second: String,
    },

    /// Two values with the same name declared on one argument.
    #[error("value `{value}` is already declared on argument `{arg}`")]
    #[diagnostic(code(armada::matrix::duplicate_value))]
    DuplicateValue { arg: String, value: String },

    /// An argument registered without any values.
    #[error("argument `{0}` has no values")]
    #[diagnostic(
        code(armada::matrix::empty_arg),
        help("declare at least one value for every argument")
    )]
    EmptyArg(String),

    /// A lookup or rule named an argument that was never registered.
    #[error("argument `{0}` is not registered")]
    #[diagnostic(code(armada::matrix::unknown_arg))]
    UnknownArg(String),

    /// Registration attempted after the first expansion.
    #[error("cannot register `{0}`: the matrix has already been expanded")]
    #[diagnostic(
        code(armada::matrix::sealed),
        help("register all arguments and values before calling variants()")
    )]
    SealedRegistry(String),

    /// A filter kept raising a missing assignment even against complete
    /// variants, meaning it probes an argument nobody registered.
    #[error("filter `{filter}` references `{arg}`, which is never registered")]
    #[diagnostic(
        code(armada::matrix::unresolved_filter),
        help("register the argument the filter depends on, or remove the filter")
    )]
    UnresolvedFilter { filter: String, arg: String },

    /// Every variant was filtered out; there is nothing to generate or build.
    #[error("no build variants remain after filtering")]
    #[diagnostic(
        code(armada::matrix::no_variants),
        help("relax the filter rules, or run `armada doctor` to check which compilers were detected")
    )]
    NoVariants,
}

/// Raised by [`Variant::get`](crate::matrix::Variant::get) when a filter
/// probes an argument the (partial) variant does not carry yet.
///
/// The expansion algorithm catches this and retries the filter after the next
/// argument has been assigned. It is never surfaced to callers of
/// [`ArgMatrix::variants`](crate::matrix::ArgMatrix::variants); a filter that
/// still raises against complete variants is reported as
/// [`MatrixError::UnresolvedFilter`] instead.
#[derive(Debug, Clone, Error)]
#[error("argument `{0}` is not assigned")]
pub struct MissingAssignment(pub String);
