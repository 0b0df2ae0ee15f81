//! Error types for the load → filter → save pipeline.
//!
//! One enum per layer:
//!
//! - [`SchemaError`] - table shape violations
//! - [`CodecError`] - decoding/encoding a byte buffer
//! - [`FilterError`] - parsing and binding filter expressions
//! - [`EngineError`] - orchestrator state errors, wrapping the two above
//!
//! Conversions are `From` based so `?` works across layer boundaries.

use thiserror::Error;

use crate::data::expr::SyntaxError;
use crate::data::format::Format;

// =============================================================================
// Schema Errors
// =============================================================================

/// A table whose rows do not agree with its column set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two columns share a name.
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// A row has a different number of fields than there are columns.
    #[error("row {row} has {found} fields, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Embedded metadata disagrees with the data actually present.
    #[error("schema declares {declared} rows but {found} were read")]
    RowCount { declared: usize, found: usize },
}

// =============================================================================
// Codec Errors
// =============================================================================

/// Errors produced while converting between bytes and a table.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input is not valid in the given encoding.
    #[error("malformed {format} input: {message}")]
    MalformedInput { format: Format, message: String },

    /// The input is syntactically fine but its rows don't fit its header/schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(#[from] SchemaError),

    /// A value cannot be written in the target encoding.
    #[error("column '{column}' cannot be written as {format}: {detail}")]
    UnsupportedValueType {
        format: Format,
        column: String,
        detail: String,
    },

    /// The underlying writer failed while producing output bytes.
    #[error("failed to write {format} output: {message}")]
    Write { format: Format, message: String },
}

impl CodecError {
    pub(crate) fn malformed(format: Format, message: impl ToString) -> Self {
        CodecError::MalformedInput {
            format,
            message: message.to_string(),
        }
    }

    pub(crate) fn write(format: Format, message: impl ToString) -> Self {
        CodecError::Write {
            format,
            message: message.to_string(),
        }
    }
}

// =============================================================================
// Filter Errors
// =============================================================================

/// Errors raised while turning filter text into predicates.
///
/// `index` is the zero-based position of the offending expression in the chain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// Filter text was blank.
    #[error("filter expression is empty")]
    EmptyExpression,

    /// The expression does not parse.
    #[error("filter #{} `{expression}` is invalid: {source}", .index + 1)]
    InvalidExpressionSyntax {
        index: usize,
        expression: String,
        #[source]
        source: SyntaxError,
    },

    /// The expression names a column the dataset doesn't have.
    #[error("filter #{} `{expression}` references unknown column '{column}'", .index + 1)]
    UnknownColumn {
        index: usize,
        expression: String,
        column: String,
    },
}

// =============================================================================
// Engine Errors
// =============================================================================

/// Errors returned by [`crate::engine::FilterEngine`] operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Operation needs a loaded dataset.
    #[error("no dataset loaded")]
    NoDatasetLoaded,

    /// `save` was called before any successful filter application.
    #[error("no filtered result to save; apply filters first")]
    NoFilteredResult,

    /// `remove_filter` was given a position past the end of the chain.
    #[error("no filter at position {index} (chain has {len})")]
    FilterIndexOutOfRange { index: usize, len: usize },

    /// Writing encoded bytes to the sink failed.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
