//! Error types for the xref extraction and aggregation pipeline.
//!
//! Catalog problems are fatal at startup; everything hit while decoding a
//! single input is a per-file error that the batch driver counts and
//! reports without aborting the remaining inputs.

use std::path::PathBuf;

use thiserror::Error;

use crate::image::ImageError;

/// Main error type for xref operations.
#[derive(Debug, Error)]
pub enum XrefError {
    /// The struct layout catalog could not be loaded
    #[error("struct layout catalog unavailable: {0}")]
    SchemaMissing(String),

    /// A required struct is not described by the layout catalog
    #[error("no layout for struct {0:?}")]
    UnknownStruct(String),

    /// A field lookup failed against a struct layout
    #[error("struct {name:?} has no field {field:?}")]
    UnknownField { name: String, field: String },

    /// A field was accessed through the wrong decode kind
    #[error("field {field:?} of {name:?} is not {expected}")]
    FieldKind {
        name: String,
        field: String,
        expected: &'static str,
    },

    /// A layout declares an integer width the decoder cannot read
    #[error("unsupported width {size} for field {field:?} of {name:?}")]
    FieldWidth {
        name: String,
        field: String,
        size: u64,
    },

    /// Input is neither an ELF binary, a libtool stub, nor a snapshot
    #[error("cannot determine file type for {}", path.display())]
    UnrecognizedFileType { path: PathBuf },

    /// The binary exposes neither of the two discovery anchors
    #[error("file has neither xref note nor xref_array section")]
    NoXrefTable,

    /// ELF image access failure
    #[error("image error: {0}")]
    Image(#[from] ImageError),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot or output (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for xref operations
pub type Result<T> = std::result::Result<T, XrefError>;
