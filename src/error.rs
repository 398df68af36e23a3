//! Error taxonomy for the engine.
//!
//! Public command-surface methods on [`crate::TableStore`] / [`crate::Document`]
//! still return `bool` / `Option<_>` rather than `Result` — fallible internals
//! funnel through [`EngineError`] and get folded into that boolean contract at
//! the boundary, with a [`log`] call standing in for the "notification emitted
//! to the external collaborator" requirement.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("index out of range: {what} (index {index}, len {len})")]
    OutOfRange {
        what: &'static str,
        index: i64,
        len: usize,
    },

    #[error("value cannot be cast to column dtype: {value:?} -> {target:?}")]
    TypeMismatch {
        value: String,
        target: crate::column::DType,
    },

    #[error("failed to parse {what}: {text:?}")]
    Parse { what: &'static str, text: String },

    #[error("spill io error: {0}")]
    IoSpill(#[from] std::io::Error),

    #[error("invalid state transition: {0}")]
    InvalidTransition(&'static str),
}

pub type EngineResult<T> = Result<T, EngineError>;
