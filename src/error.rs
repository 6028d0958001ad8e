use std::fmt;
use std::io;

use crate::array::TypeTag;

/// Convenient alias for results produced by this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the point-cloud, tree, tensor, and spectral toolkit.
///
/// The core only raises; it never catches. Collaborators translate these
/// into stream-level behavior (log, emit null output, continue or halt).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Contract violation at an API boundary: shape mismatch, duplicate
    /// name, missing metadata key, malformed datatype, unsupported element
    /// type.
    #[error("value error: {0}")]
    Value(String),

    /// A typed accessor was invoked with a type incompatible with the
    /// stored element type.
    #[error("type mismatch: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        /// The type tag actually stored.
        expected: TypeTag,
        /// The type tag the caller requested.
        actual: TypeTag,
    },

    /// Out-of-bounds access on an Array, Dataset selection, or
    /// DisjointRange.
    #[error("index {index} out of bounds (len {len})")]
    Index {
        /// The index that was requested.
        index: usize,
        /// The length of the indexed collection.
        len: usize,
    },

    /// An operation disallowed by the current object state.
    #[error("logic error: {0}")]
    Logic(String),

    /// Wrapper around standard I/O errors, used by the TDM sidecar-file
    /// example code path.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn value<T: fmt::Display>(msg: T) -> Self {
        Self::Value(msg.to_string())
    }

    pub(crate) fn type_mismatch(expected: TypeTag, actual: TypeTag) -> Self {
        Self::TypeMismatch { expected, actual }
    }

    pub(crate) fn index(index: usize, len: usize) -> Self {
        Self::Index { index, len }
    }

    pub(crate) fn logic<T: fmt::Display>(msg: T) -> Self {
        Self::Logic(msg.to_string())
    }
}
