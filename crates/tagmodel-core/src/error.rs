//! Error types for tagmodel.
//!
//! Resolution itself never fails: malformed annotations and unresolvable
//! relationships degrade to best-effort metadata. Errors surface only when a
//! caller opts into strict checking or when a [`Scanner`](crate::Scanner)
//! rejects a stored value.

use std::error::Error as StdError;
use std::fmt;

/// Result alias used across tagmodel.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by tagmodel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A struct or sequence-of-struct field looked like an association, but no
    /// foreign key could be located on either side.
    UnresolvedRelationship {
        /// Model that declares the field.
        model: String,
        /// Declared field name.
        field: String,
        /// Foreign key name that was searched for.
        foreign_key: String,
    },
    /// Metadata was requested for a type that is not a struct.
    NotAStruct {
        /// Declared type name.
        model: String,
    },
    /// A scanner could not convert a stored column value.
    Scan {
        /// What the scanner accepts.
        expected: &'static str,
        /// What it was given.
        found: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnresolvedRelationship {
                model,
                field,
                foreign_key,
            } => write!(
                f,
                "unresolved relationship {}.{}: no field matches foreign key `{}` on either side",
                model, field, foreign_key
            ),
            Error::NotAStruct { model } => write!(f, "`{}` is not a struct", model),
            Error::Scan { expected, found } => {
                write!(f, "cannot scan {} into {}", found, expected)
            }
        }
    }
}

impl StdError for Error {}
