use std::fmt;

use thiserror::Error;

use super::Dimensions;

/// Where in the mesh an error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Cell(usize),
    Face(usize),
    Patch(String),
    /// The error is not tied to one element.
    Global,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(i) => write!(f, "cell {i}"),
            Self::Face(i) => write!(f, "face {i}"),
            Self::Patch(name) => write!(f, "patch `{name}`"),
            Self::Global => f.write_str("domain"),
        }
    }
}

/// Errors from field arithmetic and checks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// Arithmetic between fields with incompatible units.
    #[error("dimension mismatch in `{operation}`: {left} vs {right}")]
    Dimension {
        operation: &'static str,
        left: Dimensions,
        right: Dimensions,
    },

    /// A field does not have one value per cell or face.
    #[error("field `{field}` has {found} values, expected {expected}")]
    Size {
        field: String,
        expected: usize,
        found: usize,
    },

    /// A NaN or infinite value.
    #[error("non-finite value in `{field}` at {location}")]
    NonFinite { field: String, location: Location },
}
