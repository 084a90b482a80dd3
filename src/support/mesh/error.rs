use thiserror::Error;

/// Errors raised while constructing or editing a [`Mesh`](super::Mesh).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("mesh has no cells")]
    Empty,

    /// Two arrays that must agree in length do not.
    #[error("{what}: expected {expected} entries, found {found}")]
    Size {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("cell {cell} has a non-positive volume")]
    NonPositiveVolume { cell: usize },

    #[error("face {face} addresses invalid cell {cell}")]
    BadAddress { face: usize, cell: usize },

    /// A face has zero area or its cell centres are not on opposite sides.
    #[error("face {face} is degenerate")]
    DegenerateFace { face: usize },

    #[error("patch `{patch}` does not continue the boundary face numbering")]
    PatchLayout { patch: String },

    #[error("{count} boundary faces starting at {first} belong to no patch")]
    UncoveredFaces { first: usize, count: usize },

    #[error("unknown patch `{0}`")]
    UnknownPatch(String),

    /// A structured grid was requested with zero cells or a non-positive extent.
    #[error("invalid grid: {context}")]
    InvalidGrid { context: String },
}

impl MeshError {
    pub(crate) fn size(what: &'static str, expected: usize, found: usize) -> Self {
        Self::Size {
            what,
            expected,
            found,
        }
    }
}
