use thiserror::Error;

use super::ClosureKind;

/// Errors from building or evaluating closure models.
#[derive(Debug, Error)]
pub enum ClosureError {
    /// No constructor is registered under this name.
    #[error("unknown {kind} model `{name}`; available: {available}")]
    UnknownModel {
        kind: ClosureKind,
        name: String,
        available: String,
    },

    /// A model entry has no `type` key.
    #[error("{kind} entry for `{pair}` has no `type`")]
    MissingType { kind: ClosureKind, pair: String },

    /// Model parameters failed to parse.
    #[error("invalid parameters for {kind} model `{name}`")]
    InvalidParameters {
        kind: ClosureKind,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A parameter parsed but is non-physical.
    #[error("{kind} model `{name}`: {context}")]
    InvalidValue {
        kind: ClosureKind,
        name: String,
        context: String,
    },

    /// A pair key string is malformed.
    #[error("invalid phase pair `{0}`; expected `a_in_b` or `a,b`")]
    InvalidPairKey(String),

    /// A pair key names a phase that does not exist.
    #[error("{kind} pair `{pair}` names an unknown phase")]
    UnknownPhase { kind: ClosureKind, pair: String },

    /// This kind only accepts unordered keys.
    #[error("{kind} requires an unordered pair, got `{pair}`")]
    OrderedNotAllowed { kind: ClosureKind, pair: String },

    /// The same pair was configured twice.
    #[error("{kind} pair `{pair}` is configured more than once")]
    Duplicate { kind: ClosureKind, pair: String },

    /// A required pair has no model.
    #[error("no {kind} model configured for pair `{pair}`")]
    MissingPair { kind: ClosureKind, pair: String },

    /// Blending thresholds are inconsistent or name an unknown phase.
    #[error("invalid blending: {0}")]
    InvalidBlending(String),

    /// A section is not a JSON object.
    #[error("section `{section}` must be an object")]
    Malformed { section: String },
}
