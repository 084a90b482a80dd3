use thiserror::Error;

use crate::support::{
    closure::{ClosureError, ClosureKind},
    field::{FieldError, Location},
    mesh::MeshError,
    thermo::ThermoError,
};

/// Errors found while building a two-phase system from its dictionary.
///
/// These are fatal: the case cannot start.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The dictionary did not deserialize.
    #[error("malformed `{context}`")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A required entry is absent.
    #[error("missing entry `{key}`")]
    Missing { key: String },

    /// An entry is present but unusable.
    #[error("invalid `{key}`: {reason}")]
    Invalid { key: String, reason: String },

    /// A closure lookup named a pair that was never configured.
    #[error("no {kind} model for pair `{pair}`")]
    MissingPair { kind: ClosureKind, pair: String },

    #[error(transparent)]
    Closure(#[from] ClosureError),

    #[error("mesh error")]
    Mesh(#[from] MeshError),

    #[error("thermophysical model error")]
    Thermo(#[from] ThermoError),
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from a two-phase solve step.
///
/// Step failures are recoverable: the host may reduce the time step and
/// retry. Configuration and field errors are not.
#[derive(Debug, Error)]
pub enum TwoPhaseError {
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// Dimension or size mismatch between fields, a programming error.
    #[error("field error")]
    Field(#[from] FieldError),

    /// A NaN or infinite value appeared in a field.
    #[error("non-finite `{field}` at {location}: {reason}")]
    NonFinite {
        field: String,
        location: Location,
        reason: String,
    },

    /// The volume fraction left its bounds by more than the tolerance.
    #[error("`{field}` out of bounds at {location}: {reason}")]
    Boundedness {
        field: String,
        location: Location,
        reason: String,
    },

    /// A linear solver hit its iteration cap.
    #[error("{solver} did not converge at {location}: {reason}")]
    Convergence {
        solver: &'static str,
        location: Location,
        reason: String,
    },

    /// A phase equation of state failed at the current state.
    #[error("equation of state failed for `{phase}` at {location}")]
    Thermo {
        phase: String,
        location: Location,
        #[source]
        source: ThermoError,
    },
}

impl TwoPhaseError {
    /// Returns true if retrying with a smaller time step may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NonFinite { .. }
            | Self::Boundedness { .. }
            | Self::Convergence { .. }
            | Self::Thermo { .. } => true,
            Self::Config(_) => false,
            // A non-finite field value is a numerical failure, the rest are bugs.
            Self::Field(err) => matches!(err, FieldError::NonFinite { .. }),
        }
    }
}

impl From<ClosureError> for TwoPhaseError {
    fn from(err: ClosureError) -> Self {
        Self::Config(ConfigError::Closure(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failures_are_recoverable() {
        let bounded = TwoPhaseError::Boundedness {
            field: "alpha.air".into(),
            location: Location::Cell(3),
            reason: "alpha = 1.2".into(),
        };
        assert!(bounded.is_recoverable());

        let missing = TwoPhaseError::from(ConfigError::Missing {
            key: "phases".into(),
        });
        assert!(!missing.is_recoverable());

        let size = TwoPhaseError::from(FieldError::Size {
            field: "p".into(),
            expected: 4,
            found: 3,
        });
        assert!(!size.is_recoverable());
    }

    #[test]
    fn messages_name_the_location() {
        let err = TwoPhaseError::Convergence {
            solver: "pressure",
            location: Location::Global,
            reason: "residual 1e-3 after 1000 iterations".into(),
        };
        assert_eq!(
            err.to_string(),
            "pressure did not converge at domain: residual 1e-3 after 1000 iterations"
        );
    }
}
