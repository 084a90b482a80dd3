use thiserror::Error;

/// Errors from equation-of-state evaluation or construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThermoError {
    /// A model parameter is non-physical.
    #[error("invalid parameter: {context}")]
    InvalidParameter { context: String },

    /// The input state is outside the model's valid domain.
    #[error("out of domain: {context}")]
    OutOfDomain { context: String },
}

impl ThermoError {
    pub(crate) fn parameter(context: impl Into<String>) -> Self {
        Self::InvalidParameter {
            context: context.into(),
        }
    }
}
