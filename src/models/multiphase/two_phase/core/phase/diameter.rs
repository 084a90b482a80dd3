use crate::models::multiphase::two_phase::core::{
    ConfigError,
    config::{DiameterConfig, check},
};
use crate::support::constraint::StrictlyPositive;

/// Dispersed particle or bubble diameter as a function of pressure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum DiameterModel {
    Constant { d: f64 },
    Isothermal { d0: f64, p0: f64 },
}

impl DiameterModel {
    pub(crate) fn from_config(phase: &str, config: DiameterConfig) -> Result<Self, ConfigError> {
        let key = |what: &str| format!("{phase}.diameterModel.{what}");
        Ok(match config {
            DiameterConfig::Constant { d } => Self::Constant {
                d: check::<StrictlyPositive>(&key("d"), d)?,
            },
            DiameterConfig::Isothermal { d0, p0 } => Self::Isothermal {
                d0: check::<StrictlyPositive>(&key("d0"), d0)?,
                p0: check::<StrictlyPositive>(&key("p0"), p0)?,
            },
        })
    }

    /// Diameter at absolute pressure `p`, m.
    pub(crate) fn diameter(&self, p: f64) -> f64 {
        match *self {
            Self::Constant { d } => d,
            Self::Isothermal { d0, p0 } => d0 * (p0 / p).cbrt(),
        }
    }
}
