//! Turbulent dispersion models.
//!
//! A turbulent dispersion model returns `D` (Pa) such that the force on the
//! dispersed phase is `-D ∇α_d`. Turbulence itself is outside the kernel, so
//! the turbulent kinetic energy is a model parameter.

use std::fmt::Debug;

use serde::Deserialize;
use serde_json::Value;

use super::{
    ClosureError, ClosureKind, NoModel, PairCell,
    registry::{Registry, non_negative, parse_params},
};

/// Evaluates the turbulent dispersion coefficient `D` of a pair.
pub trait TurbulentDispersionModel: Debug + Send + Sync {
    fn d(&self, cell: &PairCell) -> f64;
}

impl TurbulentDispersionModel for NoModel {
    fn d(&self, _cell: &PairCell) -> f64 {
        0.0
    }
}

/// `D = C_td · α_d · ρ_c · k`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConstantTurbulentDispersion {
    #[serde(rename = "Ctd")]
    ctd: f64,
    /// Continuous-phase turbulent kinetic energy, m²/s².
    k: f64,
}

impl ConstantTurbulentDispersion {
    /// # Errors
    ///
    /// Returns [`ClosureError::InvalidValue`] if either value is negative or
    /// not finite.
    pub fn new(ctd: f64, k: f64) -> Result<Self, ClosureError> {
        let name = "constantCoefficient";
        let ctd = non_negative(ClosureKind::TurbulentDispersion, name, "Ctd", ctd)?;
        let k = non_negative(ClosureKind::TurbulentDispersion, name, "k", k)?;
        Ok(Self { ctd, k })
    }
}

impl TurbulentDispersionModel for ConstantTurbulentDispersion {
    fn d(&self, cell: &PairCell) -> f64 {
        self.ctd * cell.alpha_d * cell.rho_c * self.k
    }
}

fn constant_coefficient(params: &Value) -> Result<Box<dyn TurbulentDispersionModel>, ClosureError> {
    let parsed: ConstantTurbulentDispersion =
        parse_params(ClosureKind::TurbulentDispersion, "constantCoefficient", params)?;
    Ok(Box::new(ConstantTurbulentDispersion::new(
        parsed.ctd, parsed.k,
    )?))
}

fn none(_: &Value) -> Result<Box<dyn TurbulentDispersionModel>, ClosureError> {
    Ok(Box::new(NoModel))
}

pub(super) fn register_builtins(registry: &mut Registry<dyn TurbulentDispersionModel>) {
    registry.register("constantCoefficient", constant_coefficient);
    registry.register("none", none);
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use serde_json::json;

    use crate::support::closure::test_support::air_in_water;

    #[test]
    fn scales_with_dispersed_fraction() {
        let model = constant_coefficient(&json!({ "Ctd": 1.0, "k": 0.01 })).unwrap();
        assert_relative_eq!(model.d(&air_in_water(0.1, 0.0)), 0.1 * 998.2 * 0.01);
        assert_eq!(model.d(&air_in_water(0.0, 0.0)), 0.0);
    }
}
