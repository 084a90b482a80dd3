//! Virtual (added) mass models.
//!
//! A virtual mass model returns `V_m = C_vm · α_d · ρ_c` (kg/m³), the mass
//! of continuous phase accelerated with the dispersed phase per unit volume.

use std::fmt::Debug;

use serde::Deserialize;
use serde_json::Value;

use super::{
    ClosureError, ClosureKind, NoModel, PairCell,
    registry::{Registry, non_negative, parse_params},
};

/// Evaluates the virtual mass coefficient `V_m` of a pair.
pub trait VirtualMassModel: Debug + Send + Sync {
    fn k(&self, cell: &PairCell) -> f64;
}

impl VirtualMassModel for NoModel {
    fn k(&self, _cell: &PairCell) -> f64 {
        0.0
    }
}

/// A constant virtual mass coefficient `C_vm`, 0.5 for isolated spheres.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConstantVirtualMass {
    #[serde(rename = "Cvm")]
    cvm: f64,
}

impl ConstantVirtualMass {
    /// # Errors
    ///
    /// Returns [`ClosureError::InvalidValue`] if `cvm` is negative or not finite.
    pub fn new(cvm: f64) -> Result<Self, ClosureError> {
        let cvm = non_negative(ClosureKind::VirtualMass, "constantCoefficient", "Cvm", cvm)?;
        Ok(Self { cvm })
    }
}

impl VirtualMassModel for ConstantVirtualMass {
    fn k(&self, cell: &PairCell) -> f64 {
        self.cvm * cell.alpha_d * cell.rho_c
    }
}

/// Zuber's swarm correction, `C_vm = 0.5 (1 + 2 α_d) / α_c`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zuber;

impl VirtualMassModel for Zuber {
    fn k(&self, cell: &PairCell) -> f64 {
        let cvm = 0.5 * (1.0 + 2.0 * cell.alpha_d) / cell.alpha_c_floor();
        cvm * cell.alpha_d * cell.rho_c
    }
}

fn constant_coefficient(params: &Value) -> Result<Box<dyn VirtualMassModel>, ClosureError> {
    let parsed: ConstantVirtualMass =
        parse_params(ClosureKind::VirtualMass, "constantCoefficient", params)?;
    Ok(Box::new(ConstantVirtualMass::new(parsed.cvm)?))
}

fn zuber(_: &Value) -> Result<Box<dyn VirtualMassModel>, ClosureError> {
    Ok(Box::new(Zuber))
}

fn none(_: &Value) -> Result<Box<dyn VirtualMassModel>, ClosureError> {
    Ok(Box::new(NoModel))
}

pub(super) fn register_builtins(registry: &mut Registry<dyn VirtualMassModel>) {
    registry.register("constantCoefficient", constant_coefficient);
    registry.register("Zuber", zuber);
    registry.register("none", none);
}
