//! Interfacial heat transfer models.
//!
//! A heat transfer model returns `h_if` (W/m³·K) such that the heat flowing
//! into phase `k` is `h_if (T_other - T_k)`.

use std::fmt::Debug;

use serde::Deserialize;
use serde_json::Value;

use super::{
    ClosureError, ClosureKind, NoModel, PairCell,
    registry::{Registry, non_negative, parse_params},
};

/// Evaluates the volumetric heat transfer coefficient of a pair.
pub trait HeatTransferModel: Debug + Send + Sync {
    fn k(&self, cell: &PairCell) -> f64;
}

impl HeatTransferModel for NoModel {
    fn k(&self, _cell: &PairCell) -> f64 {
        0.0
    }
}

/// Nusselt number of a sphere, `Nu = 2 + 0.6 Re^½ Pr^⅓`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RanzMarshall;

impl HeatTransferModel for RanzMarshall {
    fn k(&self, cell: &PairCell) -> f64 {
        let nu = 2.0 + 0.6 * cell.reynolds().sqrt() * cell.prandtl().cbrt();
        6.0 * cell.alpha_d_floor() * cell.kappa_c * nu / (cell.d * cell.d)
    }
}

/// Conduction-limited transfer inside a sphere, `Nu = 10`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Spherical;

impl HeatTransferModel for Spherical {
    fn k(&self, cell: &PairCell) -> f64 {
        60.0 * cell.alpha_d_floor() * cell.kappa_c / (cell.d * cell.d)
    }
}

/// A prescribed volumetric heat transfer coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConstantHeatTransfer {
    h: f64,
}

impl ConstantHeatTransfer {
    /// # Errors
    ///
    /// Returns [`ClosureError::InvalidValue`] if `h` is negative or not finite.
    pub fn new(h: f64) -> Result<Self, ClosureError> {
        let h = non_negative(ClosureKind::HeatTransfer, "constant", "h", h)?;
        Ok(Self { h })
    }
}

impl HeatTransferModel for ConstantHeatTransfer {
    fn k(&self, _cell: &PairCell) -> f64 {
        self.h
    }
}

fn ranz_marshall(_: &Value) -> Result<Box<dyn HeatTransferModel>, ClosureError> {
    Ok(Box::new(RanzMarshall))
}

fn spherical(_: &Value) -> Result<Box<dyn HeatTransferModel>, ClosureError> {
    Ok(Box::new(Spherical))
}

fn constant(params: &Value) -> Result<Box<dyn HeatTransferModel>, ClosureError> {
    let parsed: ConstantHeatTransfer = parse_params(ClosureKind::HeatTransfer, "constant", params)?;
    Ok(Box::new(ConstantHeatTransfer::new(parsed.h)?))
}

fn none(_: &Value) -> Result<Box<dyn HeatTransferModel>, ClosureError> {
    Ok(Box::new(NoModel))
}

pub(super) fn register_builtins(registry: &mut Registry<dyn HeatTransferModel>) {
    registry.register("RanzMarshall", ranz_marshall);
    registry.register("spherical", spherical);
    registry.register("constant", constant);
    registry.register("none", none);
}
