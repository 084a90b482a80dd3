//! Surface tension models.

use std::fmt::Debug;

use serde::Deserialize;
use serde_json::Value;

use super::{
    ClosureError, ClosureKind, NoModel, PairCell,
    registry::{Registry, non_negative, parse_params},
};

/// Evaluates the surface tension coefficient `σ` (N/m) of a pair.
pub trait SurfaceTensionModel: Debug + Send + Sync {
    fn sigma(&self, cell: &PairCell) -> f64;
}

impl SurfaceTensionModel for NoModel {
    fn sigma(&self, _cell: &PairCell) -> f64 {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConstantSurfaceTension {
    sigma: f64,
}

impl ConstantSurfaceTension {
    /// # Errors
    ///
    /// Returns [`ClosureError::InvalidValue`] if `sigma` is negative or not finite.
    pub fn new(sigma: f64) -> Result<Self, ClosureError> {
        let sigma = non_negative(ClosureKind::SurfaceTension, "constant", "sigma", sigma)?;
        Ok(Self { sigma })
    }
}

impl SurfaceTensionModel for ConstantSurfaceTension {
    fn sigma(&self, _cell: &PairCell) -> f64 {
        self.sigma
    }
}

fn constant(params: &Value) -> Result<Box<dyn SurfaceTensionModel>, ClosureError> {
    let parsed: ConstantSurfaceTension =
        parse_params(ClosureKind::SurfaceTension, "constant", params)?;
    Ok(Box::new(ConstantSurfaceTension::new(parsed.sigma)?))
}

fn none(_: &Value) -> Result<Box<dyn SurfaceTensionModel>, ClosureError> {
    Ok(Box::new(NoModel))
}

pub(super) fn register_builtins(registry: &mut Registry<dyn SurfaceTensionModel>) {
    registry.register("constant", constant);
    registry.register("none", none);
}
