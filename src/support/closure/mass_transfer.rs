//! Interfacial mass transfer models.
//!
//! Mass transfer is configured on unordered keys. For a key `a,b` a positive
//! rate moves mass from `b` into `a`; the two-phase system reorients the
//! value to its own phase numbering.

use std::fmt::Debug;

use serde::Deserialize;
use serde_json::Value;

use super::{
    ClosureError, ClosureKind, NoModel, PairCell,
    registry::{Registry, parse_params},
};

/// Evaluates the interfacial mass rate `ṁ` (kg/m³·s) of a pair.
pub trait MassTransferModel: Debug + Send + Sync {
    fn dmdt(&self, cell: &PairCell) -> f64;
}

impl MassTransferModel for NoModel {
    fn dmdt(&self, _cell: &PairCell) -> f64 {
        0.0
    }
}

/// A prescribed, uniform mass rate.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConstantMassTransfer {
    dmdt: f64,
}

impl ConstantMassTransfer {
    /// # Errors
    ///
    /// Returns [`ClosureError::InvalidValue`] if the rate is not finite.
    pub fn new(dmdt: f64) -> Result<Self, ClosureError> {
        if !dmdt.is_finite() {
            return Err(ClosureError::InvalidValue {
                kind: ClosureKind::MassTransfer,
                name: "constant".to_owned(),
                context: format!("dmdt must be finite, got {dmdt}"),
            });
        }
        Ok(Self { dmdt })
    }
}

impl MassTransferModel for ConstantMassTransfer {
    fn dmdt(&self, _cell: &PairCell) -> f64 {
        self.dmdt
    }
}

fn constant(params: &Value) -> Result<Box<dyn MassTransferModel>, ClosureError> {
    let parsed: ConstantMassTransfer = parse_params(ClosureKind::MassTransfer, "constant", params)?;
    Ok(Box::new(ConstantMassTransfer::new(parsed.dmdt)?))
}

fn none(_: &Value) -> Result<Box<dyn MassTransferModel>, ClosureError> {
    Ok(Box::new(NoModel))
}

pub(super) fn register_builtins(registry: &mut Registry<dyn MassTransferModel>) {
    registry.register("constant", constant);
    registry.register("none", none);
}
