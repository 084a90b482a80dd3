//! Drag coefficient models.
//!
//! A drag model returns `K_d` (kg/m³·s) such that the drag force on the
//! dispersed phase is `K_d (U_c - U_d)`. All built-ins share the form
//!
//! ```text
//! K_d = 0.75 · CdRe · max(α_d, α_d,res) · μ_c / d²
//! ```
//!
//! and differ in the drag-coefficient–Reynolds-number product `CdRe`.

use std::fmt::Debug;

use serde::Deserialize;
use serde_json::Value;

use super::{
    ClosureError, ClosureKind, NoModel, PairCell,
    registry::{Registry, non_negative, parse_params},
};

/// Evaluates the drag coefficient `K_d` of a pair.
pub trait DragModel: Debug + Send + Sync {
    fn k(&self, cell: &PairCell) -> f64;
}

impl DragModel for NoModel {
    fn k(&self, _cell: &PairCell) -> f64 {
        0.0
    }
}

const RESIDUAL_RE: f64 = 1e-3;

/// Schiller–Naumann correlation for a single sphere.
fn schiller_naumann_cd_re(re: f64) -> f64 {
    if re < 1000.0 {
        24.0 * (1.0 + 0.15 * re.powf(0.687))
    } else {
        0.44 * re.max(RESIDUAL_RE)
    }
}

fn k_from_cd_re(cell: &PairCell, cd_re: f64) -> f64 {
    0.75 * cd_re * cell.alpha_d_floor() * cell.mu_c / (cell.d * cell.d)
}

/// Isolated spheres, suitable for dilute bubbly flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchillerNaumann;

impl DragModel for SchillerNaumann {
    fn k(&self, cell: &PairCell) -> f64 {
        k_from_cd_re(cell, schiller_naumann_cd_re(cell.reynolds()))
    }
}

/// Wen–Yu swarm correction for moderately dense particle suspensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WenYu;

impl WenYu {
    fn cd_re(cell: &PairCell) -> f64 {
        let alpha_c = (1.0 - cell.alpha_d).max(cell.residual_alpha_c);
        let cds_res = schiller_naumann_cd_re(alpha_c * cell.reynolds());
        cds_res * alpha_c.powf(-3.65) * cell.alpha_c_floor()
    }
}

impl DragModel for WenYu {
    fn k(&self, cell: &PairCell) -> f64 {
        k_from_cd_re(cell, Self::cd_re(cell))
    }
}

/// Ergun packed-bed correlation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ergun;

impl Ergun {
    fn cd_re(cell: &PairCell) -> f64 {
        (4.0 / 3.0) * (150.0 * (1.0 - cell.alpha_c) / cell.alpha_c_floor() + 1.75 * cell.reynolds())
    }
}

impl DragModel for Ergun {
    fn k(&self, cell: &PairCell) -> f64 {
        k_from_cd_re(cell, Self::cd_re(cell))
    }
}

/// Ergun below a continuous volume fraction of 0.8, Wen–Yu above it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GidaspowErgunWenYu;

impl DragModel for GidaspowErgunWenYu {
    fn k(&self, cell: &PairCell) -> f64 {
        if cell.alpha_c > 0.8 {
            WenYu.k(cell)
        } else {
            Ergun.k(cell)
        }
    }
}

/// A prescribed, uniform drag coefficient.
///
/// Useful for verification: `K = 0` decouples the phases, a very large `K`
/// forces them to move together.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConstantDrag {
    #[serde(rename = "K")]
    k: f64,
}

impl ConstantDrag {
    /// # Errors
    ///
    /// Returns [`ClosureError::InvalidValue`] if `k` is negative or not finite.
    pub fn new(k: f64) -> Result<Self, ClosureError> {
        let k = non_negative(ClosureKind::Drag, "constant", "K", k)?;
        Ok(Self { k })
    }
}

impl DragModel for ConstantDrag {
    fn k(&self, _cell: &PairCell) -> f64 {
        self.k
    }
}

fn constant(params: &Value) -> Result<Box<dyn DragModel>, ClosureError> {
    let parsed: ConstantDrag = parse_params(ClosureKind::Drag, "constant", params)?;
    Ok(Box::new(ConstantDrag::new(parsed.k)?))
}

pub(super) fn register_builtins(registry: &mut Registry<dyn DragModel>) {
    fn unit<M: DragModel + Copy + 'static>(
        model: M,
    ) -> impl Fn(&Value) -> Result<Box<dyn DragModel>, ClosureError> + Send + Sync + 'static
    where
        M: Send + Sync,
    {
        move |_: &Value| -> Result<Box<dyn DragModel>, ClosureError> { Ok(Box::new(model)) }
    }

    registry.register("SchillerNaumann", unit(SchillerNaumann));
    registry.register("WenYu", unit(WenYu));
    registry.register("Ergun", unit(Ergun));
    registry.register("GidaspowErgunWenYu", unit(GidaspowErgunWenYu));
    registry.register("constant", constant);
    registry.register("none", unit(NoModel));
}
