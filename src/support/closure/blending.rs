//! Combining dispersed-in-continuous closure models across flow regimes.
//!
//! A pair may be configured with up to three models of one kind: phase 1
//! dispersed in phase 2, phase 2 dispersed in phase 1, and a symmetric
//! model on the unordered key. [`LinearBlending`] turns the local volume
//! fractions into weights for these three regimes.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::{ClosureError, ClosureKind, PairCell, PhasePairKey};

/// Sum of weights below which the configured models share equally.
const WEIGHT_FLOOR: f64 = 1e-12;

/// The closure-relevant state of one phase in one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseCell {
    pub alpha: f64,
    pub rho: f64,
    pub mu: f64,
    pub kappa: f64,
    pub cp: f64,
    pub d: f64,
    pub residual_alpha: f64,
}

/// Both phases of a cell and the magnitude of their slip velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairState {
    pub phase1: PhaseCell,
    pub phase2: PhaseCell,
    pub slip: f64,
}

impl PairState {
    fn view(&self, dispersed: &PhaseCell, continuous: &PhaseCell) -> PairCell {
        PairCell {
            alpha_d: dispersed.alpha,
            alpha_c: continuous.alpha,
            rho_d: dispersed.rho,
            rho_c: continuous.rho,
            mu_c: continuous.mu,
            kappa_c: continuous.kappa,
            cp_c: continuous.cp,
            d: dispersed.d,
            slip: self.slip,
            residual_alpha_d: dispersed.residual_alpha,
            residual_alpha_c: continuous.residual_alpha,
        }
    }

    /// Phase 1 dispersed in phase 2.
    #[must_use]
    pub fn one_in_two(&self) -> PairCell {
        self.view(&self.phase1, &self.phase2)
    }

    /// Phase 2 dispersed in phase 1.
    #[must_use]
    pub fn two_in_one(&self) -> PairCell {
        self.view(&self.phase2, &self.phase1)
    }

    /// The view used by unordered models: the locally scarcer phase is
    /// treated as dispersed, phase 1 on a tie.
    #[must_use]
    pub fn unordered(&self) -> PairCell {
        if self.phase2.alpha < self.phase1.alpha {
            self.two_in_one()
        } else {
            self.one_in_two()
        }
    }
}

/// Linear blending between the fully-continuous and partly-continuous
/// volume fractions of each phase.
///
/// A phase with `α ≥ minFullyContinuousAlpha` is fully continuous, so the
/// other phase is entirely dispersed in it. Below `minPartlyContinuousAlpha`
/// it is never continuous.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBlending {
    full: [f64; 2],
    partly: [f64; 2],
}

impl Default for LinearBlending {
    fn default() -> Self {
        Self {
            full: [0.7; 2],
            partly: [0.3; 2],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct LinearBlendingParams {
    #[serde(rename = "type")]
    _kind: Option<LinearTag>,
    min_fully_continuous_alpha: BTreeMap<String, f64>,
    min_partly_continuous_alpha: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum LinearTag {
    Linear,
}

impl LinearBlending {
    /// Thresholds indexed by phase, `[phase1, phase2]`.
    ///
    /// # Errors
    ///
    /// Returns [`ClosureError::InvalidBlending`] unless
    /// `0 ≤ partly < full ≤ 1` for both phases.
    pub fn new(full: [f64; 2], partly: [f64; 2]) -> Result<Self, ClosureError> {
        for (f, p) in full.iter().zip(&partly) {
            if !(0.0..=1.0).contains(p) || !(0.0..=1.0).contains(f) || p >= f {
                return Err(ClosureError::InvalidBlending(format!(
                    "need 0 <= minPartlyContinuousAlpha ({p}) < minFullyContinuousAlpha ({f}) <= 1"
                )));
            }
        }
        Ok(Self { full, partly })
    }

    /// Reads a `blending` section for the given phase names.
    ///
    /// # Errors
    ///
    /// Returns a [`ClosureError`] if the section is malformed, misses one of
    /// the phases or has inconsistent thresholds.
    pub fn from_config(section: &Value, phases: [&str; 2]) -> Result<Self, ClosureError> {
        let params: LinearBlendingParams =
            serde_json::from_value(section.clone()).map_err(|err| {
                ClosureError::InvalidBlending(err.to_string())
            })?;
        let lookup = |table: &BTreeMap<String, f64>, what: &str| -> Result<[f64; 2], ClosureError> {
            let mut values = [0.0; 2];
            for (value, phase) in values.iter_mut().zip(phases) {
                *value = *table.get(phase).ok_or_else(|| {
                    ClosureError::InvalidBlending(format!("{what} has no entry for `{phase}`"))
                })?;
            }
            Ok(values)
        };
        Self::new(
            lookup(&params.min_fully_continuous_alpha, "minFullyContinuousAlpha")?,
            lookup(&params.min_partly_continuous_alpha, "minPartlyContinuousAlpha")?,
        )
    }

    fn continuous_fraction(&self, index: usize, alpha: f64) -> f64 {
        ((alpha - self.partly[index]) / (self.full[index] - self.partly[index])).clamp(0.0, 1.0)
    }

    /// Raw weights `[1 in 2, 2 in 1, symmetric]`, summing to one.
    #[must_use]
    pub fn weights(&self, alpha1: f64, alpha2: f64) -> [f64; 3] {
        let mut one_in_two = self.continuous_fraction(1, alpha2);
        let mut two_in_one = self.continuous_fraction(0, alpha1);
        let sum = one_in_two + two_in_one;
        if sum > 1.0 {
            one_in_two /= sum;
            two_in_one /= sum;
        }
        let symmetric = (1.0 - one_in_two - two_in_one).max(0.0);
        [one_in_two, two_in_one, symmetric]
    }
}

/// Up to three models of one kind for a pair, combined by blending.
#[derive(Debug)]
pub struct BlendedModel<M: ?Sized> {
    one_in_two: Option<Box<M>>,
    two_in_one: Option<Box<M>>,
    symmetric: Option<Box<M>>,
    /// The symmetric key was written phase 2 first.
    symmetric_reversed: bool,
}

impl<M: ?Sized> BlendedModel<M> {
    /// Sorts the models of a configuration section by regime.
    ///
    /// Returns `Ok(None)` if the section configured nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ClosureError::UnknownPhase`] if a key names a phase other
    /// than `phases`.
    pub fn from_models(
        kind: ClosureKind,
        models: Vec<(PhasePairKey, Box<M>)>,
        phases: [&str; 2],
    ) -> Result<Option<Self>, ClosureError> {
        let mut blended = Self {
            one_in_two: None,
            two_in_one: None,
            symmetric: None,
            symmetric_reversed: false,
        };
        for (key, model) in models {
            let (a, b) = key.phases();
            let slot = match (key.is_ordered(), a, b) {
                (false, a, _) if key.contains(phases[0]) && key.contains(phases[1]) => {
                    blended.symmetric_reversed = a != phases[0];
                    &mut blended.symmetric
                }
                (true, a, b) if a == phases[0] && b == phases[1] => &mut blended.one_in_two,
                (true, a, b) if a == phases[1] && b == phases[0] => &mut blended.two_in_one,
                _ => {
                    return Err(ClosureError::UnknownPhase {
                        kind,
                        pair: key.to_string(),
                    });
                }
            };
            *slot = Some(model);
        }
        Ok((!blended.is_empty()).then_some(blended))
    }

    /// `1.0` if the symmetric key was written with phase 1 first, `-1.0`
    /// otherwise.
    ///
    /// Directional quantities on unordered keys, such as a mass rate into
    /// the first-named phase, are reoriented with this sign.
    #[must_use]
    pub fn symmetric_orientation(&self) -> f64 {
        if self.symmetric_reversed { -1.0 } else { 1.0 }
    }

    fn is_empty(&self) -> bool {
        self.one_in_two.is_none() && self.two_in_one.is_none() && self.symmetric.is_none()
    }

    /// Evaluates the blended coefficient of one cell.
    ///
    /// Weights of absent regimes are redistributed over the configured ones,
    /// so a single configured model applies everywhere.
    pub fn evaluate(
        &self,
        blending: &LinearBlending,
        state: &PairState,
        eval: impl Fn(&M, &PairCell) -> f64,
    ) -> f64 {
        let weights = blending.weights(state.phase1.alpha, state.phase2.alpha);
        let regimes = [
            (self.one_in_two.as_deref(), weights[0]),
            (self.two_in_one.as_deref(), weights[1]),
            (self.symmetric.as_deref(), weights[2]),
        ];

        let total: f64 = regimes
            .iter()
            .filter(|(model, _)| model.is_some())
            .map(|(_, w)| w)
            .sum();
        let configured = regimes.iter().filter(|(model, _)| model.is_some()).count();

        let cells = [state.one_in_two(), state.two_in_one(), state.unordered()];
        regimes
            .iter()
            .zip(&cells)
            .filter_map(|((model, w), cell)| {
                let model = (*model)?;
                let weight = if total < WEIGHT_FLOOR {
                    1.0 / configured as f64
                } else {
                    w / total
                };
                (weight > 0.0).then(|| weight * eval(model, cell))
            })
            .sum()
    }
}
