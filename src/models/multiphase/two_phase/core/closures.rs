//! The configured closure models of the pair and their cell coefficients.

use rayon::prelude::*;
use serde_json::Value;

use crate::support::{
    closure::{
        BlendedModel, ClosureKind, ClosureRegistry, DragModel, HeatTransferModel, LinearBlending,
        MassTransferModel, PairCell, PairState, PhasePairKey, Registry, SurfaceTensionModel,
        TurbulentDispersionModel, VirtualMassModel,
    },
    field::Location,
};

use super::{ConfigError, Phase, TwoPhaseError, config::CaseConfig};

/// Interfacial coefficients of every cell, evaluated together.
///
/// All values are per unit volume of mixture. `dmdt` is positive for mass
/// moving from phase 2 into phase 1.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Coefficients {
    /// Drag coefficient `K_d`, kg/m³·s.
    pub kd: Vec<f64>,
    /// Virtual-mass coefficient `V_m`, kg/m³.
    pub vm: Vec<f64>,
    /// Interfacial mass rate `ṁ`, kg/m³·s.
    pub dmdt: Vec<f64>,
    /// Surface tension `σ`, N/m.
    pub sigma: Vec<f64>,
    /// Heat transfer coefficient `h_if`, W/m³·K.
    pub h: Vec<f64>,
    /// Turbulent dispersion coefficient `D`, Pa.
    pub dispersion: Vec<f64>,
}

/// Every closure kind configured for the pair.
#[derive(Debug)]
pub(crate) struct ClosureSet {
    pair: PhasePairKey,
    blending: LinearBlending,
    drag: BlendedModel<dyn DragModel>,
    virtual_mass: Option<BlendedModel<dyn VirtualMassModel>>,
    heat_transfer: Option<BlendedModel<dyn HeatTransferModel>>,
    mass_transfer: Option<BlendedModel<dyn MassTransferModel>>,
    surface_tension: Option<BlendedModel<dyn SurfaceTensionModel>>,
    turbulent_dispersion: Option<BlendedModel<dyn TurbulentDispersionModel>>,
    transfers_mass: bool,
}

impl ClosureSet {
    /// Builds the models of every configured section.
    ///
    /// Drag is required; the other kinds default to no exchange.
    pub(crate) fn build(
        config: &CaseConfig,
        registry: &ClosureRegistry,
    ) -> Result<Self, ConfigError> {
        let phases = [config.names[0].as_str(), config.names[1].as_str()];
        let pair = PhasePairKey::unordered(phases[0], phases[1]);

        let blending = match &config.blending {
            Some(section) => LinearBlending::from_config(section, phases)?,
            None => LinearBlending::default(),
        };

        let drag = blended(config, ClosureKind::Drag, &registry.drag, phases)?.ok_or_else(|| {
            ConfigError::MissingPair {
                kind: ClosureKind::Drag,
                pair: pair.to_string(),
            }
        })?;

        let transfers_mass = config
            .section(ClosureKind::MassTransfer)
            .and_then(Value::as_object)
            .is_some_and(|entries| {
                entries
                    .values()
                    .any(|entry| entry.get("type").and_then(Value::as_str) != Some("none"))
            });

        Ok(Self {
            pair,
            blending,
            drag,
            virtual_mass: blended(
                config,
                ClosureKind::VirtualMass,
                &registry.virtual_mass,
                phases,
            )?,
            heat_transfer: blended(
                config,
                ClosureKind::HeatTransfer,
                &registry.heat_transfer,
                phases,
            )?,
            mass_transfer: blended(
                config,
                ClosureKind::MassTransfer,
                &registry.mass_transfer,
                phases,
            )?,
            surface_tension: blended(
                config,
                ClosureKind::SurfaceTension,
                &registry.surface_tension,
                phases,
            )?,
            turbulent_dispersion: blended(
                config,
                ClosureKind::TurbulentDispersion,
                &registry.turbulent_dispersion,
                phases,
            )?,
            transfers_mass,
        })
    }

    /// True if a mass transfer model other than `none` is configured.
    pub(crate) fn transfers_mass(&self) -> bool {
        self.transfers_mass
    }

    pub(crate) fn has_surface_tension(&self) -> bool {
        self.surface_tension.is_some()
    }

    pub(crate) fn has_turbulent_dispersion(&self) -> bool {
        self.turbulent_dispersion.is_some()
    }

    /// Evaluates all coefficients from the current phase state.
    ///
    /// # Errors
    ///
    /// Returns [`TwoPhaseError::NonFinite`] naming the first cell where a
    /// model produced NaN or infinity.
    pub(crate) fn evaluate(
        &self,
        phase1: &Phase,
        phase2: &Phase,
    ) -> Result<Coefficients, TwoPhaseError> {
        let n = phase1.alpha().len();
        let u1 = phase1.u().values();
        let u2 = phase2.u().values();
        let orientation = self
            .mass_transfer
            .as_ref()
            .map_or(1.0, BlendedModel::symmetric_orientation);

        let values: Vec<[f64; 6]> = (0..n)
            .into_par_iter()
            .map(|i| {
                let state = PairState {
                    phase1: phase1.cell(i),
                    phase2: phase2.cell(i),
                    slip: (u1[i] - u2[i]).length(),
                };
                let blend = &self.blending;
                [
                    self.drag.evaluate(blend, &state, |m, c| m.k(c)),
                    optional(self.virtual_mass.as_ref(), blend, &state, |m, c| m.k(c)),
                    orientation
                        * optional(self.mass_transfer.as_ref(), blend, &state, |m, c| m.dmdt(c)),
                    optional(self.surface_tension.as_ref(), blend, &state, |m, c| m.sigma(c)),
                    optional(self.heat_transfer.as_ref(), blend, &state, |m, c| m.k(c)),
                    optional(self.turbulent_dispersion.as_ref(), blend, &state, |m, c| {
                        m.d(c)
                    }),
                ]
            })
            .collect();

        const NAMES: [&str; 6] = ["Kd", "Vm", "dmdt", "sigma", "h", "D"];
        for (cell, row) in values.iter().enumerate() {
            if let Some(kind) = row.iter().position(|v| !v.is_finite()) {
                return Err(TwoPhaseError::NonFinite {
                    field: format!("{}.{}", NAMES[kind], self.pair),
                    location: Location::Cell(cell),
                    reason: "closure model output".to_owned(),
                });
            }
        }

        let column = |k: usize| values.iter().map(|row| row[k]).collect();
        Ok(Coefficients {
            kd: column(0),
            vm: column(1),
            dmdt: column(2),
            sigma: column(3),
            h: column(4),
            dispersion: column(5),
        })
    }
}

fn blended<M: ?Sized>(
    config: &CaseConfig,
    kind: ClosureKind,
    registry: &Registry<M>,
    phases: [&str; 2],
) -> Result<Option<BlendedModel<M>>, ConfigError> {
    let Some(section) = config.section(kind) else {
        return Ok(None);
    };
    let models = registry.build_section(section)?;
    Ok(BlendedModel::from_models(kind, models, phases)?)
}

fn optional<M: ?Sized>(
    model: Option<&BlendedModel<M>>,
    blending: &LinearBlending,
    state: &PairState,
    eval: impl Fn(&M, &PairCell) -> f64,
) -> f64 {
    model.map_or(0.0, |model| model.evaluate(blending, state, eval))
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use serde_json::json;

    use crate::models::multiphase::two_phase::core::test_support::air_water_dict;

    fn build(dict: &Value) -> Result<ClosureSet, ConfigError> {
        let config = CaseConfig::parse(dict)?;
        ClosureSet::build(&config, &ClosureRegistry::with_builtins())
    }

    #[test]
    fn drag_is_required() {
        let mut dict = air_water_dict(0.2, 10.0);
        dict.as_object_mut().unwrap().remove("drag");
        match build(&dict) {
            Err(ConfigError::MissingPair { kind, pair }) => {
                assert_eq!(kind, ClosureKind::Drag);
                assert_eq!(pair, "air,water");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn none_mass_transfer_does_not_transfer_mass() {
        let mut dict = air_water_dict(0.2, 10.0);
        assert!(!build(&dict).unwrap().transfers_mass());

        dict["massTransfer"] = json!({ "air,water": { "type": "none" } });
        assert!(!build(&dict).unwrap().transfers_mass());

        dict["massTransfer"] = json!({ "air,water": { "type": "constant", "dmdt": 0.1 } });
        assert!(build(&dict).unwrap().transfers_mass());
    }

    #[test]
    fn unknown_model_names_the_alternatives() {
        let mut dict = air_water_dict(0.2, 10.0);
        dict["virtualMass"] = json!({ "air_in_water": { "type": "Lamb" } });
        let err = build(&dict).unwrap_err();
        assert!(err.to_string().contains("Zuber"), "{err}");
    }

    #[test]
    fn mass_rate_follows_the_written_key() {
        let mut dict = air_water_dict(0.2, 10.0);
        dict["massTransfer"] = json!({ "water,air": { "type": "constant", "dmdt": 0.5 } });
        let set = build(&dict).unwrap();

        let system = crate::models::multiphase::two_phase::core::test_support::system(dict);
        let coefficients = set.evaluate(system.phase1(), system.phase2()).unwrap();
        // Into water, which is phase 2, so out of phase 1.
        assert!(coefficients.dmdt.iter().all(|m| (*m + 0.5).abs() < 1e-12));
        assert!(coefficients.kd.iter().all(|k| (*k - 10.0).abs() < 1e-12));
        assert_relative_eq!(coefficients.vm[0], 0.0);
    }
}
