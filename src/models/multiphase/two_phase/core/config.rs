//! The case dictionary of a two-phase system.
//!
//! The dictionary is a JSON object. Its top level names the two phases,
//! holds one sub-dictionary per phase, one section per closure kind, and the
//! volume-fraction controls:
//!
//! ```json
//! {
//!   "phases": ["air", "water"],
//!   "air": {
//!     "thermo": { "type": "constantDensity", "fluid": "air" },
//!     "diameterModel": { "type": "constant", "d": 3e-3 },
//!     "alpha": 0.1,
//!     "viscosity": 1.8e-5,
//!     "thermalConductivity": 0.026
//!   },
//!   "water": { "...": "..." },
//!   "drag": { "air_in_water": { "type": "SchillerNaumann" } },
//!   "nAlphaSubCycles": 3,
//!   "cAlpha": 1.0,
//!   "gravity": [0.0, -9.81, 0.0]
//! }
//! ```

use std::collections::BTreeMap;

use glam::DVec3;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use uom::si::{
    f64::{MassDensity, SpecificHeatCapacity},
    mass_density::kilogram_per_cubic_meter,
    specific_heat_capacity::joule_per_kilogram_kelvin,
};

use crate::support::{
    closure::ClosureKind,
    constraint::{Constrained, Constraint, NonNegative, StrictlyPositive, UnitInterval},
    thermo::{ConstantDensity, Fluid, PerfectGas, PhaseThermo},
    units::SpecificGasConstant,
};

use super::ConfigError;

/// Parsed top level of a case dictionary.
#[derive(Debug)]
pub(crate) struct CaseConfig {
    pub(crate) names: [String; 2],
    pub(crate) phases: [PhaseConfig; 2],
    pub(crate) controls: AlphaControls,
    pub(crate) gravity: DVec3,
    pub(crate) pressure: f64,
    sections: BTreeMap<&'static str, Value>,
    pub(crate) blending: Option<Value>,
}

impl CaseConfig {
    pub(crate) fn parse(root: &Value) -> Result<Self, ConfigError> {
        if !root.is_object() {
            return Err(ConfigError::invalid("<root>", "expected an object"));
        }

        let names: [String; 2] = parse_entry(root, "phases")?;
        if names[0] == names[1] {
            return Err(ConfigError::invalid(
                "phases",
                format!("phase `{}` is listed twice", names[0]),
            ));
        }

        let phase = |name: &str| -> Result<PhaseConfig, ConfigError> { parse_entry(root, name) };
        let phases = [phase(&names[0])?, phase(&names[1])?];

        let controls: AlphaControls = parse_value("<controls>", root)?;
        controls.validate()?;

        let gravity = match root.get("gravity") {
            Some(value) => DVec3::from_array(parse_value("gravity", value)?),
            None => DVec3::ZERO,
        };
        let pressure = match root.get("pressure") {
            Some(value) => check::<StrictlyPositive>("pressure", parse_value("pressure", value)?)?,
            None => DEFAULT_PRESSURE,
        };

        let sections = ClosureKind::ALL
            .iter()
            .filter_map(|kind| {
                root.get(kind.section())
                    .map(|value| (kind.section(), value.clone()))
            })
            .collect();

        Ok(Self {
            names,
            phases,
            controls,
            gravity,
            pressure,
            sections,
            blending: root.get("blending").cloned(),
        })
    }

    /// The closure section of a kind, if configured.
    pub(crate) fn section(&self, kind: ClosureKind) -> Option<&Value> {
        self.sections.get(kind.section())
    }
}

/// Initial and outlet mixture pressure when the dictionary has none, Pa.
const DEFAULT_PRESSURE: f64 = 1.0e5;

/// Controls of the volume-fraction solve.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlphaControls {
    /// Explicit sub-steps per solve.
    pub n_alpha_sub_cycles: usize,

    /// Corrections per solve, each restarting from the old-time fraction.
    pub n_alpha_corr: usize,

    /// Interface compression coefficient.
    pub c_alpha: f64,

    pub alpha_min: f64,
    pub alpha_max: f64,

    /// Largest excursion outside `[alpha_min, alpha_max]` that clipping may
    /// absorb before the step fails.
    pub alpha_excursion_tolerance: f64,
}

impl Default for AlphaControls {
    fn default() -> Self {
        Self {
            n_alpha_sub_cycles: 3,
            n_alpha_corr: 1,
            c_alpha: 0.0,
            alpha_min: 0.0,
            alpha_max: 1.0,
            alpha_excursion_tolerance: 1e-2,
        }
    }
}

impl AlphaControls {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.n_alpha_sub_cycles == 0 {
            return Err(ConfigError::invalid("nAlphaSubCycles", "must be at least 1"));
        }
        if self.n_alpha_corr == 0 {
            return Err(ConfigError::invalid("nAlphaCorr", "must be at least 1"));
        }
        if !self.c_alpha.is_finite() {
            return Err(ConfigError::invalid("cAlpha", "must be finite"));
        }
        check::<NonNegative>("cAlpha", self.c_alpha)?;
        let bounds = 0.0..=1.0;
        if !(bounds.contains(&self.alpha_min)
            && bounds.contains(&self.alpha_max)
            && self.alpha_min < self.alpha_max)
        {
            return Err(ConfigError::invalid(
                "alphaMin",
                format!(
                    "need 0 <= alphaMin ({}) < alphaMax ({}) <= 1",
                    self.alpha_min, self.alpha_max
                ),
            ));
        }
        if !(self.alpha_excursion_tolerance.is_finite() && self.alpha_excursion_tolerance >= 0.0) {
            return Err(ConfigError::invalid(
                "alphaExcursionTolerance",
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// One phase sub-dictionary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct PhaseConfig {
    pub(crate) thermo: ThermoConfig,
    pub(crate) diameter_model: DiameterConfig,
    pub(crate) alpha: Option<ScalarInit>,
    #[serde(default = "default_residual_alpha")]
    pub(crate) residual_alpha: f64,
    #[serde(default = "default_alpha_max")]
    pub(crate) alpha_max: f64,
    pub(crate) viscosity: f64,
    pub(crate) thermal_conductivity: f64,
    #[serde(default = "default_temperature")]
    pub(crate) temperature: ScalarInit,
    #[serde(default)]
    pub(crate) velocity: VectorInit,
    #[serde(default)]
    pub(crate) species: BTreeMap<String, ScalarInit>,
    #[serde(default)]
    pub(crate) inlets: BTreeMap<String, InletConfig>,
}

fn default_residual_alpha() -> f64 {
    1e-6
}

fn default_alpha_max() -> f64 {
    1.0
}

fn default_temperature() -> ScalarInit {
    ScalarInit::Uniform(300.0)
}

/// Equation-of-state selection.
///
/// Either names a preset `fluid` or gives the constants directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", deny_unknown_fields)]
pub(crate) enum ThermoConfig {
    ConstantDensity {
        fluid: Option<Fluid>,
        rho: Option<f64>,
        cp: Option<f64>,
    },
    PerfectGas {
        fluid: Option<Fluid>,
        #[serde(rename = "R")]
        r: Option<f64>,
        cp: Option<f64>,
    },
}

impl ThermoConfig {
    pub(crate) fn build(&self, phase: &str) -> Result<Box<dyn PhaseThermo>, ConfigError> {
        let key = format!("{phase}.thermo");
        match *self {
            Self::ConstantDensity {
                fluid: Some(fluid),
                rho: None,
                cp: None,
            } => Ok(Box::new(fluid.constant_density()?)),
            Self::ConstantDensity {
                fluid: None,
                rho: Some(rho),
                cp: Some(cp),
            } => Ok(Box::new(ConstantDensity::new(
                MassDensity::new::<kilogram_per_cubic_meter>(rho),
                SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(cp),
            )?)),
            Self::PerfectGas {
                fluid: Some(fluid),
                r: None,
                cp: None,
            } => Ok(Box::new(fluid.perfect_gas()?)),
            Self::PerfectGas {
                fluid: None,
                r: Some(r),
                cp: Some(cp),
            } => Ok(Box::new(PerfectGas::new(
                SpecificGasConstant::new::<joule_per_kilogram_kelvin>(r),
                SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(cp),
            )?)),
            _ => Err(ConfigError::invalid(
                key,
                "give either `fluid` or all of the model constants",
            )),
        }
    }
}

/// Particle or bubble diameter model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", deny_unknown_fields)]
pub(crate) enum DiameterConfig {
    /// A fixed diameter, m.
    Constant { d: f64 },
    /// Gas bubbles that keep their mass at constant temperature,
    /// `d = d0 (p0 / p)^⅓`.
    Isothermal { d0: f64, p0: f64 },
}

/// A scalar initial value, uniform or given per cell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum ScalarInit {
    Uniform(f64),
    PerCell(Vec<f64>),
}

impl ScalarInit {
    pub(crate) fn expand(&self, key: &str, n_cells: usize) -> Result<Vec<f64>, ConfigError> {
        match self {
            Self::Uniform(value) => Ok(vec![*value; n_cells]),
            Self::PerCell(values) if values.len() == n_cells => Ok(values.clone()),
            Self::PerCell(values) => Err(ConfigError::invalid(
                key,
                format!("{} values for {n_cells} cells", values.len()),
            )),
        }
    }
}

/// A vector initial value, uniform or given per cell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum VectorInit {
    Uniform([f64; 3]),
    PerCell(Vec<[f64; 3]>),
}

impl Default for VectorInit {
    fn default() -> Self {
        Self::Uniform([0.0; 3])
    }
}

impl VectorInit {
    pub(crate) fn expand(&self, key: &str, n_cells: usize) -> Result<Vec<DVec3>, ConfigError> {
        match self {
            Self::Uniform(value) => Ok(vec![DVec3::from_array(*value); n_cells]),
            Self::PerCell(values) if values.len() == n_cells => {
                Ok(values.iter().copied().map(DVec3::from_array).collect())
            }
            Self::PerCell(values) => Err(ConfigError::invalid(
                key,
                format!("{} values for {n_cells} cells", values.len()),
            )),
        }
    }
}

/// Values a phase carries in through an inlet patch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct InletConfig {
    pub(crate) alpha: Option<f64>,
    #[serde(default)]
    pub(crate) velocity: [f64; 3],
    pub(crate) temperature: Option<f64>,
    #[serde(default)]
    pub(crate) species: BTreeMap<String, f64>,
}

/// Deserializes `root[key]`, reporting a missing key by name.
fn parse_entry<T: DeserializeOwned>(root: &Value, key: &str) -> Result<T, ConfigError> {
    let value = root.get(key).ok_or_else(|| ConfigError::Missing {
        key: key.to_owned(),
    })?;
    parse_value(key, value)
}

pub(crate) fn parse_value<T: DeserializeOwned>(context: &str, value: &Value) -> Result<T, ConfigError> {
    serde_json::from_value(value.clone()).map_err(|source| ConfigError::Parse {
        context: context.to_owned(),
        source,
    })
}

/// Checks a scalar against a constraint, naming the entry on failure.
pub(crate) fn check<C: Constraint<f64>>(key: &str, value: f64) -> Result<f64, ConfigError> {
    Constrained::<f64, C>::new(value)
        .map(Constrained::into_inner)
        .map_err(|err| ConfigError::invalid(key, err.to_string()))
}

/// Checks that a value lies in the closed unit interval.
pub(crate) fn check_fraction(key: &str, value: f64) -> Result<f64, ConfigError> {
    check::<UnitInterval>(key, value)
}
