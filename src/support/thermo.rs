//! Per-phase equations of state.
//!
//! Each phase owns a [`PhaseThermo`] model that supplies its density as a
//! function of temperature and pressure, and a constant heat capacity used
//! for sensible enthalpy. Two families are provided:
//!
//! - [`ConstantDensity`]: incompressible liquids, `ρ = ρ_ref`.
//! - [`PerfectGas`]: ideal gas with constant heat capacities, `ρ = p / (R·T)`.
//!
//! Enthalpies are sensible enthalpies relative to a reference temperature,
//! `h = cp·(T - T_ref)`.

mod constant_density;
mod error;
mod fluid;
mod perfect_gas;

use std::fmt::Debug;

use uom::si::f64::{MassDensity, Pressure, SpecificHeatCapacity, ThermodynamicTemperature};

use crate::support::units::SpecificEnthalpy;

pub use constant_density::ConstantDensity;
pub use error::ThermoError;
pub use fluid::Fluid;
pub use perfect_gas::PerfectGas;

/// Thermodynamic behaviour of one phase.
pub trait PhaseThermo: Debug + Send + Sync {
    /// Density at the given state.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoError`] if the state is outside the model's domain.
    fn density(
        &self,
        temperature: ThermodynamicTemperature,
        pressure: Pressure,
    ) -> Result<MassDensity, ThermoError>;

    /// Constant-pressure specific heat capacity.
    fn cp(&self) -> SpecificHeatCapacity;

    /// Sensible specific enthalpy at the given temperature.
    fn enthalpy(&self, temperature: ThermodynamicTemperature) -> SpecificEnthalpy;

    /// True if density does not depend on pressure.
    fn is_incompressible(&self) -> bool;
}
