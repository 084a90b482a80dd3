use uom::si::{
    f64::{
        MassDensity, Pressure, SpecificHeatCapacity, TemperatureInterval,
        ThermodynamicTemperature,
    },
    mass_density::kilogram_per_cubic_meter,
    pressure::pascal,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    temperature_interval,
    thermodynamic_temperature::{degree_celsius, kelvin},
};

use crate::support::{
    constraint::{Constraint, StrictlyPositive},
    units::{SpecificEnthalpy, SpecificGasConstant},
};

use super::{PhaseThermo, ThermoError};

/// Calorically perfect gas, `p = ρ·R·T` with constant `cp`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfectGas {
    r: SpecificGasConstant,
    cp: SpecificHeatCapacity,
    t_ref: ThermodynamicTemperature,
}

impl PerfectGas {
    /// Creates a model with `T_ref = 25 °C`.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoError::InvalidParameter`] if `R` or `cp` is not
    /// strictly positive, or if `cv = cp - R` is not.
    pub fn new(r: SpecificGasConstant, cp: SpecificHeatCapacity) -> Result<Self, ThermoError> {
        StrictlyPositive::check(&r)
            .map_err(|e| ThermoError::parameter(format!("gas constant {r:?}: {e}")))?;
        StrictlyPositive::check(&cp)
            .map_err(|e| ThermoError::parameter(format!("cp {cp:?}: {e}")))?;

        let cv = cp.get::<joule_per_kilogram_kelvin>() - r.get::<joule_per_kilogram_kelvin>();
        if cv <= 0.0 {
            return Err(ThermoError::parameter(format!(
                "cv = cp - R must be positive, got {cv} J/kg·K"
            )));
        }

        Ok(Self {
            r,
            cp,
            t_ref: ThermodynamicTemperature::new::<degree_celsius>(25.0),
        })
    }

    #[must_use]
    pub fn gas_constant(&self) -> SpecificGasConstant {
        self.r
    }
}

impl PhaseThermo for PerfectGas {
    fn density(
        &self,
        temperature: ThermodynamicTemperature,
        pressure: Pressure,
    ) -> Result<MassDensity, ThermoError> {
        let t = temperature.get::<kelvin>();
        let p = pressure.get::<pascal>();
        if t.is_nan() || p.is_nan() || t <= 0.0 || p <= 0.0 {
            return Err(ThermoError::OutOfDomain {
                context: format!("T = {t} K, p = {p} Pa"),
            });
        }
        let r = self.r.get::<joule_per_kilogram_kelvin>();
        Ok(MassDensity::new::<kilogram_per_cubic_meter>(p / (r * t)))
    }

    fn cp(&self) -> SpecificHeatCapacity {
        self.cp
    }

    fn enthalpy(&self, temperature: ThermodynamicTemperature) -> SpecificEnthalpy {
        let dt = temperature.get::<kelvin>() - self.t_ref.get::<kelvin>();
        self.cp * TemperatureInterval::new::<temperature_interval::kelvin>(dt)
    }

    fn is_incompressible(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::pressure::atmosphere;

    use crate::support::thermo::Fluid;

    #[test]
    fn air_at_standard_conditions() {
        let air = Fluid::Air.perfect_gas().unwrap();
        let rho = air
            .density(
                ThermodynamicTemperature::new::<degree_celsius>(20.0),
                Pressure::new::<atmosphere>(1.0),
            )
            .unwrap();
        assert_relative_eq!(
            rho.get::<kilogram_per_cubic_meter>(),
            1.204,
            max_relative = 1e-3
        );
    }

    #[test]
    fn rejects_vacuum() {
        let air = Fluid::Air.perfect_gas().unwrap();
        let result = air.density(
            ThermodynamicTemperature::new::<kelvin>(300.0),
            Pressure::new::<pascal>(0.0),
        );
        assert!(matches!(result, Err(ThermoError::OutOfDomain { .. })));
    }

    #[test]
    fn rejects_non_physical_cv() {
        let result = PerfectGas::new(
            SpecificGasConstant::new::<joule_per_kilogram_kelvin>(1000.0),
            SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(900.0),
        );
        assert!(matches!(result, Err(ThermoError::InvalidParameter { .. })));
    }
}
