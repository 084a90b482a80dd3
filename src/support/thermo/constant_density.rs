use uom::si::{
    f64::{
        MassDensity, Pressure, SpecificHeatCapacity, TemperatureInterval,
        ThermodynamicTemperature,
    },
    temperature_interval,
    thermodynamic_temperature::{degree_celsius, kelvin},
};

use crate::support::{
    constraint::{Constraint, StrictlyPositive},
    units::SpecificEnthalpy,
};

use super::{PhaseThermo, ThermoError};

/// Incompressible liquid with constant density and heat capacity.
///
/// Pressure has no effect on the density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantDensity {
    rho: MassDensity,
    cp: SpecificHeatCapacity,
    t_ref: ThermodynamicTemperature,
}

impl ConstantDensity {
    /// Creates a model with `T_ref = 25 °C`.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoError::InvalidParameter`] if `rho` or `cp` is not
    /// strictly positive.
    pub fn new(rho: MassDensity, cp: SpecificHeatCapacity) -> Result<Self, ThermoError> {
        StrictlyPositive::check(&rho)
            .map_err(|e| ThermoError::parameter(format!("density {rho:?}: {e}")))?;
        StrictlyPositive::check(&cp)
            .map_err(|e| ThermoError::parameter(format!("cp {cp:?}: {e}")))?;
        Ok(Self {
            rho,
            cp,
            t_ref: ThermodynamicTemperature::new::<degree_celsius>(25.0),
        })
    }
}

impl PhaseThermo for ConstantDensity {
    fn density(
        &self,
        _temperature: ThermodynamicTemperature,
        _pressure: Pressure,
    ) -> Result<MassDensity, ThermoError> {
        Ok(self.rho)
    }

    fn cp(&self) -> SpecificHeatCapacity {
        self.cp
    }

    fn enthalpy(&self, temperature: ThermodynamicTemperature) -> SpecificEnthalpy {
        let dt = temperature.get::<kelvin>() - self.t_ref.get::<kelvin>();
        self.cp * TemperatureInterval::new::<temperature_interval::kelvin>(dt)
    }

    fn is_incompressible(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::{
        mass_density::kilogram_per_cubic_meter, pressure::bar,
        specific_heat_capacity::joule_per_kilogram_kelvin,
    };

    #[test]
    fn density_ignores_pressure() {
        let water = ConstantDensity::new(
            MassDensity::new::<kilogram_per_cubic_meter>(998.2),
            SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(4184.0),
        )
        .unwrap();

        let t = ThermodynamicTemperature::new::<degree_celsius>(20.0);
        for p in [1.0, 10.0] {
            let rho = water.density(t, Pressure::new::<bar>(p)).unwrap();
            assert_relative_eq!(rho.get::<kilogram_per_cubic_meter>(), 998.2);
        }

        let h = water.enthalpy(ThermodynamicTemperature::new::<degree_celsius>(35.0));
        assert_relative_eq!(h.value, 4184.0 * 10.0, epsilon = 1e-8);
    }

    #[test]
    fn rejects_zero_density() {
        let result = ConstantDensity::new(
            MassDensity::new::<kilogram_per_cubic_meter>(0.0),
            SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(4184.0),
        );
        assert!(matches!(result, Err(ThermoError::InvalidParameter { .. })));
    }
}
