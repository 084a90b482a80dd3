use uom::{
    si::{ISQ, Quantity, SI},
    typenum::{N1, N2, P2, Z0},
};

/// Specific gas constant, J/kg·K in SI.
pub type SpecificGasConstant = Quantity<ISQ<P2, Z0, N2, Z0, N1, Z0, Z0>, SI<f64>, f64>;

/// Specific enthalpy, J/kg in SI.
pub type SpecificEnthalpy = Quantity<ISQ<P2, Z0, N2, Z0, Z0, Z0, Z0>, SI<f64>, f64>;

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::{
        f64::ThermodynamicTemperature, specific_heat_capacity::joule_per_kilogram_kelvin,
        thermodynamic_temperature::kelvin,
    };

    #[test]
    fn gas_constant_times_temperature_is_enthalpy() {
        let r = SpecificGasConstant::new::<joule_per_kilogram_kelvin>(287.0);
        let t = ThermodynamicTemperature::new::<kelvin>(300.0);
        let rt: SpecificEnthalpy = r * t;
        assert_relative_eq!(rt.value, 86_100.0);
    }
}
