use serde::Deserialize;
use uom::si::{
    f64::{MassDensity, SpecificHeatCapacity},
    mass_density::kilogram_per_cubic_meter,
    specific_heat_capacity::joule_per_kilogram_kelvin,
};

use crate::support::units::SpecificGasConstant;

use super::{ConstantDensity, PerfectGas, ThermoError};

/// Named fluids with preset property constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Fluid {
    Air,
    CarbonDioxide,
    Water,
}

impl Fluid {
    /// Constant-density model for this fluid at 25 °C.
    ///
    /// # Errors
    ///
    /// Never fails for the presets; the signature matches [`ConstantDensity::new`].
    pub fn constant_density(self) -> Result<ConstantDensity, ThermoError> {
        let (rho, cp) = match self {
            Self::Air => (1.184, 1005.0),
            Self::CarbonDioxide => (1.808, 844.0),
            Self::Water => (997.047, 4184.0),
        };
        ConstantDensity::new(
            MassDensity::new::<kilogram_per_cubic_meter>(rho),
            SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(cp),
        )
    }

    /// Perfect-gas model for this fluid.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoError::InvalidParameter`] for liquids.
    pub fn perfect_gas(self) -> Result<PerfectGas, ThermoError> {
        let (r, cp) = match self {
            Self::Air => (287.053, 1005.0),
            Self::CarbonDioxide => (188.92, 844.0),
            Self::Water => return Err(ThermoError::parameter("water is not a perfect gas")),
        };
        PerfectGas::new(
            SpecificGasConstant::new::<joule_per_kilogram_kelvin>(r),
            SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(cp),
        )
    }
}
