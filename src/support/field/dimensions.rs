use std::{
    fmt,
    ops::{Div, Mul},
};

/// Exponents of the SI base dimensions carried by a field.
///
/// Only the dimensions that appear in two-phase flow are tracked: mass,
/// length, time, temperature and amount of substance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimensions {
    pub mass: i8,
    pub length: i8,
    pub time: i8,
    pub temperature: i8,
    pub moles: i8,
}

impl Dimensions {
    #[must_use]
    pub const fn new(mass: i8, length: i8, time: i8, temperature: i8, moles: i8) -> Self {
        Self {
            mass,
            length,
            time,
            temperature,
            moles,
        }
    }

    pub const NONE: Self = Self::new(0, 0, 0, 0, 0);
    pub const LENGTH: Self = Self::new(0, 1, 0, 0, 0);
    pub const TIME: Self = Self::new(0, 0, 1, 0, 0);
    pub const TEMPERATURE: Self = Self::new(0, 0, 0, 1, 0);
    pub const VELOCITY: Self = Self::new(0, 1, -1, 0, 0);
    pub const DENSITY: Self = Self::new(1, -3, 0, 0, 0);
    pub const PRESSURE: Self = Self::new(1, -1, -2, 0, 0);
    pub const SPECIFIC_ENERGY: Self = Self::new(0, 2, -2, 0, 0);
    /// m³/s, the unit of a volumetric face flux.
    pub const VOLUMETRIC_FLUX: Self = Self::new(0, 3, -1, 0, 0);
    /// kg/s, the unit of a face mass flux.
    pub const MASS_FLUX: Self = Self::new(1, 0, -1, 0, 0);
    /// kg/m³·s, the unit of `ṁ` and of the drag coefficient.
    pub const VOLUMETRIC_MASS_RATE: Self = Self::new(1, -3, -1, 0, 0);
    /// 1/s, the unit of a volumetric continuity error.
    pub const RATE: Self = Self::new(0, 0, -1, 0, 0);
}

impl Mul for Dimensions {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.mass + rhs.mass,
            self.length + rhs.length,
            self.time + rhs.time,
            self.temperature + rhs.temperature,
            self.moles + rhs.moles,
        )
    }
}

impl Div for Dimensions {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self::new(
            self.mass - rhs.mass,
            self.length - rhs.length,
            self.time - rhs.time,
            self.temperature - rhs.temperature,
            self.moles - rhs.moles,
        )
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {} {} {} {}]",
            self.mass, self.length, self.time, self.temperature, self.moles
        )
    }
}
