//! Extensions to [`uom`].
//!
//! This crate uses [`uom`] for physical quantities at its API boundaries
//! (time steps, phase properties, temperatures). Field arithmetic inside
//! the solver works on SI `f64` values and tracks units at runtime through
//! [`Dimensions`](crate::support::field::Dimensions).
//!
//! This module provides the thermodynamic quantities that [`uom`] does not
//! define:
//!
//! ```
//! use twine_two_phase::support::units::SpecificGasConstant;
//! use uom::si::specific_heat_capacity::joule_per_kilogram_kelvin;
//!
//! let r = SpecificGasConstant::new::<joule_per_kilogram_kelvin>(287.0);
//! assert_eq!(r.value, 287.0);
//! ```

mod quantities;

pub use quantities::{SpecificEnthalpy, SpecificGasConstant};
