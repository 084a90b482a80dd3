//! Cell and face fields with runtime dimension checking.
//!
//! A [`Field`] is a named container holding one value per cell or one value
//! per face, tagged with a [`Dimensions`] set. Addition and subtraction
//! require equal dimensions; multiplication and division combine them.
//! Dimensional mismatches are programming errors and surface as
//! [`FieldError::Dimension`].
//!
//! The location is a type parameter, so a face field cannot be added to a
//! cell field by accident:
//!
//! ```
//! use twine_two_phase::support::field::{Dimensions, VolScalarField};
//!
//! let alpha = VolScalarField::uniform("alpha.air", Dimensions::NONE, 0.1, 4);
//! let water = alpha.map("alpha.water", |a| 1.0 - a);
//! let sum = alpha.checked_add(&water).unwrap();
//! assert!(sum.values().iter().all(|v| (*v - 1.0).abs() < 1e-15));
//! ```

mod dimensions;
mod error;

use std::{
    marker::PhantomData,
    ops::{Add, Mul, Sub},
};

use glam::DVec3;

pub use dimensions::Dimensions;
pub use error::{FieldError, Location};

/// Marker for fields with one value per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cells;

/// Marker for fields with one value per face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Faces;

/// Field location markers.
pub trait FieldLocation: Copy + Send + Sync + 'static {
    /// Builds an error location for an element index.
    fn at(index: usize) -> Location;
}

impl FieldLocation for Cells {
    fn at(index: usize) -> Location {
        Location::Cell(index)
    }
}

impl FieldLocation for Faces {
    fn at(index: usize) -> Location {
        Location::Face(index)
    }
}

/// Element types stored in fields.
pub trait FieldValue:
    Copy + Send + Sync + PartialEq + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self>
{
    const ZERO: Self;

    fn is_finite(&self) -> bool;
}

impl FieldValue for f64 {
    const ZERO: Self = 0.0;

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

impl FieldValue for DVec3 {
    const ZERO: Self = DVec3::ZERO;

    fn is_finite(&self) -> bool {
        DVec3::is_finite(*self)
    }
}

/// A named, dimensioned field over cells or faces.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T, L> {
    name: String,
    dimensions: Dimensions,
    values: Vec<T>,
    _location: PhantomData<L>,
}

/// One scalar per cell.
pub type VolScalarField = Field<f64, Cells>;

/// One vector per cell.
pub type VolVectorField = Field<DVec3, Cells>;

/// One scalar per face.
pub type SurfaceScalarField = Field<f64, Faces>;

impl<T: FieldValue, L: FieldLocation> Field<T, L> {
    #[must_use]
    pub fn new(name: impl Into<String>, dimensions: Dimensions, values: Vec<T>) -> Self {
        Self {
            name: name.into(),
            dimensions,
            values,
            _location: PhantomData,
        }
    }

    /// Creates a field with the same value everywhere.
    #[must_use]
    pub fn uniform(name: impl Into<String>, dimensions: Dimensions, value: T, len: usize) -> Self {
        Self::new(name, dimensions, vec![value; len])
    }

    /// Creates a zero field.
    #[must_use]
    pub fn zeros(name: impl Into<String>, dimensions: Dimensions, len: usize) -> Self {
        Self::uniform(name, dimensions, T::ZERO, len)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replaces all values, keeping name and dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Size`] if the length changes.
    pub fn assign(&mut self, values: Vec<T>) -> Result<(), FieldError> {
        if values.len() != self.values.len() {
            return Err(FieldError::Size {
                field: self.name.clone(),
                expected: self.values.len(),
                found: values.len(),
            });
        }
        self.values = values;
        Ok(())
    }

    /// Returns a renamed copy.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Applies `f` element-wise, producing a field with the same dimensions.
    #[must_use]
    pub fn map(&self, name: impl Into<String>, f: impl Fn(T) -> T) -> Self {
        Self::new(
            name,
            self.dimensions,
            self.values.iter().map(|v| f(*v)).collect(),
        )
    }

    /// Element-wise sum.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Dimension`] or [`FieldError::Size`] on mismatch.
    pub fn checked_add(&self, other: &Self) -> Result<Self, FieldError> {
        self.check_compatible("+", other)?;
        Ok(self.zip(other, |a, b| a + b))
    }

    /// Element-wise difference.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Dimension`] or [`FieldError::Size`] on mismatch.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, FieldError> {
        self.check_compatible("-", other)?;
        Ok(self.zip(other, |a, b| a - b))
    }

    /// Multiplies by a scalar field of the same location.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Size`] if the lengths differ.
    pub fn checked_scale(&self, other: &Field<f64, L>) -> Result<Self, FieldError> {
        if self.len() != other.len() {
            return Err(FieldError::Size {
                field: other.name.clone(),
                expected: self.len(),
                found: other.len(),
            });
        }
        Ok(Self::new(
            format!("{}*{}", self.name, other.name),
            self.dimensions * other.dimensions,
            self.values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| *a * *b)
                .collect(),
        ))
    }

    /// Fails on the first NaN or infinite value.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::NonFinite`] naming the field and element.
    pub fn check_finite(&self) -> Result<(), FieldError> {
        match self.values.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(FieldError::NonFinite {
                field: self.name.clone(),
                location: L::at(index),
            }),
            None => Ok(()),
        }
    }

    /// Fails if `other` does not carry the same dimensions as `self`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Dimension`] on mismatch.
    pub fn check_dimensions(&self, other: Dimensions) -> Result<(), FieldError> {
        if self.dimensions == other {
            Ok(())
        } else {
            Err(FieldError::Dimension {
                operation: "assign",
                left: self.dimensions,
                right: other,
            })
        }
    }

    fn check_compatible(&self, operation: &'static str, other: &Self) -> Result<(), FieldError> {
        if self.dimensions != other.dimensions {
            return Err(FieldError::Dimension {
                operation,
                left: self.dimensions,
                right: other.dimensions,
            });
        }
        if self.len() != other.len() {
            return Err(FieldError::Size {
                field: other.name.clone(),
                expected: self.len(),
                found: other.len(),
            });
        }
        Ok(())
    }

    fn zip(&self, other: &Self, f: impl Fn(T, T) -> T) -> Self {
        Self::new(
            self.name.clone(),
            self.dimensions,
            self.values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| f(*a, *b))
                .collect(),
        )
    }
}

impl<L: FieldLocation> Field<f64, L> {
    /// Minimum value (a global reduction).
    #[must_use]
    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Maximum value (a global reduction).
    #[must_use]
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

impl VolScalarField {
    /// Volume integral `Σ x_P V_P` (a global reduction).
    #[must_use]
    pub fn integrate(&self, volumes: &[f64]) -> f64 {
        self.values.iter().zip(volumes).map(|(x, v)| x * v).sum()
    }

    /// Volume-weighted mean (a global reduction).
    #[must_use]
    pub fn weighted_average(&self, volumes: &[f64]) -> f64 {
        let total: f64 = volumes.iter().sum();
        if total > 0.0 {
            self.integrate(volumes) / total
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_requires_matching_dimensions() {
        let u = VolScalarField::uniform("u", Dimensions::VELOCITY, 1.0, 3);
        let p = VolScalarField::uniform("p", Dimensions::PRESSURE, 1.0, 3);
        match u.checked_add(&p) {
            Err(FieldError::Dimension { left, right, .. }) => {
                assert_eq!(left, Dimensions::VELOCITY);
                assert_eq!(right, Dimensions::PRESSURE);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn scaling_combines_dimensions() {
        let alpha = SurfaceScalarField::uniform("alphaf", Dimensions::NONE, 0.5, 2);
        let rho = SurfaceScalarField::uniform("rhof", Dimensions::DENSITY, 1000.0, 2);
        let phi = SurfaceScalarField::uniform("phi", Dimensions::VOLUMETRIC_FLUX, 2.0, 2);

        let alpha_rho_phi = phi
            .checked_scale(&alpha)
            .and_then(|f| f.checked_scale(&rho))
            .unwrap();
        assert_eq!(alpha_rho_phi.dimensions(), Dimensions::MASS_FLUX);
        assert_eq!(alpha_rho_phi.values(), &[1000.0, 1000.0]);
    }

    #[test]
    fn non_finite_values_are_located() {
        let mut u = VolVectorField::zeros("U.air", Dimensions::VELOCITY, 4);
        u.values_mut()[2] = DVec3::new(0.0, f64::NAN, 0.0);
        match u.check_finite() {
            Err(FieldError::NonFinite { field, location }) => {
                assert_eq!(field, "U.air");
                assert_eq!(location, Location::Cell(2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn assign_rejects_resize() {
        let mut alpha = VolScalarField::zeros("alpha", Dimensions::NONE, 3);
        assert!(alpha.assign(vec![0.0; 4]).is_err());
        assert!(alpha.assign(vec![0.5; 3]).is_ok());
        assert_eq!(alpha.max(), 0.5);
    }
}
