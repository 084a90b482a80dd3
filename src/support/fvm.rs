//! Finite-volume operators, matrices and the linear solver.
//!
//! Operators work on plain slices indexed by cell or face so that the
//! kernel can combine them without materialising named intermediate fields.
//! Boundary treatment is supplied by the caller through closures that map a
//! boundary face index to a prescribed value.

mod matrix;
mod operators;
mod pcg;

pub use matrix::FvMatrix;
pub use operators::{
    divergence, flux, gauss_gradient, interpolate, reconstruct, sn_grad, surface_integrate,
    upwind,
};
pub use pcg::{PcgConfig, PcgResult, Preconditioner, solve_pcg};
