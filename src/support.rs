//! Supporting utilities used by models.
//!
//! These are the narrow collaborators the two-phase kernel consumes: a
//! finite-volume mesh, dimensioned fields, discretization operators and a
//! linear solver, phase equations of state, and the interfacial closure
//! models with their registry.

pub mod closure;
pub mod constraint;
pub mod field;
pub mod fvm;
pub mod mesh;
pub mod thermo;
pub mod units;
