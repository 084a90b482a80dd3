//! Eulerian-Eulerian coupling of two phases on one finite-volume mesh.
//!
//! [`TwoPhaseSystem`] owns both [`Phase`]s and their interfacial closures.
//! It evaluates drag, virtual mass, heat and mass transfer, surface tension
//! and turbulent dispersion per cell, transports the volume fraction with a
//! bounded compressive scheme, and eliminates the interphase momentum
//! coupling algebraically. The interfacial exchange is exported as linear
//! source tables for the host's own phase equations.
//!
//! [`TwoPhaseSystem::advance`] is a reference outer-iteration driver built
//! from the same pieces; hosts with their own pressure-velocity algorithm
//! call [`TwoPhaseSystem::solve`] and the transfer tables directly.

mod alpha;
mod closures;
mod config;
mod elimination;
mod error;
mod phase;
mod snapshot;
mod system;
mod transfer;

#[cfg(test)]
mod test_support;

pub use alpha::AlphaReport;
pub use closures::Coefficients;
pub use config::AlphaControls;
pub use elimination::{MixtureFlux, mixture_flux, partial_elimination, partial_elimination_f};
pub use error::{ConfigError, TwoPhaseError};
pub use phase::{InletValues, MomentumContext, MomentumEqn, Phase};
pub use snapshot::Snapshot;
pub use system::{PimpleControls, StepReport, TwoPhaseSystem};
pub use transfer::{
    HeatTransferTable, LinearSource, MassTransferTable, MomentumTransferTable, PhaseTable,
};
