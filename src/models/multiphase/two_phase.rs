//! Two-phase Eulerian-Eulerian flow.
//!
//! This module provides a [`twine_core::Model`] that advances a two-phase
//! flow by one time step. The computational core, including the
//! [`TwoPhaseSystem`] that hosts with their own solver loop drive
//! directly, is in the internal `core` module and re-exported here.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use twine_core::Model;
//! use twine_two_phase::{
//!     models::multiphase::two_phase::{PimpleControls, TwoPhaseFlow, TwoPhaseFlowInput},
//!     support::{
//!         closure::ClosureRegistry,
//!         mesh::{Mesh, RectangularGrid},
//!     },
//! };
//! use uom::si::{f64::Time, time::second};
//!
//! let mesh = Arc::new(Mesh::rectangular(&RectangularGrid::new(4, 4, 1.0, 1.0))?);
//! let config = json!({
//!     "phases": ["air", "water"],
//!     "air": {
//!         "thermo": { "type": "constantDensity", "fluid": "air" },
//!         "diameterModel": { "type": "constant", "d": 3e-3 },
//!         "alpha": 0.1,
//!         "viscosity": 1.8e-5,
//!         "thermalConductivity": 0.026
//!     },
//!     "water": {
//!         "thermo": { "type": "constantDensity", "fluid": "water" },
//!         "diameterModel": { "type": "constant", "d": 1e-4 },
//!         "viscosity": 1e-3,
//!         "thermalConductivity": 0.6
//!     },
//!     "drag": { "air_in_water": { "type": "SchillerNaumann" } }
//! });
//!
//! let flow = TwoPhaseFlow::new(
//!     mesh,
//!     config,
//!     Arc::new(ClosureRegistry::with_builtins()),
//!     PimpleControls::default(),
//! )?;
//! let output = flow.call(&TwoPhaseFlowInput {
//!     snapshot: flow.initial_snapshot()?,
//!     dt: Time::new::<second>(1e-3),
//! })?;
//! assert!(output.report.pressure.converged);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod core;

use std::sync::Arc;

use serde_json::Value;
use twine_core::Model;
use uom::si::f64::Time;

use crate::support::{closure::ClosureRegistry, mesh::Mesh};

pub use self::core::{
    AlphaControls, AlphaReport, Coefficients, ConfigError, HeatTransferTable, InletValues,
    LinearSource, MassTransferTable, MixtureFlux, MomentumContext, MomentumEqn,
    MomentumTransferTable, Phase, PhaseTable, PimpleControls, Snapshot, StepReport,
    TwoPhaseError, TwoPhaseSystem, mixture_flux, partial_elimination, partial_elimination_f,
};

/// Advances a two-phase flow snapshot by one time step.
///
/// Each call rebuilds the system from the case dictionary, loads the input
/// snapshot as the current and old time level, and runs
/// [`TwoPhaseSystem::advance`].
#[derive(Debug, Clone)]
pub struct TwoPhaseFlow {
    mesh: Arc<Mesh>,
    config: Value,
    registry: Arc<ClosureRegistry>,
    controls: PimpleControls,
}

/// Input to [`TwoPhaseFlow`].
#[derive(Debug, Clone, PartialEq)]
pub struct TwoPhaseFlowInput {
    pub snapshot: Snapshot,
    pub dt: Time,
}

/// Output of [`TwoPhaseFlow`].
#[derive(Debug, Clone, PartialEq)]
pub struct TwoPhaseFlowOutput {
    pub snapshot: Snapshot,
    pub report: StepReport,
}

impl TwoPhaseFlow {
    /// Creates the model, checking that the dictionary builds a system.
    ///
    /// # Errors
    ///
    /// Returns the [`TwoPhaseError`] of building the system.
    pub fn new(
        mesh: Arc<Mesh>,
        config: Value,
        registry: Arc<ClosureRegistry>,
        controls: PimpleControls,
    ) -> Result<Self, TwoPhaseError> {
        let flow = Self {
            mesh,
            config,
            registry,
            controls,
        };
        flow.system()?;
        Ok(flow)
    }

    /// A fresh system in the initial state of the dictionary.
    ///
    /// # Errors
    ///
    /// Returns the [`TwoPhaseError`] of building the system.
    pub fn system(&self) -> Result<TwoPhaseSystem, TwoPhaseError> {
        TwoPhaseSystem::new(Arc::clone(&self.mesh), &self.config, &self.registry)
    }

    /// The initial state of the dictionary as a snapshot.
    ///
    /// # Errors
    ///
    /// Returns the [`TwoPhaseError`] of building the system.
    pub fn initial_snapshot(&self) -> Result<Snapshot, TwoPhaseError> {
        Ok(self.system()?.snapshot())
    }
}

impl Model for TwoPhaseFlow {
    type Input = TwoPhaseFlowInput;
    type Output = TwoPhaseFlowOutput;
    type Error = TwoPhaseError;

    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
        let mut system = self.system()?;
        system.load(&input.snapshot)?;
        let report = system.advance(input.dt, &self.controls)?;
        Ok(TwoPhaseFlowOutput {
            snapshot: system.snapshot(),
            report,
        })
    }
}
