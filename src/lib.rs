//! # Twine Two-Phase
//!
//! A two-phase Eulerian-Eulerian flow coupling kernel for
//! [Twine](https://github.com/isentropic-dev/twine).
//!
//! Two interpenetrating fluid phases share one finite-volume mesh. The
//! kernel couples their momentum equations through interfacial drag and
//! virtual mass, eliminating the coupling algebraically cell by cell and
//! face by face, transports the volume fraction with a bounded compressive
//! scheme, and exports interfacial heat and mass transfer sources.
//!
//! ## Crate layout
//!
//! - [`models`]: [`twine_core::Model`] implementations and the two-phase system.
//! - [`support`]: Mesh, fields, discretization, thermodynamics and closures.
//!
//! ## Utility code lifecycle
//!
//! Modules in [`support`] are part of the public API because they're useful,
//! but their APIs are not stable. Breaking changes may occur as needed.
//! Model-specific utility code lives in each model's internal `core` module
//! and moves to [`support`] once a second model needs it.

pub mod models;
pub mod support;
