//! Multiphase flow models.

pub mod two_phase;
