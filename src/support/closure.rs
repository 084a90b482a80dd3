//! Interfacial closure models for a pair of phases.
//!
//! Each closure kind is a trait with a single evaluation operation on a
//! [`PairCell`], the local state of one cell seen from a dispersed phase
//! inside a continuous phase. Concrete models are selected by name through
//! a [`ClosureRegistry`], keyed by `(kind, name)`, and are attached to a
//! [`PhasePairKey`] from the configuration dictionary.
//!
//! When several keys of one kind are configured for the same pair (for
//! example `air_in_water` and `water_in_air`), their coefficients are
//! combined cell by cell with [`LinearBlending`].
//!
//! All coefficients are SI values per unit volume of mixture.

mod blending;
mod drag;
mod error;
mod heat_transfer;
mod mass_transfer;
mod pair;
mod registry;
mod surface_tension;
mod terminal_velocity;
mod turbulent_dispersion;
mod virtual_mass;

use std::fmt;

pub use blending::{BlendedModel, LinearBlending, PairState, PhaseCell};
pub use drag::{ConstantDrag, DragModel, Ergun, GidaspowErgunWenYu, SchillerNaumann, WenYu};
pub use error::ClosureError;
pub use heat_transfer::{ConstantHeatTransfer, HeatTransferModel, RanzMarshall, Spherical};
pub use mass_transfer::{ConstantMassTransfer, MassTransferModel};
pub use pair::PhasePairKey;
pub use registry::{ClosureRegistry, Constructor, Registry};
pub use surface_tension::{ConstantSurfaceTension, SurfaceTensionModel};
pub use terminal_velocity::{SlipBalance, TerminalVelocityError, terminal_velocity};
pub use turbulent_dispersion::{ConstantTurbulentDispersion, TurbulentDispersionModel};
pub use virtual_mass::{ConstantVirtualMass, VirtualMassModel, Zuber};

/// The closure families of a two-phase system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClosureKind {
    Drag,
    VirtualMass,
    HeatTransfer,
    MassTransfer,
    SurfaceTension,
    TurbulentDispersion,
}

impl ClosureKind {
    pub const ALL: [Self; 6] = [
        Self::Drag,
        Self::VirtualMass,
        Self::HeatTransfer,
        Self::MassTransfer,
        Self::SurfaceTension,
        Self::TurbulentDispersion,
    ];

    /// The configuration section holding models of this kind.
    #[must_use]
    pub fn section(self) -> &'static str {
        match self {
            Self::Drag => "drag",
            Self::VirtualMass => "virtualMass",
            Self::HeatTransfer => "heatTransfer",
            Self::MassTransfer => "massTransfer",
            Self::SurfaceTension => "surfaceTension",
            Self::TurbulentDispersion => "turbulentDispersion",
        }
    }

    /// True if models of this kind may be attached to ordered keys.
    #[must_use]
    pub fn allows_ordered(self) -> bool {
        !matches!(self, Self::MassTransfer | Self::SurfaceTension)
    }
}

impl fmt::Display for ClosureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// Local state of a dispersed phase `d` inside a continuous phase `c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairCell {
    pub alpha_d: f64,
    pub alpha_c: f64,
    pub rho_d: f64,
    pub rho_c: f64,
    /// Continuous-phase dynamic viscosity, Pa·s.
    pub mu_c: f64,
    /// Continuous-phase thermal conductivity, W/m·K.
    pub kappa_c: f64,
    /// Continuous-phase heat capacity, J/kg·K.
    pub cp_c: f64,
    /// Dispersed-phase particle or bubble diameter, m.
    pub d: f64,
    /// Slip velocity magnitude `|U_d - U_c|`, m/s.
    pub slip: f64,
    pub residual_alpha_d: f64,
    pub residual_alpha_c: f64,
}

impl PairCell {
    /// Dispersed-phase Reynolds number `|U_r| d ρ_c / μ_c`.
    #[must_use]
    pub fn reynolds(&self) -> f64 {
        self.slip * self.d * self.rho_c / self.mu_c
    }

    /// Continuous-phase Prandtl number `μ_c cp_c / κ_c`.
    #[must_use]
    pub fn prandtl(&self) -> f64 {
        self.mu_c * self.cp_c / self.kappa_c
    }

    /// Dispersed volume fraction bounded below by its residual value.
    #[must_use]
    pub fn alpha_d_floor(&self) -> f64 {
        self.alpha_d.max(self.residual_alpha_d)
    }

    /// Continuous volume fraction bounded below by its residual value.
    #[must_use]
    pub fn alpha_c_floor(&self) -> f64 {
        self.alpha_c.max(self.residual_alpha_c)
    }
}

/// The "none" model: a zero coefficient for any kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoModel;
