//! Terminal slip velocity of a dispersed phase under gravity.
//!
//! Finds `U_r` such that the drag force balances buoyancy,
//! `K_d(U_r) · U_r = α_d |ρ_c - ρ_d| g`, by bisection on the slip velocity.

use std::convert::Infallible;

use thiserror::Error;
use twine_core::{EquationProblem, Model};
use twine_solvers::equation::bisection;
use uom::si::{
    acceleration::meter_per_second_squared,
    f64::{Acceleration, Velocity},
    velocity::meter_per_second,
};

use super::{DragModel, PairCell};

/// Drag force and buoyancy per unit volume at a trial slip velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlipBalance {
    pub slip: Velocity,
    /// Drag coefficient `K_d` at this slip, kg/m³·s.
    pub k: f64,
    /// Drag force per unit volume, N/m³.
    pub drag: f64,
}

/// Errors from [`terminal_velocity`].
#[derive(Debug, Error)]
pub enum TerminalVelocityError {
    #[error("bisection solver error")]
    Bisection(#[from] bisection::Error),

    /// The solver reached its iteration limit.
    #[error("terminal velocity did not converge: residual={residual} N/m³")]
    MaxIters { residual: f64, iters: usize },

    /// No slip can be driven by this state.
    #[error("no buoyancy drives slip: {context}")]
    NoBuoyancy { context: String },
}

struct SlipModel<'a> {
    drag: &'a dyn DragModel,
    cell: PairCell,
}

impl Model for SlipModel<'_> {
    type Input = Velocity;
    type Output = SlipBalance;
    type Error = Infallible;

    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
        let slip = input.get::<meter_per_second>();
        let cell = PairCell { slip, ..self.cell };
        let k = self.drag.k(&cell);
        Ok(SlipBalance {
            slip: *input,
            k,
            drag: k * slip,
        })
    }
}

struct BuoyancyProblem {
    buoyancy: f64,
}

impl EquationProblem<1> for BuoyancyProblem {
    type Input = Velocity;
    type Output = SlipBalance;
    type Error = Infallible;

    fn input(&self, x: &[f64; 1]) -> Result<Self::Input, Self::Error> {
        Ok(Velocity::new::<meter_per_second>(x[0]))
    }

    fn residuals(
        &self,
        _input: &Self::Input,
        output: &Self::Output,
    ) -> Result<[f64; 1], Self::Error> {
        Ok([output.drag - self.buoyancy])
    }
}

/// Solves for the slip velocity at which drag balances buoyancy.
///
/// The slip carried by `cell` is ignored. The search bracket is
/// `[0, max(100 √(g d Δρ/ρ_c), 10)]` m/s.
///
/// # Errors
///
/// Returns [`TerminalVelocityError`] if there is no density difference or
/// gravity, or if bisection fails to converge.
pub fn terminal_velocity(
    drag: &dyn DragModel,
    cell: &PairCell,
    gravity: Acceleration,
) -> Result<SlipBalance, TerminalVelocityError> {
    let g = gravity.get::<meter_per_second_squared>().abs();
    let delta_rho = (cell.rho_c - cell.rho_d).abs();
    let buoyancy = cell.alpha_d * delta_rho * g;
    if buoyancy <= 0.0 || !buoyancy.is_finite() {
        return Err(TerminalVelocityError::NoBuoyancy {
            context: format!("alpha_d={}, delta_rho={delta_rho}, g={g}", cell.alpha_d),
        });
    }

    let scale = (g * cell.d * delta_rho / cell.rho_c).sqrt();
    let upper = (100.0 * scale).max(10.0);

    let model = SlipModel { drag, cell: *cell };
    let problem = BuoyancyProblem { buoyancy };
    let config = bisection::Config {
        max_iters: 200,
        x_abs_tol: 1e-10,
        x_rel_tol: 1e-12,
        residual_tol: 1e-10 * buoyancy,
    };

    let solution = bisection::solve(
        &model,
        &problem,
        [0.0, upper],
        &config,
        |_event: &bisection::Event<'_, _, _>| None,
    )?;

    if solution.status != bisection::Status::Converged {
        return Err(TerminalVelocityError::MaxIters {
            residual: solution.residual,
            iters: solution.iters,
        });
    }

    Ok(solution.snapshot.output)
}
