//! A reference time step: outer correctors over closures, momentum,
//! pressure and volume fraction.
//!
//! The pressure equation is formed on faces. Each phase flux is driven by
//! its interpolated momentum operator, old-time flux, gravity, the explicit
//! virtual-mass term and surface tension; drag and the implicit virtual
//! mass are eliminated between the two phases face by face, leaving the
//! mixture flux linear in the pressure gradient. Continuity of the mixture
//! then gives a symmetric equation for `p`.

use std::sync::Arc;

use glam::DVec3;
use tracing::{debug, info};
use uom::si::{
    f64::{MassRate, Time},
    mass_rate::kilogram_per_second,
};

use crate::{
    models::multiphase::two_phase::core::{
        ConfigError, MomentumEqn, TwoPhaseError,
        alpha::AlphaReport,
        elimination::{mixture_flux, partial_elimination, partial_elimination_f},
        phase::non_finite,
    },
    support::{
        field::Location,
        fvm::{FvMatrix, PcgConfig, PcgResult, gauss_gradient, interpolate, sn_grad, solve_pcg},
        mesh::{Mesh, PatchKind},
    },
};

use super::{TwoPhaseSystem, seconds};

/// Controls of [`TwoPhaseSystem::advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PimpleControls {
    /// Outer iterations per time step.
    pub n_outer_correctors: usize,

    /// Solves the cell velocities from the momentum equations before the
    /// pressure equation.
    pub momentum_predictor: bool,

    pub pressure: PcgConfig,

    /// Solver of the implicit turbulent dispersion correction.
    pub dispersion: PcgConfig,
}

impl Default for PimpleControls {
    fn default() -> Self {
        Self {
            n_outer_correctors: 1,
            momentum_predictor: false,
            pressure: PcgConfig::default(),
            dispersion: PcgConfig::default(),
        }
    }
}

/// Diagnostics of one time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Largest mixture Courant number over the full step.
    pub courant: f64,
    /// The last volume-fraction solve.
    pub alpha: AlphaReport,
    /// The last pressure solve.
    pub pressure: PcgResult,
    /// Sum over both phases of the absolute continuity residual.
    pub continuity_error: MassRate,
}

impl TwoPhaseSystem {
    /// Advances the system by one time step.
    ///
    /// Stores the old time level, then for every outer corrector evaluates
    /// the closures, solves the pressure equation, updates the phase fluxes
    /// and velocities, transports the volume fraction and updates the
    /// equations of state.
    ///
    /// # Errors
    ///
    /// Returns a recoverable [`TwoPhaseError`] if a solver fails to converge,
    /// the volume fraction leaves its bounds, or a field becomes non-finite.
    /// The state is then partially advanced; the host should reload it.
    pub fn advance(
        &mut self,
        dt: Time,
        controls: &PimpleControls,
    ) -> Result<StepReport, TwoPhaseError> {
        let dt_s = seconds(dt)?;
        if controls.n_outer_correctors == 0 {
            return Err(ConfigError::invalid("nOuterCorrectors", "must be at least 1").into());
        }
        self.store_old_time();
        self.dt = Some(dt_s);

        let (mut pressure, mut alpha) = self.outer_corrector(dt, controls, 0)?;
        for corrector in 1..controls.n_outer_correctors {
            (pressure, alpha) = self.outer_corrector(dt, controls, corrector)?;
        }

        let volumes = self.mesh.cell_volumes();
        let continuity_error = self.continuity_errors().map_or(0.0, |errors| {
            errors
                .iter()
                .map(|(_, field)| {
                    field
                        .values()
                        .iter()
                        .zip(volumes)
                        .map(|(e, v)| e.abs() * v)
                        .sum::<f64>()
                })
                .sum()
        });

        for phase in &self.phases {
            info!(
                phase = %phase.name(),
                mean = phase.alpha().weighted_average(volumes),
                min = phase.alpha().min(),
                max = phase.alpha().max(),
                "volume fraction"
            );
        }

        Ok(StepReport {
            courant: alpha.courant * self.controls.n_alpha_sub_cycles as f64,
            alpha,
            pressure,
            continuity_error: MassRate::new::<kilogram_per_second>(continuity_error),
        })
    }

    fn outer_corrector(
        &mut self,
        dt: Time,
        controls: &PimpleControls,
        corrector: usize,
    ) -> Result<(PcgResult, AlphaReport), TwoPhaseError> {
        self.correct()?;
        let pressure = self.correct_pressure(seconds(dt)?, controls)?;
        debug!(
            corrector,
            iterations = pressure.iterations,
            residual = pressure.residual_norm,
            "pressure solved"
        );
        let alpha = self.solve(dt, &controls.dispersion)?;
        self.correct_thermo()?;
        Ok((pressure, alpha))
    }

    /// Solves the pressure equation and updates both phase fluxes.
    fn correct_pressure(
        &mut self,
        dt: f64,
        controls: &PimpleControls,
    ) -> Result<PcgResult, TwoPhaseError> {
        let mesh = Arc::clone(&self.mesh);
        let mesh = &*mesh;
        let (n, n_faces) = (mesh.n_cells(), mesh.n_faces());

        let eqns = self.momentum_equations(dt);
        let a = eqns.each_ref().map(|eqn| eqn.a(mesh));
        let vm_dt = self.vm_by_dt();
        let k: Vec<f64> = self
            .coefficients
            .kd
            .iter()
            .zip(&vm_dt)
            .map(|(kd, vm)| kd + vm)
            .collect();

        if controls.momentum_predictor {
            self.predict_velocity(mesh, &eqns, &a, &k, &vm_dt)?;
        }
        let h = [0, 1].map(|i| {
            let phase = &self.phases[i];
            eqns[i].h_without_ddt(mesh, phase.u().values(), phase.u_old())
        });

        let a_f = a.each_ref().map(|a| interpolate(mesh, a));
        let ddt_f = eqns.each_ref().map(|eqn| interpolate(mesh, &eqn.ddt));
        let k_f = interpolate(mesh, &k);
        let vm_dt_f = interpolate(mesh, &vm_dt);
        let tension = self.surface_tension_flux();
        let alpha_f = self.phases.each_ref().map(|phase| phase.alpha_f(mesh));
        let gravity = self.gravity;

        let driving = [0, 1].map(|i| {
            let (phase, other) = (&self.phases[i], &self.phases[1 - i]);
            let h_f = interpolate(mesh, &h[i]);
            let rho_f = phase.rho_f(mesh);
            (0..n_faces)
                .map(|f| {
                    let sf = mesh.face_areas()[f];
                    h_f[f].dot(sf)
                        + ddt_f[i][f] * phase.phi_old()[f]
                        + alpha_f[i][f] * rho_f[f] * gravity.dot(sf)
                        + vm_dt_f[f] * (phase.phi_old()[f] - other.phi_old()[f])
                        + alpha_f[i][f] * tension[f]
                })
                .collect::<Vec<f64>>()
        });

        let mixture = mixture_flux(
            [&alpha_f[0], &alpha_f[1]],
            [&a_f[0], &a_f[1]],
            [&driving[0], &driving[1]],
            &k_f,
        );

        let mut matrix = FvMatrix::<f64>::new(mesh);
        for f in 0..mesh.n_internal_faces() {
            let c = mixture.c[f] * mesh.mag_sf()[f] * mesh.delta_coeffs()[f];
            matrix.add_symmetric(mesh, f, c);
        }
        let [phase1, phase2] = &self.phases;
        let (rho1, rho2) = (phase1.rho().values(), phase2.rho().values());
        for i in 0..n {
            let dilatation = self.dmdt[i] * (1.0 / rho1[i] - 1.0 / rho2[i]);
            matrix.source_mut()[i] = dilatation * mesh.cell_volumes()[i];
        }
        for (i, e) in mixture.e.iter().enumerate().take(mesh.n_internal_faces()) {
            matrix.source_mut()[mesh.owner()[i]] -= e;
            matrix.source_mut()[mesh.neighbour()[i]] += e;
        }
        for f in mesh.n_internal_faces()..n_faces {
            let cell = mesh.owner()[f];
            match (phase1.boundary_flux(mesh, f), phase2.boundary_flux(mesh, f)) {
                (Some(phi1), Some(phi2)) => {
                    matrix.source_mut()[cell] -= alpha_f[0][f] * phi1 + alpha_f[1][f] * phi2;
                }
                _ => {
                    let c = mixture.c[f] * mesh.mag_sf()[f] * mesh.delta_coeffs()[f];
                    matrix.diag_mut()[cell] += c;
                    matrix.source_mut()[cell] += c * self.p_ref - mixture.e[f];
                }
            }
        }
        if !mesh.has_patch_kind(PatchKind::Outlet) {
            matrix.set_reference(0, self.p_ref);
        }

        let mut p = self.p.values().to_vec();
        let result = solve_pcg(&matrix, mesh, &mut p, &controls.pressure);
        if !result.converged {
            return Err(TwoPhaseError::Convergence {
                solver: "pressure",
                location: Location::Global,
                reason: format!(
                    "residual {:e} after {} iterations",
                    result.residual_norm, result.iterations
                ),
            });
        }
        self.p.assign(p)?;
        non_finite(&self.p, "pressure solve")?;

        let grad = self.pressure_flux(mesh);
        let corrected = [0, 1].map(|i| {
            (0..n_faces)
                .map(|f| driving[i][f] - alpha_f[i][f] * grad[f])
                .collect::<Vec<f64>>()
        });
        let [phi1, phi2] = partial_elimination_f(
            [&a_f[0], &a_f[1]],
            [&corrected[0], &corrected[1]],
            &k_f,
        );
        self.phases[0].correct_kinematics(mesh, phi1)?;
        self.phases[1].correct_kinematics(mesh, phi2)?;
        self.update_mixture_flux()?;
        self.momentum_diagonal = Some(a);
        Ok(result)
    }

    /// Solves the cell velocities with the current pressure.
    fn predict_velocity(
        &mut self,
        mesh: &Mesh,
        eqns: &[MomentumEqn; 2],
        a: &[Vec<f64>; 2],
        k: &[f64],
        vm_dt: &[f64],
    ) -> Result<(), TwoPhaseError> {
        let grad_p = gauss_gradient(mesh, &self.face_pressure(mesh));
        let gravity = self.gravity;
        let h = [0, 1].map(|i| {
            let (phase, other) = (&self.phases[i], &self.phases[1 - i]);
            let alpha = phase.alpha().values();
            let rho = phase.rho().values();
            eqns[i]
                .h(mesh, phase.u().values())
                .into_iter()
                .enumerate()
                .map(|(c, h)| {
                    h - grad_p[c] * alpha[c]
                        + gravity * (alpha[c] * rho[c])
                        + (phase.u_old()[c] - other.u_old()[c]) * vm_dt[c]
                })
                .collect::<Vec<DVec3>>()
        });
        let [u1, u2] = partial_elimination([&a[0], &a[1]], [&h[0], &h[1]], k);
        self.phases[0].set_u(u1)?;
        self.phases[1].set_u(u2)?;
        Ok(())
    }

    /// Face pressure: linear inside, the outlet pressure on outlets and the
    /// owner value elsewhere.
    fn face_pressure(&self, mesh: &Mesh) -> Vec<f64> {
        let mut p_f = interpolate(mesh, self.p.values());
        for (f, p) in p_f.iter_mut().enumerate().skip(mesh.n_internal_faces()) {
            if is_outlet(mesh, f) {
                *p = self.p_ref;
            }
        }
        p_f
    }

    /// `|Sf| ∂p/∂n` on every face, zero gradient off outlets.
    fn pressure_flux(&self, mesh: &Mesh) -> Vec<f64> {
        let p_ref = self.p_ref;
        sn_grad(mesh, self.p.values(), |f| is_outlet(mesh, f).then_some(p_ref))
            .iter()
            .zip(mesh.mag_sf())
            .map(|(g, s)| g * s)
            .collect()
    }
}

fn is_outlet(mesh: &Mesh, face: usize) -> bool {
    mesh.face_patch(face)
        .is_some_and(|patch| patch.kind() == PatchKind::Outlet)
}

