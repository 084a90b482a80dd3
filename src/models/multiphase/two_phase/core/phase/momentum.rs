//! Assembly of a phase momentum equation.

use glam::DVec3;

use crate::{
    models::multiphase::two_phase::core::transfer::LinearSource,
    support::{
        fvm::FvMatrix,
        mesh::{Mesh, PatchKind},
    },
};

use super::Phase;

/// Terms of a momentum equation that come from outside the phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumContext<'a> {
    /// Time step, s.
    pub dt: f64,
    /// Adds the body force `α ρ g` when set.
    pub gravity: Option<DVec3>,
    /// Adds the pressure force `-α ∇p` when set.
    pub grad_p: Option<&'a [DVec3]>,
    /// Interfacial momentum sources per unit volume.
    pub sources: Option<&'a LinearSource<DVec3>>,
}

/// A phase momentum equation without interphase drag.
///
/// Rows hold `ddt·V + convection + diffusion`. Drag and the implicit part
/// of virtual mass are applied by partial elimination, not here.
#[derive(Debug, Clone)]
pub struct MomentumEqn {
    pub matrix: FvMatrix<DVec3>,
    /// Time-derivative coefficient `max(α°, α_res) ρ° / Δt` per cell.
    pub ddt: Vec<f64>,
}

impl MomentumEqn {
    /// Diagonal coefficient per unit volume.
    #[must_use]
    pub fn a(&self, mesh: &Mesh) -> Vec<f64> {
        self.matrix.a(mesh)
    }

    /// Off-diagonal operator per unit volume at the velocity `u`.
    #[must_use]
    pub fn h(&self, mesh: &Mesh, u: &[DVec3]) -> Vec<DVec3> {
        self.matrix.h(mesh, u)
    }

    /// `H` without the old-time contribution `ddt·U°`.
    ///
    /// The old-time term enters face fluxes through `φ°` instead.
    #[must_use]
    pub fn h_without_ddt(&self, mesh: &Mesh, u: &[DVec3], u_old: &[DVec3]) -> Vec<DVec3> {
        self.h(mesh, u)
            .into_iter()
            .zip(&self.ddt)
            .zip(u_old)
            .map(|((h, ddt), u0)| h - *u0 * *ddt)
            .collect()
    }
}

impl Phase {
    /// Assembles the momentum equation of this phase.
    ///
    /// Convection uses upwind differencing of the phase mass flux in
    /// non-conservative form; the mass balance is closed by the time term
    /// built on the old-time phase mass. Walls are no-slip, inlets carry
    /// their prescribed velocity, outlets have zero gradient.
    #[must_use]
    pub fn u_eqn(&self, mesh: &Mesh, ctx: &MomentumContext<'_>) -> MomentumEqn {
        let n = mesh.n_cells();
        let volumes = mesh.cell_volumes();
        let alpha_f = self.alpha_f(mesh);
        let mass_flux = self.alpha_rho_phi.values();
        let mut matrix = FvMatrix::<DVec3>::new(mesh);

        let ddt: Vec<f64> = (0..n)
            .map(|i| self.old.alpha[i].max(self.residual_alpha) * self.old.rho[i] / ctx.dt)
            .collect();
        for i in 0..n {
            matrix.diag_mut()[i] += ddt[i] * volumes[i];
            matrix.source_mut()[i] = self.old.u[i] * (ddt[i] * volumes[i]);
        }

        for face in 0..mesh.n_internal_faces() {
            let f = mass_flux[face];
            matrix.add_asymmetric(mesh, face, (-f).max(0.0), f.max(0.0));
            let gamma = alpha_f[face] * self.mu * mesh.mag_sf()[face] * mesh.delta_coeffs()[face];
            matrix.add_symmetric(mesh, face, gamma);
        }

        for face in mesh.n_internal_faces()..mesh.n_faces() {
            let cell = mesh.owner()[face];
            let c_b = alpha_f[face] * self.mu * mesh.mag_sf()[face] * mesh.delta_coeffs()[face];
            match mesh.face_patch(face).map(|patch| patch.kind()) {
                Some(PatchKind::Wall) => matrix.diag_mut()[cell] += c_b,
                Some(PatchKind::Inlet) => {
                    let u_in = self.inlet(face).map_or(DVec3::ZERO, |inlet| inlet.velocity);
                    let inflow = (-mass_flux[face]).max(0.0);
                    matrix.diag_mut()[cell] += c_b + inflow;
                    matrix.source_mut()[cell] += u_in * (c_b + inflow);
                }
                Some(PatchKind::Outlet) | None => {}
            }
        }

        for i in 0..n {
            let mut source = DVec3::ZERO;
            if let Some(g) = ctx.gravity {
                source += g * (self.alpha.values()[i] * self.rho.values()[i]);
            }
            if let Some(grad_p) = ctx.grad_p {
                source -= grad_p[i] * self.alpha.values()[i];
            }
            if let Some(sources) = ctx.sources {
                source += sources.su[i];
                let sp = sources.sp[i];
                if sp < 0.0 {
                    matrix.diag_mut()[i] -= sp * volumes[i];
                } else {
                    source += self.u.values()[i] * sp;
                }
            }
            matrix.source_mut()[i] += source * volumes[i];
        }

        MomentumEqn { matrix, ddt }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::models::multiphase::two_phase::core::test_support::{channel, water};

    #[test]
    fn still_phase_balances_its_old_time_term() {
        let mesh = channel(4);
        let phase = water(&mesh, 1.0);
        let eqn = phase.u_eqn(
            &mesh,
            &MomentumContext {
                dt: 0.1,
                ..MomentumContext::default()
            },
        );

        let a = eqn.a(&mesh);
        for (a, ddt) in a.iter().zip(&eqn.ddt) {
            assert!(*a >= *ddt);
        }
        assert_relative_eq!(eqn.ddt[0], phase.rho().values()[0] / 0.1, max_relative = 1e-12);

        let h = eqn.h_without_ddt(&mesh, phase.u().values(), phase.u_old());
        assert!(h.iter().all(|h| h.length() < 1e-12));
    }

    #[test]
    fn gravity_and_pressure_gradient_enter_the_source() {
        let mesh = channel(2);
        let phase = water(&mesh, 0.5);
        let g = DVec3::new(0.0, -9.81, 0.0);
        let rho = phase.rho().values()[0];
        let grad_p = vec![g * rho; 2];
        let eqn = phase.u_eqn(
            &mesh,
            &MomentumContext {
                dt: 1.0,
                gravity: Some(g),
                grad_p: Some(&grad_p),
                sources: None,
            },
        );

        let h = eqn.h_without_ddt(&mesh, phase.u().values(), phase.u_old());
        // Hydrostatic balance: `α ρ g - α ∇p` vanishes.
        assert!(h.iter().all(|h| h.length() < 1e-9));
    }

    #[test]
    fn negative_implicit_source_adds_to_the_diagonal() {
        let mesh = channel(2);
        let phase = water(&mesh, 1.0);
        let mut sources = LinearSource::zeros(2);
        sources.sp = vec![-5.0; 2];
        let ctx = MomentumContext {
            dt: 1.0,
            sources: Some(&sources),
            ..MomentumContext::default()
        };
        let with = phase.u_eqn(&mesh, &ctx).a(&mesh);
        let without = phase
            .u_eqn(
                &mesh,
                &MomentumContext {
                    dt: 1.0,
                    ..MomentumContext::default()
                },
            )
            .a(&mesh);
        for (w, wo) in with.iter().zip(&without) {
            assert_relative_eq!(w - wo, 5.0, epsilon = 1e-9);
        }
    }
}
