//! Bounded transport of the phase-1 volume fraction.
//!
//! The equation solved for `α₁` is
//!
//! ```text
//! ∂α₁/∂t + ∇·(α₁ φ_mix) + ∇·(α₁ α₂ φ_r) - α₁ ∇·φ_mix = ṁ (α₂/ρ₁ + α₁/ρ₂)
//! ```
//!
//! where `φ_r = φ₁ - φ₂` is augmented by an interface-compression flux along
//! the interface normal. The low-order flux upwinds `α₁` in the mixture flux
//! and `α₁ α₂` in the relative flux, taking each fraction from the cell it
//! leaves. The antidiffusive correction, linear-minus-upwind mixture
//! transport plus the compression part of the relative flux, is limited
//! with Zalesak's algorithm so the explicit update stays within local
//! extrema. Sub-steps are clipped conservatively and `α₂ = 1 - α₁`
//! throughout.

mod clip;
mod limiter;

use glam::DVec3;
use tracing::{debug, warn};

use crate::support::{
    field::Location,
    fvm::{FvMatrix, PcgConfig, gauss_gradient, interpolate, solve_pcg, surface_integrate},
    mesh::Mesh,
};

use super::{AlphaControls, TwoPhaseError};

use clip::clip;
use limiter::limit;

/// Diagnostics of one volume-fraction solve.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AlphaReport {
    /// Largest sub-step Courant number of the mixture flux.
    pub courant: f64,
    /// Largest distance outside the bounds before any clipping pass.
    pub max_excursion: f64,
    /// Cell of the largest excursion, if any value was clipped.
    pub worst_cell: Option<usize>,
    /// Phase volume moved by clipping, m³.
    pub clipped_volume: f64,
    pub min: f64,
    pub max: f64,
    /// Volume-weighted mean of `α₁`.
    pub mean: f64,
    /// Iterations of the implicit dispersion solve, if it ran.
    pub dispersion_iterations: Option<usize>,
}

/// Implicit turbulent dispersion of the volume fraction.
#[derive(Debug, Clone)]
pub(crate) struct Dispersion<'a> {
    /// Face diffusivity `(α₁α₂)_f (D/A₁ + D/A₂)_f`, m²/s.
    pub(crate) gamma_f: Vec<f64>,
    pub(crate) solver: &'a PcgConfig,
}

/// Inputs of one volume-fraction solve.
#[derive(Debug, Clone)]
pub(crate) struct AlphaProblem<'a> {
    pub(crate) mesh: &'a Mesh,
    pub(crate) field: &'a str,
    pub(crate) dt: f64,
    pub(crate) controls: &'a AlphaControls,
    /// `[lower, upper]` bounds on `α₁`.
    pub(crate) bounds: [f64; 2],
    pub(crate) alpha_old: &'a [f64],
    /// Latest iterate, used for the first interface normal.
    pub(crate) alpha: &'a [f64],
    pub(crate) phi: [&'a [f64]; 2],
    pub(crate) phi_mix: &'a [f64],
    /// Inlet value of `α₁` per face, `None` on internal and other faces.
    pub(crate) inlet_alpha: &'a [Option<f64>],
    /// Donor-limited mass rate into phase 1, kg/m³·s.
    pub(crate) dmdt: &'a [f64],
    pub(crate) rho: [&'a [f64]; 2],
    pub(crate) dispersion: Option<Dispersion<'a>>,
}

/// Result of a volume-fraction solve.
#[derive(Debug, Clone)]
pub(crate) struct AlphaSolution {
    pub(crate) alpha: Vec<f64>,
    /// Time-averaged phase-1 volumetric flux `α₁φ₁` over the step.
    pub(crate) alpha_phi: Vec<f64>,
    pub(crate) report: AlphaReport,
}

impl AlphaProblem<'_> {
    /// Runs the sub-cycled explicit solve and the optional implicit
    /// dispersion correction.
    ///
    /// # Errors
    ///
    /// Returns a [`TwoPhaseError::Boundedness`] if clipping fails, or a
    /// [`TwoPhaseError::Convergence`] if the dispersion solve does not
    /// converge.
    pub(crate) fn solve(&self) -> Result<AlphaSolution, TwoPhaseError> {
        let mesh = self.mesh;
        let n_sub = self.controls.n_alpha_sub_cycles;
        let dt_sub = self.dt / n_sub as f64;
        let courant = self.courant(dt_sub);
        if courant > 1.0 {
            warn!(courant, field = self.field, "volume-fraction Courant number above 1");
        }

        let mut report = AlphaReport {
            courant,
            ..AlphaReport::default()
        };
        let mut alpha = self.alpha.to_vec();
        let mut alpha_phi = vec![0.0; mesh.n_faces()];

        for _ in 0..self.controls.n_alpha_corr {
            let normal_from = alpha;
            alpha = self.alpha_old.to_vec();
            alpha_phi.iter_mut().for_each(|f| *f = 0.0);

            let normals = interface_normals(mesh, &normal_from, self.inlet_alpha);
            for _ in 0..n_sub {
                let flux = self.sub_step(&mut alpha, &normals, dt_sub)?;
                let clipped = clip(
                    mesh,
                    self.field,
                    &mut alpha,
                    self.bounds,
                    self.controls.alpha_excursion_tolerance,
                )?;
                if clipped.max_excursion > report.max_excursion {
                    report.max_excursion = clipped.max_excursion;
                    report.worst_cell = clipped.worst_cell;
                }
                report.clipped_volume += clipped.moved;
                for (total, f) in alpha_phi.iter_mut().zip(&flux) {
                    *total += f / n_sub as f64;
                }
            }
        }

        if let Some(dispersion) = &self.dispersion {
            let result = self.disperse(&mut alpha, &mut alpha_phi, dispersion)?;
            report.dispersion_iterations = Some(result);
        }

        let volumes = mesh.cell_volumes();
        report.min = alpha.iter().copied().fold(f64::INFINITY, f64::min);
        report.max = alpha.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        report.mean = alpha.iter().zip(volumes).map(|(a, v)| a * v).sum::<f64>()
            / mesh.total_volume();

        debug!(
            field = self.field,
            mean = report.mean,
            min = report.min,
            max = report.max,
            courant = report.courant,
            "volume fraction solved"
        );
        Ok(AlphaSolution {
            alpha,
            alpha_phi,
            report,
        })
    }

    /// Largest `0.5 Σ|φ_mix| Δt / V`, a global reduction over all cells.
    fn courant(&self, dt: f64) -> f64 {
        let mesh = self.mesh;
        let magnitudes: Vec<f64> = self.phi_mix.iter().map(|p| p.abs()).collect();
        let mut sum = vec![0.0; mesh.n_cells()];
        for (f, m) in magnitudes.iter().enumerate() {
            sum[mesh.owner()[f]] += m;
            if mesh.is_internal(f) {
                sum[mesh.neighbour()[f]] += m;
            }
        }
        sum.iter()
            .zip(mesh.cell_volumes())
            .map(|(s, v)| 0.5 * s * dt / v)
            .fold(0.0, f64::max)
    }

    fn boundary_value(&self, alpha: &[f64], face: usize) -> f64 {
        boundary_value(self.mesh, alpha, self.inlet_alpha, face)
    }

    /// One explicit bounded update of `alpha`; returns the face flux used.
    fn sub_step(
        &self,
        alpha: &mut [f64],
        normals: &[DVec3],
        dt: f64,
    ) -> Result<Vec<f64>, TwoPhaseError> {
        let mesh = self.mesh;
        let n_faces = mesh.n_faces();
        let (owner, neighbour, w) = (mesh.owner(), mesh.neighbour(), mesh.weights());
        let upwind = |a: &[f64], f: usize, flux: f64| {
            if flux >= 0.0 {
                a[owner[f]]
            } else {
                a[neighbour[f]]
            }
        };

        // Each fraction is taken from the cell its phase leaves.
        let drift = |a: &[f64], f: usize, phi_r: f64| {
            phi_r * upwind(a, f, phi_r) * (1.0 - upwind(a, f, -phi_r))
        };

        let low: Vec<f64> = (0..n_faces)
            .map(|f| {
                if mesh.is_internal(f) {
                    self.phi_mix[f] * upwind(alpha, f, self.phi_mix[f])
                        + drift(alpha, f, self.phi[0][f] - self.phi[1][f])
                } else {
                    self.boundary_value(alpha, f) * self.phi[0][f]
                }
            })
            .collect();

        // Global reduction: largest mixture face velocity.
        let phi_max = (0..mesh.n_internal_faces())
            .map(|f| self.phi_mix[f].abs() / mesh.mag_sf()[f])
            .fold(0.0, f64::max);
        let c_alpha = self.controls.c_alpha;
        let correction: Vec<f64> = (0..n_faces)
            .map(|f| {
                if !mesh.is_internal(f) {
                    return 0.0;
                }
                let speed = (c_alpha * self.phi_mix[f].abs() / mesh.mag_sf()[f]).min(phi_max);
                let compression = speed * normals[f].dot(mesh.face_areas()[f]);
                let phi_r = self.phi[0][f] - self.phi[1][f];
                let linear = alpha[owner[f]] * w[f] + alpha[neighbour[f]] * (1.0 - w[f]);
                let higher_order = self.phi_mix[f] * (linear - upwind(alpha, f, self.phi_mix[f]));
                higher_order + drift(alpha, f, phi_r + compression) - drift(alpha, f, phi_r)
            })
            .collect();

        let div_mix = surface_integrate(mesh, self.phi_mix);
        let update = |flux: &[f64], start: &[f64]| -> Vec<f64> {
            let net = surface_integrate(mesh, flux);
            (0..mesh.n_cells())
                .map(|i| {
                    let v = mesh.cell_volumes()[i];
                    let a = start[i];
                    let source = self.dmdt[i] * ((1.0 - a) / self.rho[0][i] + a / self.rho[1][i]);
                    a + dt * ((a * div_mix[i] - net[i]) / v + source)
                })
                .collect()
        };

        let alpha_low = update(&low, alpha);
        let lambda = limit(mesh, alpha, &alpha_low, &correction, dt, self.bounds);
        let flux: Vec<f64> = (0..n_faces)
            .map(|f| low[f] + lambda[f] * correction[f])
            .collect();
        let next = update(&flux, alpha);

        if let Some(cell) = next.iter().position(|a| !a.is_finite()) {
            return Err(TwoPhaseError::NonFinite {
                field: self.field.to_owned(),
                location: Location::Cell(cell),
                reason: "explicit volume-fraction update".to_owned(),
            });
        }
        alpha.copy_from_slice(&next);
        Ok(flux)
    }

    /// Implicit `∂α₁/∂t = ∇·(Γ ∇α₁)`, adding its flux to `alpha_phi`.
    fn disperse(
        &self,
        alpha: &mut [f64],
        alpha_phi: &mut [f64],
        dispersion: &Dispersion<'_>,
    ) -> Result<usize, TwoPhaseError> {
        let mesh = self.mesh;
        let mut matrix = FvMatrix::<f64>::new(mesh);
        for (i, v) in mesh.cell_volumes().iter().enumerate() {
            matrix.diag_mut()[i] = v / self.dt;
            matrix.source_mut()[i] = alpha[i] * v / self.dt;
        }
        let coefficients: Vec<f64> = (0..mesh.n_internal_faces())
            .map(|f| dispersion.gamma_f[f] * mesh.mag_sf()[f] * mesh.delta_coeffs()[f])
            .collect();
        for (f, c) in coefficients.iter().enumerate() {
            matrix.add_symmetric(mesh, f, *c);
        }

        let result = solve_pcg(&matrix, mesh, alpha, dispersion.solver);
        if !result.converged {
            return Err(TwoPhaseError::Convergence {
                solver: "volume-fraction dispersion",
                location: Location::Global,
                reason: format!(
                    "residual {:e} after {} iterations",
                    result.residual_norm, result.iterations
                ),
            });
        }

        for (f, c) in coefficients.iter().enumerate() {
            let (own, nei) = (mesh.owner()[f], mesh.neighbour()[f]);
            alpha_phi[f] -= c * (alpha[nei] - alpha[own]);
        }
        debug!(
            iterations = result.iterations,
            residual = result.residual_norm,
            "volume-fraction dispersion solved"
        );
        Ok(result.iterations)
    }
}

/// Face value of `α₁` on a boundary: the inlet value on inlets, the owner
/// value elsewhere.
fn boundary_value(mesh: &Mesh, alpha: &[f64], inlet_alpha: &[Option<f64>], face: usize) -> f64 {
    inlet_alpha[face].unwrap_or(alpha[mesh.owner()[face]])
}

/// Unit interface normals on faces from the Gauss gradient of `alpha`.
///
/// The gradient is regularized by `δN = 1e-8 / V̄^⅓`, so the normal fades to
/// zero away from the interface.
pub(crate) fn interface_normals(
    mesh: &Mesh,
    alpha: &[f64],
    inlet_alpha: &[Option<f64>],
) -> Vec<DVec3> {
    let w = mesh.weights();
    let face_alpha: Vec<f64> = (0..mesh.n_faces())
        .map(|f| {
            if mesh.is_internal(f) {
                let (own, nei) = (mesh.owner()[f], mesh.neighbour()[f]);
                alpha[own] * w[f] + alpha[nei] * (1.0 - w[f])
            } else {
                boundary_value(mesh, alpha, inlet_alpha, f)
            }
        })
        .collect();
    let gradient = gauss_gradient(mesh, &face_alpha);
    let mean_volume = mesh.total_volume() / mesh.n_cells() as f64;
    let delta_n = 1e-8 / mean_volume.cbrt();
    interpolate(mesh, &gradient)
        .into_iter()
        .map(|g| g / (g.length() + delta_n))
        .collect()
}
