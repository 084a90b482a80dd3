//! Preconditioned conjugate gradients for symmetric positive-definite
//! [`FvMatrix`] systems.
//!
//! Used for the mixture pressure equation and the implicit turbulent
//! dispersion correction of the volume fraction. Convergence is declared
//! when `‖r‖ ≤ max(rtol · ‖r₀‖, atol)`.

use crate::support::mesh::Mesh;

use super::FvMatrix;

/// Solver configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcgConfig {
    /// Relative tolerance on the initial residual.
    pub rtol: f64,
    /// Absolute residual floor.
    pub atol: f64,
    pub max_iter: usize,
    pub preconditioner: Preconditioner,
}

impl Default for PcgConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-10,
            atol: 1e-14,
            max_iter: 1000,
            preconditioner: Preconditioner::Jacobi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preconditioner {
    None,
    /// Diagonal scaling, `M = diag(A)`.
    Jacobi,
}

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcgResult {
    pub converged: bool,
    pub iterations: usize,
    pub initial_residual_norm: f64,
    pub residual_norm: f64,
}

/// Solves `A x = b` in place, starting from the current `x`.
///
/// The solve never fails; callers decide what an unconverged result means.
#[must_use]
pub fn solve_pcg(matrix: &FvMatrix<f64>, mesh: &Mesh, x: &mut [f64], config: &PcgConfig) -> PcgResult {
    let n = x.len();
    let mut r = matrix.residual(mesh, x);
    let r0 = norm(&r);
    let target = (config.rtol * r0).max(config.atol);

    if r0 <= target {
        return PcgResult {
            converged: true,
            iterations: 0,
            initial_residual_norm: r0,
            residual_norm: r0,
        };
    }

    let precondition = |r: &[f64], z: &mut [f64]| match config.preconditioner {
        Preconditioner::None => z.copy_from_slice(r),
        Preconditioner::Jacobi => {
            for ((z, r), d) in z.iter_mut().zip(r).zip(matrix.diag()) {
                *z = if *d != 0.0 { r / d } else { *r };
            }
        }
    };

    let mut z = vec![0.0; n];
    precondition(&r, &mut z);
    let mut p = z.clone();
    let mut rho = dot(&r, &z);
    let mut residual_norm = r0;

    for iter in 0..config.max_iter {
        let ap = matrix.apply(mesh, &p);
        let p_ap = dot(&p, &ap);
        if p_ap.abs() < f64::MIN_POSITIVE {
            return PcgResult {
                converged: false,
                iterations: iter,
                initial_residual_norm: r0,
                residual_norm,
            };
        }

        let alpha = rho / p_ap;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }

        residual_norm = norm(&r);
        if residual_norm <= target {
            return PcgResult {
                converged: true,
                iterations: iter + 1,
                initial_residual_norm: r0,
                residual_norm,
            };
        }

        precondition(&r, &mut z);
        let rho_new = dot(&r, &z);
        let beta = rho_new / rho;
        rho = rho_new;
        for i in 0..n {
            p[i] = z[i] + beta * p[i];
        }
    }

    PcgResult {
        converged: false,
        iterations: config.max_iter,
        initial_residual_norm: r0,
        residual_norm,
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(a, b)| a * b).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::support::mesh::RectangularGrid;

    /// Poisson problem `-∇²x = 0` with x = 0 on the left and x = 1 on the right.
    #[test]
    fn solves_one_dimensional_poisson() {
        let mesh = Mesh::rectangular(&RectangularGrid::new(10, 1, 1.0, 0.1)).unwrap();
        let mut m = FvMatrix::<f64>::new(&mesh);
        for f in 0..mesh.n_internal_faces() {
            m.add_symmetric(&mesh, f, mesh.mag_sf()[f] * mesh.delta_coeffs()[f]);
        }
        for (name, value) in [("left", 0.0), ("right", 1.0)] {
            for f in mesh.patch(name).unwrap().faces() {
                let c = mesh.mag_sf()[f] * mesh.delta_coeffs()[f];
                let cell = mesh.owner()[f];
                m.diag_mut()[cell] += c;
                m.source_mut()[cell] += c * value;
            }
        }

        let mut x = vec![0.0; mesh.n_cells()];
        let result = solve_pcg(&m, &mesh, &mut x, &PcgConfig::default());

        assert!(result.converged);
        assert!(result.iterations <= 20);
        for (xi, c) in x.iter().zip(mesh.cell_centres()) {
            assert_relative_eq!(*xi, c.x, epsilon = 1e-8);
        }
    }

    #[test]
    fn reports_non_convergence() {
        let mesh = Mesh::rectangular(&RectangularGrid::new(20, 1, 1.0, 0.1)).unwrap();
        let mut m = FvMatrix::<f64>::new(&mesh);
        for f in 0..mesh.n_internal_faces() {
            m.add_symmetric(&mesh, f, 1.0);
        }
        m.diag_mut()[0] += 1.0;
        m.source_mut()[19] = 1.0;

        let config = PcgConfig {
            max_iter: 2,
            ..PcgConfig::default()
        };
        let mut x = vec![0.0; mesh.n_cells()];
        let result = solve_pcg(&m, &mesh, &mut x, &config);
        assert!(!result.converged);
        assert_eq!(result.iterations, 2);
        assert!(result.residual_norm > 0.0);
    }
}
