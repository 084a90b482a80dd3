use glam::{DMat3, DVec3};

use crate::support::{field::FieldValue, mesh::Mesh};

/// Linear interpolation to faces; boundary faces take the owner value.
#[must_use]
pub fn interpolate<T: FieldValue>(mesh: &Mesh, cell: &[T]) -> Vec<T> {
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let w = mesh.weights();
    (0..mesh.n_faces())
        .map(|f| {
            let own = cell[owner[f]];
            if mesh.is_internal(f) {
                own * w[f] + cell[neighbour[f]] * (1.0 - w[f])
            } else {
                own
            }
        })
        .collect()
}

/// Upwind face values of `cell` with respect to `flux`.
///
/// On boundary faces with inflow the value comes from `inflow`; `None`
/// falls back to the owner value.
#[must_use]
pub fn upwind(
    mesh: &Mesh,
    cell: &[f64],
    flux: &[f64],
    inflow: impl Fn(usize) -> Option<f64>,
) -> Vec<f64> {
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    (0..mesh.n_faces())
        .map(|f| {
            let own = cell[owner[f]];
            if flux[f] >= 0.0 {
                own
            } else if mesh.is_internal(f) {
                cell[neighbour[f]]
            } else {
                inflow(f).unwrap_or(own)
            }
        })
        .collect()
}

/// Face fluxes `U_f · Sf` of a face vector field.
#[must_use]
pub fn flux(mesh: &Mesh, face_values: &[DVec3]) -> Vec<f64> {
    face_values
        .iter()
        .zip(mesh.face_areas())
        .map(|(u, sf)| u.dot(*sf))
        .collect()
}

/// Net outflow `Σ_f s_f φ_f` of each cell, not divided by volume.
#[must_use]
pub fn surface_integrate(mesh: &Mesh, face_flux: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; mesh.n_cells()];
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    for (f, phi) in face_flux.iter().enumerate() {
        out[owner[f]] += phi;
        if mesh.is_internal(f) {
            out[neighbour[f]] -= phi;
        }
    }
    out
}

/// Divergence of a face flux, `Σ_f s_f φ_f / V`.
#[must_use]
pub fn divergence(mesh: &Mesh, face_flux: &[f64]) -> Vec<f64> {
    let mut out = surface_integrate(mesh, face_flux);
    for (d, v) in out.iter_mut().zip(mesh.cell_volumes()) {
        *d /= v;
    }
    out
}

/// Gauss gradient `Σ_f Sf x_f / V` from face values.
#[must_use]
pub fn gauss_gradient(mesh: &Mesh, face_values: &[f64]) -> Vec<DVec3> {
    let mut out = vec![DVec3::ZERO; mesh.n_cells()];
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    for (f, (x, sf)) in face_values.iter().zip(mesh.face_areas()).enumerate() {
        out[owner[f]] += *sf * *x;
        if mesh.is_internal(f) {
            out[neighbour[f]] -= *sf * *x;
        }
    }
    for (g, v) in out.iter_mut().zip(mesh.cell_volumes()) {
        *g /= *v;
    }
    out
}

/// Surface-normal gradient `δ (x_N - x_P)`.
///
/// Boundary faces with a prescribed value use it as `x_N`; `None` means zero
/// gradient.
#[must_use]
pub fn sn_grad(mesh: &Mesh, cell: &[f64], boundary: impl Fn(usize) -> Option<f64>) -> Vec<f64> {
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let delta = mesh.delta_coeffs();
    (0..mesh.n_faces())
        .map(|f| {
            let own = cell[owner[f]];
            if mesh.is_internal(f) {
                delta[f] * (cell[neighbour[f]] - own)
            } else {
                boundary(f).map_or(0.0, |b| delta[f] * (b - own))
            }
        })
        .collect()
}

/// Reconstructs cell vectors from face fluxes.
///
/// Solves `T U = Σ_f (Sf/|Sf|) φ_f` with `T = Σ_f Sf Sfᵀ / |Sf|`. Directions
/// without any face (the empty direction of a 2D mesh) are left at zero.
#[must_use]
pub fn reconstruct(mesh: &Mesh, face_flux: &[f64]) -> Vec<DVec3> {
    let n = mesh.n_cells();
    let mut tensor = vec![DMat3::ZERO; n];
    let mut rhs = vec![DVec3::ZERO; n];
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();

    for f in 0..mesh.n_faces() {
        let sf = mesh.face_areas()[f];
        let mag = mesh.mag_sf()[f];
        let t = outer(sf, sf) * (1.0 / mag);
        let r = sf * (face_flux[f] / mag);
        tensor[owner[f]] += t;
        rhs[owner[f]] += r;
        if mesh.is_internal(f) {
            tensor[neighbour[f]] += t;
            rhs[neighbour[f]] += r;
        }
    }

    tensor
        .into_iter()
        .zip(rhs)
        .map(|(mut t, r)| {
            let scale = t.x_axis.x + t.y_axis.y + t.z_axis.z;
            let mut empty = DVec3::ZERO;
            for axis in 0..3 {
                if t.col(axis)[axis].abs() <= 1e-12 * scale {
                    t.col_mut(axis)[axis] = 1.0;
                    empty[axis] = 1.0;
                }
            }
            let u = t.inverse() * r;
            u * (DVec3::ONE - empty)
        })
        .collect()
}

fn outer(a: DVec3, b: DVec3) -> DMat3 {
    DMat3::from_cols(a * b.x, a * b.y, a * b.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::support::mesh::RectangularGrid;

    fn grid() -> Mesh {
        Mesh::rectangular(&RectangularGrid::new(4, 3, 2.0, 1.5)).unwrap()
    }

    #[test]
    fn linear_field_interpolates_exactly() {
        let mesh = grid();
        let x: Vec<f64> = mesh.cell_centres().iter().map(|c| 3.0 * c.x - c.y).collect();
        let xf = interpolate(&mesh, &x);
        for f in 0..mesh.n_internal_faces() {
            let c = mesh.face_centres()[f];
            assert_relative_eq!(xf[f], 3.0 * c.x - c.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn gradient_of_linear_field() {
        let mesh = grid();
        let x: Vec<f64> = mesh.cell_centres().iter().map(|c| 2.0 * c.x + c.y).collect();
        let mut xf = interpolate(&mesh, &x);
        for f in mesh.n_internal_faces()..mesh.n_faces() {
            let c = mesh.face_centres()[f];
            xf[f] = 2.0 * c.x + c.y;
        }
        for g in gauss_gradient(&mesh, &xf) {
            assert_relative_eq!(g.x, 2.0, epsilon = 1e-12);
            assert_relative_eq!(g.y, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn uniform_flux_is_divergence_free_and_reconstructs() {
        let mesh = grid();
        let u = DVec3::new(0.3, -0.2, 0.0);
        let phi = flux(&mesh, &vec![u; mesh.n_faces()]);
        for d in divergence(&mesh, &phi) {
            assert!(d.abs() < 1e-12);
        }
        for uc in reconstruct(&mesh, &phi) {
            assert_relative_eq!(uc.x, u.x, epsilon = 1e-12);
            assert_relative_eq!(uc.y, u.y, epsilon = 1e-12);
            assert_eq!(uc.z, 0.0);
        }
    }

    #[test]
    fn upwind_uses_inflow_values_at_boundaries() {
        let mesh = Mesh::rectangular(&RectangularGrid::new(3, 1, 3.0, 1.0)).unwrap();
        let x = [1.0, 2.0, 3.0];
        let left = mesh.patch("left").unwrap().faces().start;
        let phi: Vec<f64> = mesh.face_areas().iter().map(|sf| sf.x).collect();
        let xf = upwind(&mesh, &x, &phi, |f| (f == left).then_some(7.0));
        assert_eq!(xf[0], 1.0);
        assert_eq!(xf[1], 2.0);
        assert_eq!(xf[left], 7.0);
    }

    #[test]
    fn sn_grad_with_fixed_boundary() {
        let mesh = Mesh::rectangular(&RectangularGrid::new(2, 1, 2.0, 1.0)).unwrap();
        let right = mesh.patch("right").unwrap().faces().start;
        let g = sn_grad(&mesh, &[0.0, 1.0], |f| (f == right).then_some(3.0));
        assert_relative_eq!(g[0], 1.0);
        assert_relative_eq!(g[right], 4.0);
        assert_eq!(g[mesh.patch("left").unwrap().faces().start], 0.0);
    }
}
