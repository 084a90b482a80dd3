//! Partial elimination of the interphase momentum coupling.
//!
//! With drag and the implicit part of virtual mass collected in one
//! coefficient `K`, the two momentum equations of a cell (or face) read
//!
//! ```text
//! (A₁ + K) U₁ - K U₂ = H₁
//! (A₂ + K) U₂ - K U₁ = H₂
//! ```
//!
//! and are solved in closed form,
//!
//! ```text
//! U₁ = [(A₂ + K) H₁ + K H₂] / D
//! U₂ = [(A₁ + K) H₂ + K H₁] / D,    D = A₁A₂ + K(A₁ + A₂).
//! ```
//!
//! `D` is positive whenever `A₁, A₂ > 0` and `K ≥ 0`, so no inverse of the
//! coupling block is ever formed. `K → 0` decouples the phases and
//! `K → ∞` gives the drift-flux limit `(H₁ + H₂) / (A₁ + A₂)`.

use std::ops::{Add, Mul};

use glam::DVec3;
use rayon::prelude::*;

fn eliminate<T>(a1: f64, a2: f64, h1: T, h2: T, k: f64) -> [T; 2]
where
    T: Copy + Add<Output = T> + Mul<f64, Output = T>,
{
    let d = a1 * a2 + k * (a1 + a2);
    let inv = 1.0 / d;
    [
        (h1 * (a2 + k) + h2 * k) * inv,
        (h2 * (a1 + k) + h1 * k) * inv,
    ]
}

/// Solves the coupled cell velocities.
///
/// `h` holds the explicit parts in force-per-volume form, so that the
/// uncoupled velocity would be `H / A`.
#[must_use]
pub fn partial_elimination(a: [&[f64]; 2], h: [&[DVec3]; 2], k: &[f64]) -> [Vec<DVec3>; 2] {
    let (u1, u2): (Vec<DVec3>, Vec<DVec3>) = (0..k.len())
        .into_par_iter()
        .map(|i| {
            let [u1, u2] = eliminate(a[0][i], a[1][i], h[0][i], h[1][i], k[i]);
            (u1, u2)
        })
        .unzip();
    [u1, u2]
}

/// Solves the coupled face fluxes.
///
/// Identical to [`partial_elimination`] on face-interpolated coefficients,
/// with the driving terms `Φ` already dotted with the face area.
#[must_use]
pub fn partial_elimination_f(a_f: [&[f64]; 2], phi: [&[f64]; 2], k_f: &[f64]) -> [Vec<f64>; 2] {
    let (phi1, phi2): (Vec<f64>, Vec<f64>) = (0..k_f.len())
        .into_par_iter()
        .map(|f| {
            let [p1, p2] = eliminate(a_f[0][f], a_f[1][f], phi[0][f], phi[1][f], k_f[f]);
            (p1, p2)
        })
        .unzip();
    [phi1, phi2]
}

/// The mixture flux of the face partial elimination as a linear function of
/// the pressure-gradient flux `G = |Sf| ∂p/∂n`.
///
/// `Σ_k α_kf φ_k = e - c G`, with `c > 0` wherever `α_f`, `A_f` are positive.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureFlux {
    pub e: Vec<f64>,
    pub c: Vec<f64>,
}

/// Eliminates both phases from the face mixture flux.
///
/// Substituting `φ_k = Φ_k - α_kf G` into the face elimination gives weights
/// `w₁ = (α₁A₂ + K)/D` and `w₂ = (α₂A₁ + K)/D` on the driving fluxes, which
/// yields `e = w₁Φ₁ + w₂Φ₂` and `c = w₁α₁ + w₂α₂`.
#[must_use]
pub fn mixture_flux(
    alpha_f: [&[f64]; 2],
    a_f: [&[f64]; 2],
    phi: [&[f64]; 2],
    k_f: &[f64],
) -> MixtureFlux {
    let (e, c) = (0..k_f.len())
        .into_par_iter()
        .map(|f| {
            let (a1, a2, k) = (a_f[0][f], a_f[1][f], k_f[f]);
            let (al1, al2) = (alpha_f[0][f], alpha_f[1][f]);
            let d = a1 * a2 + k * (a1 + a2);
            let w1 = (al1 * a2 + k) / d;
            let w2 = (al2 * a1 + k) / d;
            (w1 * phi[0][f] + w2 * phi[1][f], w1 * al1 + w2 * al2)
        })
        .unzip();
    MixtureFlux { e, c }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn no_coupling_gives_independent_velocities() {
        let a = [vec![2.0, 4.0], vec![1.0, 8.0]];
        let h = [vec![DVec3::X * 4.0, DVec3::Y], vec![DVec3::X, DVec3::Z * 16.0]];
        let [u1, u2] = partial_elimination([&a[0], &a[1]], [&h[0], &h[1]], &[0.0, 0.0]);
        assert_relative_eq!(u1[0].x, 2.0);
        assert_relative_eq!(u1[1].y, 0.25);
        assert_relative_eq!(u2[0].x, 1.0);
        assert_relative_eq!(u2[1].z, 2.0);
    }

    #[test]
    fn stiff_coupling_reaches_the_drift_flux_limit() {
        let a = [vec![3.0], vec![1000.0]];
        let h = [vec![DVec3::Y * 30.0], vec![DVec3::Y * -500.0]];
        let [u1, u2] = partial_elimination([&a[0], &a[1]], [&h[0], &h[1]], &[1e12]);
        let limit = (30.0 - 500.0) / 1003.0;
        assert_relative_eq!(u1[0].y, limit, max_relative = 1e-6);
        assert!((u1[0] - u2[0]).length() < 1e-6);
    }

    #[test]
    fn elimination_satisfies_the_coupled_equations() {
        let (a1, a2, k) = (5.0, 0.1, 40.0);
        let (h1, h2) = (1.5, -2.0);
        let [p1, p2] = partial_elimination_f([&[a1], &[a2]], [&[h1], &[h2]], &[k]);
        assert_relative_eq!((a1 + k) * p1[0] - k * p2[0], h1, epsilon = 1e-12);
        assert_relative_eq!((a2 + k) * p2[0] - k * p1[0], h2, epsilon = 1e-12);
    }

    #[test]
    fn mixture_flux_matches_direct_elimination() {
        let (al1, al2) = (0.3, 0.7);
        let (a1, a2, k) = (2.0, 50.0, 7.0);
        let (phi1, phi2, g) = (0.4, -0.1, 0.25);

        let mixture = mixture_flux([&[al1], &[al2]], [&[a1], &[a2]], [&[phi1], &[phi2]], &[k]);
        let [p1, p2] = partial_elimination_f(
            [&[a1], &[a2]],
            [&[phi1 - al1 * g], &[phi2 - al2 * g]],
            &[k],
        );

        assert!(mixture.c[0] > 0.0);
        assert_relative_eq!(
            mixture.e[0] - mixture.c[0] * g,
            al1 * p1[0] + al2 * p2[0],
            epsilon = 1e-12
        );
    }

    #[test]
    fn face_elimination_keeps_face_order() {
        let n = 2000;
        let al1: Vec<f64> = (0..n).map(|f| 0.1 + 0.8 * f as f64 / n as f64).collect();
        let al2: Vec<f64> = al1.iter().map(|a| 1.0 - a).collect();
        let a1: Vec<f64> = (0..n).map(|f| 1.0 + f as f64).collect();
        let a2: Vec<f64> = (0..n).map(|f| 500.0 - 0.2 * f as f64).collect();
        let k: Vec<f64> = (0..n).map(|f| (f % 7) as f64 * 3.0).collect();
        let phi1: Vec<f64> = (0..n).map(|f| (f as f64).sin()).collect();
        let phi2: Vec<f64> = (0..n).map(|f| (f as f64).cos()).collect();

        let [p1, p2] = partial_elimination_f([&a1, &a2], [&phi1, &phi2], &k);
        let mixture = mixture_flux([&al1, &al2], [&a1, &a2], [&phi1, &phi2], &k);
        for f in 0..n {
            assert_relative_eq!(
                (a1[f] + k[f]) * p1[f] - k[f] * p2[f],
                phi1[f],
                epsilon = 1e-9
            );
            assert_relative_eq!(
                (a2[f] + k[f]) * p2[f] - k[f] * p1[f],
                phi2[f],
                epsilon = 1e-9
            );
            assert_relative_eq!(mixture.e[f], al1[f] * p1[f] + al2[f] * p2[f], epsilon = 1e-9);
        }
    }
}
