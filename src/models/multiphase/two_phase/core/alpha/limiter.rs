//! Zalesak flux limiter for the bounded volume-fraction update.

use crate::support::mesh::Mesh;

/// Limiter coefficients `λ ∈ [0, 1]` of an antidiffusive correction flux.
///
/// `alpha` is the sub-step start value and `alpha_low` the low-order
/// solution. The limited update `alpha_low - Δt/V Σ λ ΔF` stays within the
/// local extrema of both, clipped to `bounds`. Boundary faces carry no
/// correction and get `λ = 0`.
pub(super) fn limit(
    mesh: &Mesh,
    alpha: &[f64],
    alpha_low: &[f64],
    correction: &[f64],
    dt: f64,
    bounds: [f64; 2],
) -> Vec<f64> {
    let n = mesh.n_cells();
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let volumes = mesh.cell_volumes();

    let mut local_min: Vec<f64> = (0..n).map(|i| alpha[i].min(alpha_low[i])).collect();
    let mut local_max: Vec<f64> = (0..n).map(|i| alpha[i].max(alpha_low[i])).collect();
    let mut inflow = vec![0.0; n];
    let mut outflow = vec![0.0; n];

    for f in 0..mesh.n_internal_faces() {
        let (own, nei) = (owner[f], neighbour[f]);
        let nei_min = alpha[nei].min(alpha_low[nei]);
        let nei_max = alpha[nei].max(alpha_low[nei]);
        let own_min = alpha[own].min(alpha_low[own]);
        let own_max = alpha[own].max(alpha_low[own]);
        local_min[own] = local_min[own].min(nei_min);
        local_max[own] = local_max[own].max(nei_max);
        local_min[nei] = local_min[nei].min(own_min);
        local_max[nei] = local_max[nei].max(own_max);

        let df = correction[f];
        if df > 0.0 {
            outflow[own] += df;
            inflow[nei] += df;
        } else {
            inflow[own] -= df;
            outflow[nei] -= df;
        }
    }

    let ratio = |q: f64, p: f64| if p > 0.0 { (q / p).clamp(0.0, 1.0) } else { 1.0 };
    let (r_plus, r_minus): (Vec<f64>, Vec<f64>) = (0..n)
        .map(|i| {
            let scale = dt / volumes[i];
            let q_plus = (local_max[i].min(bounds[1]) - alpha_low[i]).max(0.0);
            let q_minus = (alpha_low[i] - local_min[i].max(bounds[0])).max(0.0);
            (
                ratio(q_plus, inflow[i] * scale),
                ratio(q_minus, outflow[i] * scale),
            )
        })
        .unzip();

    (0..mesh.n_faces())
        .map(|f| {
            if !mesh.is_internal(f) {
                return 0.0;
            }
            let (own, nei) = (owner[f], neighbour[f]);
            if correction[f] > 0.0 {
                r_minus[own].min(r_plus[nei])
            } else {
                r_plus[own].min(r_minus[nei])
            }
        })
        .collect()
}
