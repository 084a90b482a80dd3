//! Conservative clipping of the volume fraction.

use crate::support::{field::Location, mesh::Mesh};

use super::super::TwoPhaseError;

/// Residual misplaced phase volume, relative to the domain volume, above
/// which redistribution has failed.
const LEFTOVER_TOLERANCE: f64 = 1e-8;

/// What one clipping pass did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(super) struct Clip {
    /// Largest distance of a cell value outside the bounds before clipping.
    pub(super) max_excursion: f64,
    pub(super) worst_cell: Option<usize>,
    /// Phase volume moved between cells, m³.
    pub(super) moved: f64,
}

/// Clips `alpha` into `bounds`, moving the clipped phase volume into cells
/// that can take it.
///
/// Volume cut from a cell goes first to its face neighbours in proportion
/// to their remaining capacity, then to a domain-wide pool shared the same
/// way, so `Σ α V` is unchanged.
///
/// # Errors
///
/// Returns [`TwoPhaseError::Boundedness`] at the worst cell if any value is
/// further than `tolerance` outside the bounds, or if the clipped volume
/// cannot be placed.
pub(super) fn clip(
    mesh: &Mesh,
    field: &str,
    alpha: &mut [f64],
    bounds: [f64; 2],
    tolerance: f64,
) -> Result<Clip, TwoPhaseError> {
    let [lo, hi] = bounds;
    let volumes = mesh.cell_volumes();

    // Global reduction over all cells.
    let (worst_cell, max_excursion) = alpha
        .iter()
        .map(|a| (lo - a).max(a - hi).max(0.0))
        .enumerate()
        .fold((None, 0.0), |(cell, worst), (i, e)| {
            if e > worst { (Some(i), e) } else { (cell, worst) }
        });

    let Some(worst) = worst_cell else {
        return Ok(Clip::default());
    };
    if max_excursion > tolerance {
        return Err(TwoPhaseError::Boundedness {
            field: field.to_owned(),
            location: Location::Cell(worst),
            reason: format!(
                "value {:.6e} is {max_excursion:.3e} outside [{lo}, {hi}]",
                alpha[worst]
            ),
        });
    }

    let mut moved = 0.0;
    // Positive pool is excess phase volume, negative is a deficit.
    let mut pool = 0.0;
    for i in 0..alpha.len() {
        let excess = (alpha[i] - hi).max(0.0) * volumes[i];
        let deficit = (lo - alpha[i]).max(0.0) * volumes[i];
        if excess > 0.0 {
            alpha[i] = hi;
            moved += excess;
            pool += spread(mesh, alpha, mesh.cell_cells(i), excess, |a| hi - a);
        } else if deficit > 0.0 {
            alpha[i] = lo;
            moved += deficit;
            pool += spread(mesh, alpha, mesh.cell_cells(i), -deficit, |a| a - lo);
        }
    }

    if pool != 0.0 {
        let all: Vec<usize> = (0..alpha.len()).collect();
        let leftover = if pool > 0.0 {
            spread(mesh, alpha, &all, pool, |a| hi - a)
        } else {
            spread(mesh, alpha, &all, pool, |a| a - lo)
        };
        if leftover.abs() > LEFTOVER_TOLERANCE * mesh.total_volume() {
            return Err(TwoPhaseError::Boundedness {
                field: field.to_owned(),
                location: Location::Cell(worst),
                reason: format!("{leftover:.3e} m³ of clipped phase volume could not be placed"),
            });
        }
    }

    tracing::debug!(
        field,
        max_excursion,
        worst_cell = worst,
        moved,
        "clipped volume fraction"
    );
    Ok(Clip {
        max_excursion,
        worst_cell: Some(worst),
        moved,
    })
}

/// Adds `amount` of phase volume (removes it if negative) to `cells` in
/// proportion to `capacity(α)·V`, never beyond capacity.
///
/// Returns what did not fit, with the sign of `amount`.
fn spread(
    mesh: &Mesh,
    alpha: &mut [f64],
    cells: &[usize],
    amount: f64,
    capacity: impl Fn(f64) -> f64,
) -> f64 {
    let volumes = mesh.cell_volumes();
    let total: f64 = cells
        .iter()
        .map(|&j| capacity(alpha[j]).max(0.0) * volumes[j])
        .sum();
    if total <= 0.0 {
        return amount;
    }
    let share = (amount.abs() / total).min(1.0);
    for &j in cells {
        let room = capacity(alpha[j]).max(0.0);
        alpha[j] += amount.signum() * share * room;
    }
    amount.signum() * (amount.abs() - share * total)
}
