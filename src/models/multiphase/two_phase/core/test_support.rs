use std::{collections::BTreeMap, sync::Arc};

use serde_json::{Value, json};

use crate::support::{
    closure::ClosureRegistry,
    mesh::{Mesh, RectangularGrid},
};

use super::{Phase, TwoPhaseSystem, config::PhaseConfig};

/// Air bubbles in water with constant drag `k` and no other closures.
pub(crate) fn air_water_dict(alpha_air: f64, k: f64) -> Value {
    json!({
        "phases": ["air", "water"],
        "air": {
            "thermo": { "type": "constantDensity", "fluid": "air" },
            "diameterModel": { "type": "constant", "d": 3e-3 },
            "alpha": alpha_air,
            "viscosity": 1.8e-5,
            "thermalConductivity": 0.026
        },
        "water": {
            "thermo": { "type": "constantDensity", "fluid": "water" },
            "diameterModel": { "type": "constant", "d": 1e-4 },
            "viscosity": 1e-3,
            "thermalConductivity": 0.6
        },
        "drag": { "air_in_water": { "type": "constant", "K": k } },
        "gravity": [0.0, -9.81, 0.0]
    })
}

/// A closed `nx × ny` box of unit size.
pub(crate) fn box_mesh(nx: usize, ny: usize) -> Mesh {
    Mesh::rectangular(&RectangularGrid::new(nx, ny, 1.0, 1.0)).unwrap()
}

/// A closed row of `n` cells along x.
pub(crate) fn channel(n: usize) -> Mesh {
    Mesh::rectangular(&RectangularGrid::new(n, 1, 1.0, 1.0 / n as f64)).unwrap()
}

/// Still water at atmospheric pressure filling a fraction `alpha` of every cell.
pub(crate) fn water(mesh: &Mesh, alpha: f64) -> Phase {
    let dict = air_water_dict(0.0, 0.0);
    let config: PhaseConfig = serde_json::from_value(dict["water"].clone()).unwrap();
    let n = mesh.n_cells();
    Phase::new(
        "water",
        &config,
        vec![alpha; n],
        &BTreeMap::new(),
        mesh,
        &vec![1.0e5; n],
    )
    .unwrap()
}

/// A system on a closed 3 × 3 box.
pub(crate) fn system(dict: Value) -> TwoPhaseSystem {
    TwoPhaseSystem::new(
        Arc::new(box_mesh(3, 3)),
        &dict,
        &ClosureRegistry::with_builtins(),
    )
    .unwrap()
}
