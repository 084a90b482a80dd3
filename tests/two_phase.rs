use std::sync::Arc;

use approx::assert_relative_eq;
use serde_json::{Value, json};
use twine_core::Model;
use twine_two_phase::{
    models::multiphase::two_phase::{
        PimpleControls, Snapshot, StepReport, TwoPhaseError, TwoPhaseFlow, TwoPhaseFlowInput,
        TwoPhaseSystem,
    },
    support::{
        closure::ClosureRegistry,
        fvm::{PcgConfig, interpolate},
        mesh::{Mesh, PatchKind, RectangularGrid},
    },
};
use uom::si::{f64::Time, time::second};

fn phase(fluid: &str, d: f64, mu: f64, kappa: f64) -> Value {
    json!({
        "thermo": { "type": "constantDensity", "fluid": fluid },
        "diameterModel": { "type": "constant", "d": d },
        "viscosity": mu,
        "thermalConductivity": kappa
    })
}

/// Water listed first, air second, coupled by a constant drag `k`.
fn water_air(alpha_water: Value, k: f64) -> Value {
    let mut water = phase("water", 1e-4, 1e-3, 0.6);
    water["alpha"] = alpha_water;
    json!({
        "phases": ["water", "air"],
        "water": water,
        "air": phase("air", 3e-3, 1.8e-5, 0.026),
        "drag": { "air_in_water": { "type": "constant", "K": k } },
        "gravity": [0.0, -9.81, 0.0]
    })
}

fn build(mesh: Mesh, dict: &Value) -> TwoPhaseSystem {
    TwoPhaseSystem::new(Arc::new(mesh), dict, &ClosureRegistry::with_builtins()).unwrap()
}

fn seconds(dt: f64) -> Time {
    Time::new::<second>(dt)
}

fn run(system: &mut TwoPhaseSystem, dt: f64, steps: usize) -> Vec<StepReport> {
    let controls = PimpleControls::default();
    (0..steps)
        .map(|_| {
            let report = system.advance(seconds(dt), &controls).unwrap();
            assert!(report.pressure.converged);
            assert_bounded(system);
            report
        })
        .collect()
}

fn assert_bounded(system: &TwoPhaseSystem) {
    let (alpha1, alpha2) = (system.phase1().alpha(), system.phase2().alpha());
    for (a1, a2) in alpha1.values().iter().zip(alpha2.values()) {
        assert!((a1 + a2 - 1.0).abs() <= 1e-10, "α₁ + α₂ = {}", a1 + a2);
        assert!((-1e-8..=1.0 + 1e-8).contains(a1), "α₁ = {a1}");
    }
}

/// `Σ α V` of a phase, m³.
fn phase_volume(system: &TwoPhaseSystem, name: &str) -> f64 {
    let phase = system.phase(name).unwrap();
    phase
        .alpha()
        .values()
        .iter()
        .zip(system.mesh().cell_volumes())
        .map(|(a, v)| a * v)
        .sum()
}

/// Net mass flow of a phase out through a patch, kg/s.
fn outflow(system: &TwoPhaseSystem, name: &str, patch: &str) -> f64 {
    let flux = system.phase(name).unwrap().alpha_rho_phi().values();
    system
        .mesh()
        .patch(patch)
        .unwrap()
        .faces()
        .map(|f| flux[f])
        .sum()
}

#[test]
fn still_uniform_fields_stay_still() {
    let mut dict = water_air(json!(0.3), 10.0);
    dict.as_object_mut().unwrap().remove("gravity");
    let mut system = build(
        Mesh::rectangular(&RectangularGrid::new(4, 4, 1.0, 1.0)).unwrap(),
        &dict,
    );

    run(&mut system, 0.01, 5);

    for a in system.phase("water").unwrap().alpha().values() {
        assert_relative_eq!(*a, 0.3, epsilon = 1e-12);
    }
    // Velocities carry round-off from the pressure solve only.
    for phase in [system.phase1(), system.phase2()] {
        assert!(phase.u().values().iter().all(|u| u.length() < 1e-9));
    }
    for p in system.p().values() {
        assert_relative_eq!(*p, 1.0e5, max_relative = 1e-12);
    }
}

#[test]
fn stiff_drag_moves_the_phases_together() {
    let grid = RectangularGrid::new(4, 4, 1.0, 1.0);
    // Heavy fluid over light, with a lighter lower-left corner to start
    // the overturn.
    let alpha: Vec<f64> = (0..16)
        .map(|cell| {
            let (i, j) = (cell % 4, cell / 4);
            match (i < 2, j < 2) {
                (true, true) => 0.2,
                (_, true) => 0.4,
                _ => 0.8,
            }
        })
        .collect();
    let mut system = build(
        Mesh::rectangular(&grid).unwrap(),
        &water_air(json!(alpha), 1e12),
    );

    run(&mut system, 1e-3, 3);

    let (u1, u2) = (system.phase1().u().values(), system.phase2().u().values());
    assert!(u1.iter().any(|u| u.length() > 1e-6), "the mixture should move");
    for (u1, u2) in u1.iter().zip(u2) {
        assert!((*u1 - *u2).length() < 1e-6);
    }
}

#[test]
fn pure_phase_ignores_the_absent_phase() {
    let mesh = || Mesh::rectangular(&RectangularGrid::new(5, 5, 1.0, 1.0)).unwrap();
    let mut dict = water_air(json!(1.0), 0.0);
    dict["water"]["velocity"] = json!([0.5, 0.0, 0.0]);

    let mut other = dict.clone();
    other["air"] = json!({
        "thermo": { "type": "constantDensity", "rho": 50.0, "cp": 1500.0 },
        "diameterModel": { "type": "constant", "d": 1e-2 },
        "viscosity": 0.2,
        "thermalConductivity": 0.1
    });

    let mut reference = build(mesh(), &dict);
    let mut variant = build(mesh(), &other);
    run(&mut reference, 1e-2, 3);
    run(&mut variant, 1e-2, 3);

    let (a, b) = (reference.phase("water").unwrap(), variant.phase("water").unwrap());
    assert!(a.alpha().values().iter().all(|alpha| *alpha == 1.0));
    for (ua, ub) in a.u().values().iter().zip(b.u().values()) {
        assert!((*ua - *ub).length() < 1e-8, "{ua} != {ub}");
    }
    for (pa, pb) in reference.p().values().iter().zip(variant.p().values()) {
        assert_relative_eq!(*pa, *pb, max_relative = 1e-9);
    }
}

/// Two phases with the same liquid properties and no interphase coupling,
/// flowing in from the left and out to the right.
fn uncoupled_twins(alpha: f64) -> Value {
    let liquid = || {
        json!({
            "thermo": { "type": "constantDensity", "rho": 998.2, "cp": 4184.0 },
            "diameterModel": { "type": "constant", "d": 1e-3 },
            "viscosity": 1e-3,
            "thermalConductivity": 0.6
        })
    };
    let mut dict = json!({
        "phases": ["liquid", "twin"],
        "liquid": liquid(),
        "twin": liquid(),
        "drag": { "liquid_in_twin": { "type": "constant", "K": 0.0 } },
        "gravity": [0.0, -9.81, 0.0]
    });
    dict["liquid"]["alpha"] = json!(alpha);
    dict["liquid"]["inlets"] = json!({ "left": { "alpha": alpha, "velocity": [0.3, 0.0, 0.0] } });
    dict["twin"]["inlets"] = json!({ "left": { "velocity": [0.3, 0.0, 0.0] } });
    dict
}

#[test]
fn uncoupled_identical_phases_match_a_single_phase() {
    let mesh = || {
        Mesh::rectangular(&RectangularGrid::new(6, 4, 0.6, 0.4))
            .unwrap()
            .with_patch_kind("left", PatchKind::Inlet)
            .unwrap()
            .with_patch_kind("right", PatchKind::Outlet)
            .unwrap()
    };
    let mut single = build(mesh(), &uncoupled_twins(1.0));
    let mut split = build(mesh(), &uncoupled_twins(0.4));
    run(&mut single, 0.01, 10);
    run(&mut split, 0.01, 10);

    let reference = single.phase("liquid").unwrap();
    assert!(reference.u().values().iter().any(|u| u.x > 0.1), "the channel should flow");
    for a in split.phase("liquid").unwrap().alpha().values() {
        assert_relative_eq!(*a, 0.4, epsilon = 1e-8);
    }
    for name in ["liquid", "twin"] {
        let phase = split.phase(name).unwrap();
        for (u, expected) in phase.u().values().iter().zip(reference.u().values()) {
            assert!((*u - *expected).length() < 1e-9, "{name}: {u} != {expected}");
        }
    }
    for (p, expected) in split.p().values().iter().zip(single.p().values()) {
        assert_relative_eq!(*p, *expected, max_relative = 1e-10);
    }
}

#[test]
fn mass_transfer_is_conserved() {
    let mesh = Mesh::rectangular(&RectangularGrid::new(4, 4, 1.0, 1.0))
        .unwrap()
        .with_patch_kind("top", PatchKind::Outlet)
        .unwrap();
    let mut dict = water_air(json!(0.5), 1e3);
    dict.as_object_mut().unwrap().remove("gravity");
    dict["massTransfer"] = json!({ "air,water": { "type": "constant", "dmdt": 0.01 } });
    let mut system = build(mesh, &dict);
    // Mass balances hold to the pressure solver tolerance.
    let controls = PimpleControls {
        pressure: PcgConfig {
            rtol: 1e-14,
            atol: 0.0,
            ..PcgConfig::default()
        },
        ..PimpleControls::default()
    };
    let dt = 0.01;

    let mass = |system: &TwoPhaseSystem, name: &str| {
        system
            .phase_mass(name)
            .unwrap()
            .get::<uom::si::mass::kilogram>()
    };
    let (mut transferred, mut air_out, mut water_out) = (0.0, 0.0, 0.0);
    let (air0, water0) = (mass(&system, "air"), mass(&system, "water"));

    for _ in 0..5 {
        system.advance(seconds(dt), &controls).unwrap();
        // The field holds the rate into water, the first listed phase.
        transferred -= dt
            * system
                .dmdt()
                .values()
                .iter()
                .zip(system.mesh().cell_volumes())
                .map(|(m, v)| m * v)
                .sum::<f64>();
        air_out += dt * outflow(&system, "air", "top");
        water_out += dt * outflow(&system, "water", "top");
    }

    assert!(transferred > 0.0);
    let air_gain = mass(&system, "air") - air0 + air_out;
    let water_loss = water0 - mass(&system, "water") - water_out;
    assert_relative_eq!(air_gain, transferred, max_relative = 1e-8);
    assert_relative_eq!(water_loss, transferred, max_relative = 1e-8);
    // The expanding mixture leaves through the outlet.
    assert!(air_out + water_out > 0.0);
}

#[test]
fn compressed_front_stays_bounded_and_sharp() {
    let n = 50;
    let mesh = Mesh::rectangular(&RectangularGrid::new(n, 1, 1.0, 1.0 / n as f64))
        .unwrap()
        .with_patch_kind("left", PatchKind::Inlet)
        .unwrap()
        .with_patch_kind("right", PatchKind::Outlet)
        .unwrap();
    let mut dict = water_air(json!(0.0), 1e6);
    dict.as_object_mut().unwrap().remove("gravity");
    dict["cAlpha"] = json!(1.0);
    dict["water"]["inlets"] = json!({ "left": { "alpha": 1.0, "velocity": [1.0, 0.0, 0.0] } });
    dict["air"]["inlets"] = json!({ "left": { "velocity": [1.0, 0.0, 0.0] } });
    let mut system = build(mesh, &dict);

    let (dt, steps) = (0.0025, 100);
    let reports = run(&mut system, dt, steps);
    assert!(reports.iter().all(|r| r.courant < 1.0));

    let alpha = system.phase("water").unwrap().alpha().values();
    let smeared = alpha.iter().filter(|a| (0.01..0.99).contains(*a)).count();
    assert!(smeared <= 5, "interface spans {smeared} cells");

    let area = 1.0 / n as f64;
    let filled = phase_volume(&system, "water");
    assert_relative_eq!(filled, steps as f64 * dt * area, max_relative = 1e-6);

    let front = alpha.iter().position(|a| *a < 0.5).unwrap();
    let expected = steps as f64 * dt * n as f64;
    assert!((front as f64 - expected).abs() <= 2.5, "front at cell {front}");
}

#[test]
fn dam_break_front_follows_the_shallow_water_solution() {
    let (length, height, depth) = (4.0, 0.1, 0.05);
    let (nx, ny) = (80, 8);
    let grid = RectangularGrid::new(nx, ny, length, height);
    let mesh = Mesh::rectangular(&grid).unwrap();
    let x0 = length / 2.0;
    let alpha: Vec<f64> = mesh
        .cell_centres()
        .iter()
        .map(|c| if c.x < x0 && c.y < depth { 1.0 } else { 0.0 })
        .collect();
    let mut dict = water_air(json!(alpha), 1e5);
    dict["cAlpha"] = json!(1.0);
    let mut system = build(mesh, &dict);

    let volume0 = phase_volume(&system, "water");
    let (dt, steps) = (0.01, 100);
    run(&mut system, dt, steps);
    assert_relative_eq!(phase_volume(&system, "water"), volume0, max_relative = 1e-6);

    // Ritter: h = (2c₀ - ξ)² / 9g with ξ = (x - x₀)/t, so the depth `level`
    // sits at x₀ + t (2c₀ - 3√(g level)).
    let (g, t) = (9.81, steps as f64 * dt);
    let c0 = (g * depth).sqrt();
    let level = depth / 10.0;
    let expected = x0 + t * (2.0 * c0 - 3.0 * (g * level).sqrt());

    let alpha = system.phase("water").unwrap().alpha().values();
    let (dx, dy) = (length / nx as f64, height / ny as f64);
    let column: Vec<f64> = (0..nx)
        .map(|i| (0..ny).map(|j| alpha[grid.cell(i, j)] * dy).sum::<f64>())
        .collect();
    let i = column.iter().position(|h| *h < level).unwrap();
    let s = (column[i - 1] - level) / (column[i - 1] - column[i]);
    let front = (i as f64 - 0.5 + s) * dx;
    assert_relative_eq!(front - x0, expected - x0, max_relative = 5e-2);
    // The reservoir end has not been reached by the rarefaction yet.
    assert_relative_eq!(column[0], depth, max_relative = 1e-3);
}

#[test]
fn injected_bubbles_reach_a_steady_holdup() {
    let grid = RectangularGrid::new(4, 12, 0.1, 0.3);
    let mesh = Mesh::rectangular(&grid)
        .unwrap()
        .with_patch_kind("bottom", PatchKind::Inlet)
        .unwrap()
        .with_patch_kind("top", PatchKind::Outlet)
        .unwrap();
    let mut air = phase("air", 3e-3, 1.8e-5, 0.026);
    air["alpha"] = json!(0.0);
    air["inlets"] = json!({ "bottom": { "alpha": 0.1, "velocity": [0.0, 0.2, 0.0] } });
    let mut water = phase("water", 1e-4, 1e-3, 0.6);
    water["inlets"] = json!({ "bottom": { "velocity": [0.0, 0.0, 0.0] } });
    let dict = json!({
        "phases": ["air", "water"],
        "air": air,
        "water": water,
        "drag": { "air_in_water": { "type": "SchillerNaumann" } },
        "virtualMass": { "air_in_water": { "type": "constantCoefficient", "Cvm": 0.5 } },
        "gravity": [0.0, -9.81, 0.0]
    });
    let mut system = build(mesh, &dict);

    run(&mut system, 5e-3, 500);

    // Gas hold-up is the superficial velocity over the bubble rise velocity.
    let holdup = phase_volume(&system, "air") / system.mesh().total_volume();
    assert!((0.05..0.15).contains(&holdup), "hold-up {holdup}");
    let injected = 0.1 * 0.2 * 0.1;
    let vented: f64 = {
        let flux = system.phase("air").unwrap().alpha_phi().values();
        system.mesh().patch("top").unwrap().faces().map(|f| flux[f]).sum()
    };
    assert_relative_eq!(vented, injected, max_relative = 1e-2);

    let mesh = system.mesh();
    let p = system.p().values();
    let (air, water) = (system.phase("air").unwrap(), system.phase("water").unwrap());
    let rho_m: Vec<f64> = (0..mesh.n_cells())
        .map(|c| {
            let a = air.alpha().values()[c];
            a * air.rho().values()[c] + (1.0 - a) * water.rho().values()[c]
        })
        .collect();

    // The mixture weight above the bottom cell centres rests on the pressure.
    let dy = 0.3 / 12.0;
    for i in 0..4 {
        let bottom = grid.cell(i, 0);
        let weight = 9.81
            * (rho_m[bottom] * dy / 2.0
                + (1..12).map(|j| rho_m[grid.cell(i, j)] * dy).sum::<f64>());
        assert_relative_eq!(p[bottom] - 1.0e5, weight, max_relative = 1e-2);
    }

    // Drag on the bubbles balances buoyancy on every horizontal face.
    let kdf = system.kdf();
    let alpha_f = interpolate(mesh, air.alpha().values());
    let rho_f = interpolate(mesh, air.rho().values());
    let (phi_air, phi_water) = (air.phi().values(), water.phi().values());
    for f in 0..mesh.n_internal_faces() {
        let sf = mesh.face_areas()[f];
        if sf.y == 0.0 {
            continue;
        }
        let (own, nei) = (mesh.owner()[f], mesh.neighbour()[f]);
        let drag = kdf.values()[f] * (phi_air[f] - phi_water[f]);
        let buoyancy = alpha_f[f]
            * (rho_f[f] * -9.81 * sf.y
                - mesh.mag_sf()[f] * mesh.delta_coeffs()[f] * (p[nei] - p[own]));
        assert_relative_eq!(drag, buoyancy, max_relative = 1e-2);
    }
}

fn model() -> TwoPhaseFlow {
    let mesh = Mesh::rectangular(&RectangularGrid::new(4, 4, 1.0, 1.0)).unwrap();
    TwoPhaseFlow::new(
        Arc::new(mesh),
        water_air(json!(0.6), 100.0),
        Arc::new(ClosureRegistry::with_builtins()),
        PimpleControls::default(),
    )
    .unwrap()
}

#[test]
fn model_call_matches_a_direct_step() {
    let flow = model();
    let output = flow
        .call(&TwoPhaseFlowInput {
            snapshot: flow.initial_snapshot().unwrap(),
            dt: seconds(1e-3),
        })
        .unwrap();

    let mut system = flow.system().unwrap();
    let report = system
        .advance(seconds(1e-3), &PimpleControls::default())
        .unwrap();
    let direct = system.snapshot();

    assert_eq!(output.report.pressure.converged, report.pressure.converged);
    for name in ["alpha.water", "p", "phi.air"] {
        let (a, b) = (output.snapshot.scalar(name).unwrap(), direct.scalar(name).unwrap());
        for (a, b) in a.iter().zip(b) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-9);
        }
    }
}

#[test]
fn model_calls_chain_through_snapshots() {
    let flow = model();
    let mut snapshot = flow.initial_snapshot().unwrap();
    for _ in 0..3 {
        let output = flow
            .call(&TwoPhaseFlowInput {
                snapshot,
                dt: seconds(1e-3),
            })
            .unwrap();
        assert!(output.report.courant < 1.0);
        snapshot = output.snapshot;
    }

    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(
        parsed.scalars.keys().collect::<Vec<_>>(),
        snapshot.scalars.keys().collect::<Vec<_>>()
    );
    assert!(parsed.vector("U.water").is_some());
}

#[test]
fn model_rejects_a_malformed_snapshot() {
    let flow = model();
    let mut snapshot = flow.initial_snapshot().unwrap();
    snapshot.scalars.insert("alpha.water".to_owned(), vec![0.5; 3]);

    let err = flow
        .call(&TwoPhaseFlowInput {
            snapshot,
            dt: seconds(1e-3),
        })
        .unwrap_err();
    assert!(matches!(err, TwoPhaseError::Field(_)));
    assert!(!err.is_recoverable());
}
