//! The two-phase system: both phases, their closures, and the mixture.

mod pimple;

use std::{collections::BTreeMap, sync::Arc};

use glam::DVec3;
use serde_json::Value;
use tracing::debug;
use uom::si::{f64::Mass, f64::Time, mass::kilogram, time::second};

use crate::support::{
    closure::ClosureRegistry,
    field::{Dimensions, FieldError, SurfaceScalarField, VolScalarField, VolVectorField},
    fvm::{PcgConfig, divergence, flux, interpolate, sn_grad},
    mesh::{Mesh, PatchKind},
};

use super::{
    AlphaControls, ConfigError, TwoPhaseError,
    alpha::{AlphaProblem, AlphaReport, Dispersion, interface_normals},
    closures::{ClosureSet, Coefficients},
    config::{CaseConfig, PhaseConfig},
    phase::{MomentumContext, MomentumEqn, Phase},
    snapshot::Snapshot,
    transfer::{
        HeatTransferTable, LinearSource, MassTransferTable, MomentumTransferTable, PhaseTable,
    },
};

pub use pimple::{PimpleControls, StepReport};

/// Largest departure of `α₁ + α₂` from one accepted in initial values.
const ALPHA_SUM_TOLERANCE: f64 = 1e-6;

/// Surface tension, N/m.
const SURFACE_TENSION: Dimensions = Dimensions::new(1, 0, -2, 0, 0);

/// Two phases sharing one mesh, coupled through their interfacial closures.
///
/// The system owns both phases, the configured closure models, the mixture
/// pressure and the mixture face flux. Closure coefficients are evaluated
/// by [`correct`](Self::correct) and live until the next call.
#[derive(Debug)]
pub struct TwoPhaseSystem {
    mesh: Arc<Mesh>,
    phases: [Phase; 2],
    closures: ClosureSet,
    controls: AlphaControls,
    gravity: DVec3,
    /// Pressure of outlet patches, and of the reference cell without one.
    p_ref: f64,
    p: VolScalarField,
    phi: SurfaceScalarField,
    coefficients: Coefficients,
    /// Donor-limited `ṁ`, into phase 1.
    dmdt: Vec<f64>,
    dt: Option<f64>,
    /// Momentum diagonals of the last pressure correction.
    momentum_diagonal: Option<[Vec<f64>; 2]>,
}

impl TwoPhaseSystem {
    /// Builds both phases and their closures from a case dictionary.
    ///
    /// The volume fraction may be given for either phase or both; the
    /// missing one is the complement. Inlet volume fractions resolve the
    /// same way.
    ///
    /// # Errors
    ///
    /// Returns [`TwoPhaseError::Config`] for any malformed, missing or
    /// inconsistent entry, including a species carried by only one phase
    /// while mass transfer is configured, and a step error if the initial
    /// closures cannot be evaluated.
    pub fn new(
        mesh: Arc<Mesh>,
        dict: &Value,
        registry: &ClosureRegistry,
    ) -> Result<Self, TwoPhaseError> {
        let config = CaseConfig::parse(dict)?;
        let closures = ClosureSet::build(&config, registry)?;
        let [name1, name2] = &config.names;
        let [config1, config2] = &config.phases;
        let n = mesh.n_cells();

        let alpha1 = match (&config1.alpha, &config2.alpha) {
            (None, None) => {
                return Err(ConfigError::Missing {
                    key: format!("{name1}.alpha"),
                }
                .into());
            }
            (Some(alpha1), None) => alpha1.expand(&format!("{name1}.alpha"), n)?,
            (None, Some(alpha2)) => complement(&alpha2.expand(&format!("{name2}.alpha"), n)?),
            (Some(alpha1), Some(alpha2)) => {
                let alpha1 = alpha1.expand(&format!("{name1}.alpha"), n)?;
                let alpha2 = alpha2.expand(&format!("{name2}.alpha"), n)?;
                check_sum(&format!("{name2}.alpha"), &alpha1, &alpha2)?;
                alpha1
            }
        };
        let inlet_alpha = resolve_inlet_alpha(&mesh, &config.names, [config1, config2])?;

        let p = VolScalarField::uniform("p", Dimensions::PRESSURE, config.pressure, n);
        let alpha2 = complement(&alpha1);
        let phase1 = Phase::new(name1, config1, alpha1, &inlet_alpha[0], &mesh, p.values())?;
        let phase2 = Phase::new(name2, config2, alpha2, &inlet_alpha[1], &mesh, p.values())?;

        if closures.transfers_mass() {
            check_shared_species([&phase1, &phase2])?;
        }

        let bounds = alpha_bounds(&config.controls, [&phase1, &phase2]);
        if bounds[0] >= bounds[1] {
            return Err(ConfigError::invalid(
                "alphaMax",
                format!("empty volume-fraction bounds [{}, {}]", bounds[0], bounds[1]),
            )
            .into());
        }

        let mut system = Self {
            phi: SurfaceScalarField::zeros("phi", Dimensions::VOLUMETRIC_FLUX, mesh.n_faces()),
            mesh,
            phases: [phase1, phase2],
            closures,
            controls: config.controls,
            gravity: config.gravity,
            p_ref: config.pressure,
            p,
            coefficients: Coefficients::default(),
            dmdt: Vec::new(),
            dt: None,
            momentum_diagonal: None,
        };
        system.update_mixture_flux()?;
        system.correct()?;
        debug!(
            phase1 = %system.phases[0].name(),
            phase2 = %system.phases[1].name(),
            cells = n,
            "two-phase system built"
        );
        Ok(system)
    }

    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[must_use]
    pub fn phase1(&self) -> &Phase {
        &self.phases[0]
    }

    #[must_use]
    pub fn phase2(&self) -> &Phase {
        &self.phases[1]
    }

    #[must_use]
    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|phase| phase.name() == name)
    }

    /// Mutable access for the host's energy and species updates.
    pub fn phase_mut(&mut self, name: &str) -> Option<&mut Phase> {
        self.phases.iter_mut().find(|phase| phase.name() == name)
    }

    /// The phase that is not `phase`.
    #[must_use]
    pub fn other_phase(&self, phase: &Phase) -> &Phase {
        if phase.name() == self.phases[0].name() {
            &self.phases[1]
        } else {
            &self.phases[0]
        }
    }

    /// Names of phase 1 and phase 2.
    #[must_use]
    pub fn names(&self) -> [String; 2] {
        self.phases.each_ref().map(|phase| phase.name().to_owned())
    }

    /// Mixture pressure.
    #[must_use]
    pub fn p(&self) -> &VolScalarField {
        &self.p
    }

    /// Mixture volumetric face flux `α₁φ₁ + α₂φ₂`.
    #[must_use]
    pub fn phi(&self) -> &SurfaceScalarField {
        &self.phi
    }

    #[must_use]
    pub fn gravity(&self) -> DVec3 {
        self.gravity
    }

    #[must_use]
    pub fn alpha_controls(&self) -> &AlphaControls {
        &self.controls
    }

    /// The coefficients of the last [`correct`](Self::correct).
    #[must_use]
    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    /// Re-evaluates every closure coefficient from the current state.
    ///
    /// Once a time step is known the mass rate is limited so that no phase
    /// loses more than it holds at the old time level.
    ///
    /// # Errors
    ///
    /// Returns [`TwoPhaseError::NonFinite`] if a closure model produced NaN
    /// or infinity.
    pub fn correct(&mut self) -> Result<(), TwoPhaseError> {
        let coefficients = self.closures.evaluate(&self.phases[0], &self.phases[1])?;
        self.dmdt = match self.dt {
            Some(dt) => self.limit_mass_rate(&coefficients.dmdt, dt),
            None => coefficients.dmdt.clone(),
        };
        self.coefficients = coefficients;
        Ok(())
    }

    fn limit_mass_rate(&self, dmdt: &[f64], dt: f64) -> Vec<f64> {
        let [phase1, phase2] = &self.phases;
        let mut limited = 0;
        let values = dmdt
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let available = if *m > 0.0 {
                    phase2.alpha_old()[i] * phase2.rho_old()[i] / dt
                } else {
                    phase1.alpha_old()[i] * phase1.rho_old()[i] / dt
                };
                if m.abs() > available {
                    limited += 1;
                    m.signum() * available
                } else {
                    *m
                }
            })
            .collect();
        if limited > 0 {
            debug!(cells = limited, "mass transfer limited by donor mass");
        }
        values
    }

    /// Drag coefficient `K_d`, kg/m³·s.
    #[must_use]
    pub fn kd(&self) -> VolScalarField {
        VolScalarField::new(
            "Kd",
            Dimensions::VOLUMETRIC_MASS_RATE,
            self.coefficients.kd.clone(),
        )
    }

    /// Drag coefficient on faces.
    #[must_use]
    pub fn kdf(&self) -> SurfaceScalarField {
        SurfaceScalarField::new(
            "Kdf",
            Dimensions::VOLUMETRIC_MASS_RATE,
            interpolate(&self.mesh, &self.coefficients.kd),
        )
    }

    /// Virtual-mass coefficient `V_m`, kg/m³.
    #[must_use]
    pub fn vm(&self) -> VolScalarField {
        VolScalarField::new("Vm", Dimensions::DENSITY, self.coefficients.vm.clone())
    }

    /// Interfacial mass rate into phase 1, kg/m³·s.
    ///
    /// Limited by the donor's old-time mass once a time step is known.
    #[must_use]
    pub fn dmdt(&self) -> VolScalarField {
        VolScalarField::new(
            format!("dmdt.{}", self.phases[0].name()),
            Dimensions::VOLUMETRIC_MASS_RATE,
            self.dmdt.clone(),
        )
    }

    /// Surface tension, N/m.
    #[must_use]
    pub fn sigma(&self) -> VolScalarField {
        VolScalarField::new("sigma", SURFACE_TENSION, self.coefficients.sigma.clone())
    }

    /// True if a mass transfer model other than `none` is configured.
    #[must_use]
    pub fn transfers_mass(&self) -> bool {
        self.closures.transfers_mass()
    }

    /// Advances the volume fraction over `dt` with the current fluxes.
    ///
    /// Phase 2 becomes the complement of phase 1, and its flux the mixture
    /// flux minus the phase-1 flux.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive time step, or a recoverable
    /// step error if the solve failed.
    pub fn solve(
        &mut self,
        dt: Time,
        dispersion_solver: &PcgConfig,
    ) -> Result<AlphaReport, TwoPhaseError> {
        let dt = seconds(dt)?;
        self.dt = Some(dt);

        let dispersion = if self.closures.has_turbulent_dispersion() {
            let a = match &self.momentum_diagonal {
                Some(a) => a.clone(),
                None => self.momentum_equations(dt).map(|eqn| eqn.a(&self.mesh)),
            };
            Some(Dispersion {
                gamma_f: self.dispersion_diffusivity(dt, &a),
                solver: dispersion_solver,
            })
        } else {
            None
        };

        let inlet_alpha = self.inlet_alpha();
        let [phase1, phase2] = &self.phases;
        let field = phase1.alpha().name().to_owned();
        let solution = AlphaProblem {
            mesh: &self.mesh,
            field: &field,
            dt,
            controls: &self.controls,
            bounds: alpha_bounds(&self.controls, [phase1, phase2]),
            alpha_old: phase1.alpha_old(),
            alpha: phase1.alpha().values(),
            phi: [phase1.phi().values(), phase2.phi().values()],
            phi_mix: self.phi.values(),
            inlet_alpha: &inlet_alpha,
            dmdt: &self.dmdt,
            rho: [phase1.rho().values(), phase2.rho().values()],
            dispersion,
        }
        .solve()?;

        let alpha2 = complement(&solution.alpha);
        let alpha_phi2 = self
            .phi
            .values()
            .iter()
            .zip(&solution.alpha_phi)
            .map(|(mix, a)| mix - a)
            .collect();
        let mesh = Arc::clone(&self.mesh);
        let [phase1, phase2] = &mut self.phases;
        phase1.set_alpha(solution.alpha)?;
        phase1.set_alpha_phi(&mesh, solution.alpha_phi)?;
        phase2.set_alpha(alpha2)?;
        phase2.set_alpha_phi(&mesh, alpha_phi2)?;
        Ok(solution.report)
    }

    /// Updates both equations of state from the current pressure, keeping
    /// the phase volume fluxes.
    ///
    /// # Errors
    ///
    /// Returns [`TwoPhaseError::Thermo`] if an equation of state fails.
    pub fn correct_thermo(&mut self) -> Result<(), TwoPhaseError> {
        let mesh = Arc::clone(&self.mesh);
        for phase in &mut self.phases {
            phase.correct_thermo(self.p.values())?;
            let alpha_phi = phase.alpha_phi().values().to_vec();
            phase.set_alpha_phi(&mesh, alpha_phi)?;
        }
        Ok(())
    }

    /// Momentum sources of both phases from virtual mass and mass transfer.
    ///
    /// The receiving phase of `ṁ` gets `ṁ(U_donor - U)`. Virtual mass adds
    /// `(V_m/Δt)[(U_other - U_other°) - (U - U°)]`, with the other phase's
    /// current velocity lagged. Before the first time step the virtual-mass
    /// part is absent.
    #[must_use]
    pub fn momentum_transfer(&self) -> MomentumTransferTable {
        let vm_dt = self.vm_by_dt();
        let entries = [0, 1].map(|k| {
            let (own, other) = (&self.phases[k], &self.phases[1 - k]);
            let mut source = self.mass_momentum_source(k);
            for (i, c) in vm_dt.iter().enumerate() {
                source.sp[i] -= c;
                source.su[i] += (own.u_old()[i] - other.u_old()[i] + other.u().values()[i]) * *c;
            }
            source
        });
        PhaseTable::new(self.names(), entries)
    }

    /// Heat sources of both phase temperature equations, W/m³.
    ///
    /// Interfacial heat transfer `h_if (T_other - T)` is split into an
    /// implicit and an explicit part. The enthalpy carried by `ṁ` leaves
    /// the donor and enters the receiver at the donor's specific enthalpy.
    #[must_use]
    pub fn heat_transfer(&self) -> HeatTransferTable {
        let h = &self.coefficients.h;
        let enthalpy = self.phases.each_ref().map(Phase::enthalpy);
        let entries = [0, 1].map(|k| {
            let other = 1 - k;
            let t_other = self.phases[other].temperature().values();
            let sign = orientation(k);
            let su = (0..h.len())
                .map(|i| {
                    let gain = sign * self.dmdt[i];
                    let carried = if gain > 0.0 {
                        gain * enthalpy[other].values()[i]
                    } else {
                        gain * enthalpy[k].values()[i]
                    };
                    h[i] * t_other[i] + carried
                })
                .collect();
            LinearSource {
                su,
                sp: h.iter().map(|h| -h).collect(),
            }
        });
        PhaseTable::new(self.names(), entries)
    }

    /// Species sources of both phases, kg/m³·s.
    ///
    /// The donor loses each of its species implicitly in its own mass
    /// fraction and the receiver gains it at the donor's mass fraction.
    /// Both phases carry the same species whenever mass is transferred.
    #[must_use]
    pub fn mass_transfer(&self) -> MassTransferTable {
        let n = self.mesh.n_cells();
        let entries = [0, 1].map(|k| {
            let other = &self.phases[1 - k];
            let sign = orientation(k);
            self.phases[k]
                .species_names()
                .map(|specie| {
                    let donor_y = other.species(specie);
                    let mut source = LinearSource::zeros(n);
                    for (i, m) in self.dmdt.iter().enumerate() {
                        let gain = sign * m;
                        if gain < 0.0 {
                            source.sp[i] = gain;
                        } else if let Some(y) = donor_y {
                            source.su[i] = gain * y.values()[i];
                        }
                    }
                    (specie.to_owned(), source)
                })
                .collect::<BTreeMap<_, _>>()
        });
        PhaseTable::new(self.names(), entries)
    }

    /// Local continuity residual of each phase, or `None` before the first
    /// time step.
    #[must_use]
    pub fn continuity_errors(&self) -> Option<PhaseTable<VolScalarField>> {
        let dt = self.dt?;
        let entries = [0, 1].map(|k| {
            let gain: Vec<f64> = self.dmdt.iter().map(|m| orientation(k) * m).collect();
            self.phases[k].continuity_error(&self.mesh, dt, &gain)
        });
        Some(PhaseTable::new(self.names(), entries))
    }

    /// Explicit drag of each phase towards the other, `rAU K_d U_other`.
    ///
    /// `r_au` holds the reciprocal momentum diagonal of each phase.
    #[must_use]
    pub fn kd_u_by_as(&self, r_au: [&[f64]; 2]) -> PhaseTable<VolVectorField> {
        let kd = &self.coefficients.kd;
        let entries = [0, 1].map(|k| {
            let u_other = self.phases[1 - k].u().values();
            let values = (0..kd.len())
                .map(|i| u_other[i] * (r_au[k][i] * kd[i]))
                .collect();
            VolVectorField::new(
                format!("KdUByA.{}", self.phases[k].name()),
                Dimensions::VELOCITY,
                values,
            )
        });
        PhaseTable::new(self.names(), entries)
    }

    /// Face flux of the explicit drag, `rAU_f K_df φ_other`.
    #[must_use]
    pub fn phi_kd_phis(&self, r_auf: [&[f64]; 2]) -> PhaseTable<SurfaceScalarField> {
        let kdf = interpolate(&self.mesh, &self.coefficients.kd);
        let entries = [0, 1].map(|k| {
            let phi_other = self.phases[1 - k].phi().values();
            let values = (0..kdf.len())
                .map(|f| r_auf[k][f] * kdf[f] * phi_other[f])
                .collect();
            SurfaceScalarField::new(
                format!("phiKdPhi.{}", self.phases[k].name()),
                Dimensions::VOLUMETRIC_FLUX,
                values,
            )
        });
        PhaseTable::new(self.names(), entries)
    }

    /// Face flux of the turbulent dispersion and surface tension forces.
    ///
    /// Dispersion pushes each phase down its own volume-fraction gradient,
    /// `-rAU_f D_f ∂α/∂n |Sf|`; surface tension `σκ∇α₁` is shared in
    /// proportion to the face volume fraction.
    #[must_use]
    pub fn phi_fs(&self, r_auf: [&[f64]; 2]) -> PhaseTable<SurfaceScalarField> {
        let mesh = &*self.mesh;
        let d_f = interpolate(mesh, &self.coefficients.dispersion);
        let tension = self.surface_tension_flux();
        let entries = [0, 1].map(|k| {
            let phase = &self.phases[k];
            let grad = sn_grad(mesh, phase.alpha().values(), |f| {
                phase.inlet(f).map(|inlet| inlet.alpha)
            });
            let alpha_f = phase.alpha_f(mesh);
            let values = (0..mesh.n_faces())
                .map(|f| {
                    r_auf[k][f] * (alpha_f[f] * tension[f] - d_f[f] * grad[f] * mesh.mag_sf()[f])
                })
                .collect();
            SurfaceScalarField::new(
                format!("phiF.{}", phase.name()),
                Dimensions::VOLUMETRIC_FLUX,
                values,
            )
        });
        PhaseTable::new(self.names(), entries)
    }

    /// Turbulent dispersion diffusivity of each phase, `(rAU D)_f`, m²/s.
    #[must_use]
    pub fn d_by_afs(&self, r_au: [&[f64]; 2]) -> PhaseTable<SurfaceScalarField> {
        let d = &self.coefficients.dispersion;
        let entries = [0, 1].map(|k| {
            let cell: Vec<f64> = d.iter().zip(r_au[k]).map(|(d, r)| d * r).collect();
            SurfaceScalarField::new(
                format!("DByAf.{}", self.phases[k].name()),
                Dimensions::new(0, 2, -1, 0, 0),
                interpolate(&self.mesh, &cell),
            )
        });
        PhaseTable::new(self.names(), entries)
    }

    /// Mass of a phase in the domain, or `None` for a foreign name.
    #[must_use]
    pub fn phase_mass(&self, name: &str) -> Option<Mass> {
        let phase = self.phase(name)?;
        let mass = phase
            .alpha()
            .values()
            .iter()
            .zip(phase.rho().values())
            .zip(self.mesh.cell_volumes())
            .map(|((a, rho), v)| a * rho * v)
            .sum();
        Some(Mass::new::<kilogram>(mass))
    }

    /// Copies the current state to the old time level of both phases.
    pub fn store_old_time(&mut self) {
        for phase in &mut self.phases {
            phase.store_old_time();
        }
        self.momentum_diagonal = None;
    }

    /// The named fields of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for phase in &self.phases {
            snapshot.insert_scalar(phase.alpha());
            snapshot.insert_vector(phase.u());
            snapshot.insert_scalar(phase.phi());
            snapshot.insert_scalar(phase.temperature());
            for specie in phase.species_names() {
                if let Some(field) = phase.species(specie) {
                    snapshot.insert_scalar(field);
                }
            }
        }
        snapshot.insert_scalar(&self.p);
        snapshot.insert_scalar(&self.phi);
        snapshot
    }

    /// Replaces the state with the fields present in `snapshot`.
    ///
    /// Absent fields keep their current values. A phase flux that is absent
    /// while the velocity is present is rebuilt from the velocity. The
    /// loaded state becomes the old time level and the closures are
    /// re-evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Size`] for a field of the wrong length,
    /// [`ConfigError::Invalid`] for volume fractions that do not sum to one,
    /// and a step error if the loaded state is not usable.
    pub fn load(&mut self, snapshot: &Snapshot) -> Result<(), TwoPhaseError> {
        let mesh = Arc::clone(&self.mesh);
        let (n, n_faces) = (mesh.n_cells(), mesh.n_faces());
        let names = self.names();
        let alpha_key = names.each_ref().map(|name| format!("alpha.{name}"));

        let alpha1 = match (snapshot.scalar(&alpha_key[0]), snapshot.scalar(&alpha_key[1])) {
            (None, None) => None,
            (Some(alpha1), None) => Some(sized(&alpha_key[0], n, alpha1.to_vec())?),
            (None, Some(alpha2)) => Some(complement(&sized(&alpha_key[1], n, alpha2.to_vec())?)),
            (Some(alpha1), Some(alpha2)) => {
                let alpha1 = sized(&alpha_key[0], n, alpha1.to_vec())?;
                check_sum(&alpha_key[1], &alpha1, &sized(&alpha_key[1], n, alpha2.to_vec())?)?;
                Some(alpha1)
            }
        };
        if let Some(alpha1) = alpha1 {
            let alpha2 = complement(&alpha1);
            self.phases[0].set_alpha(alpha1)?;
            self.phases[1].set_alpha(alpha2)?;
        }

        for phase in &mut self.phases {
            let name = phase.name().to_owned();
            let velocity = snapshot.vector(&format!("U.{name}"));
            if let Some(u) = &velocity {
                phase.set_u(sized(&format!("U.{name}"), n, u.clone())?)?;
            }
            if let Some(t) = snapshot.scalar(&format!("T.{name}")) {
                phase.set_temperature(sized(&format!("T.{name}"), n, t.to_vec())?)?;
            }
            let species: Vec<String> = phase.species_names().map(str::to_owned).collect();
            for specie in species {
                if let Some(y) = snapshot.scalar(&format!("{specie}.{name}")) {
                    phase.set_species(&specie, y.to_vec())?;
                }
            }
            match snapshot.scalar(&format!("phi.{name}")) {
                Some(phi) => {
                    phase.set_phi(&mesh, sized(&format!("phi.{name}"), n_faces, phi.to_vec())?);
                }
                None if velocity.is_some() => {
                    let phi = flux(&mesh, &interpolate(&mesh, phase.u().values()));
                    phase.set_phi(&mesh, phi);
                }
                None => {}
            }
        }

        if let Some(p) = snapshot.scalar("p") {
            self.p.assign(p.to_vec())?;
            super::phase::non_finite(&self.p, "loaded pressure")?;
        }
        for phase in &mut self.phases {
            phase.correct_thermo(self.p.values())?;
            phase.refresh_fluxes(&mesh);
        }
        self.update_mixture_flux()?;
        self.store_old_time();
        self.correct()?;
        debug!(
            scalars = snapshot.scalars.len(),
            vectors = snapshot.vectors.len(),
            "loaded snapshot"
        );
        Ok(())
    }

    /// Momentum equations of both phases with the mass-transfer momentum
    /// source; gravity and pressure enter on faces.
    fn momentum_equations(&self, dt: f64) -> [MomentumEqn; 2] {
        let sources = [self.mass_momentum_source(0), self.mass_momentum_source(1)];
        [0, 1].map(|k| {
            self.phases[k].u_eqn(
                &self.mesh,
                &MomentumContext {
                    dt,
                    sources: Some(&sources[k]),
                    ..MomentumContext::default()
                },
            )
        })
    }

    /// `ṁ(U_donor - U)` on the receiving phase `k`.
    fn mass_momentum_source(&self, k: usize) -> LinearSource<DVec3> {
        let donor = self.phases[1 - k].u().values();
        let gain: Vec<f64> = self
            .dmdt
            .iter()
            .map(|m| (orientation(k) * m).max(0.0))
            .collect();
        LinearSource {
            su: gain.iter().zip(donor).map(|(g, u)| *u * *g).collect(),
            sp: gain.iter().map(|g| -g).collect(),
        }
    }

    /// `V_m / Δt`, zero before the time step is known.
    fn vm_by_dt(&self) -> Vec<f64> {
        match self.dt {
            Some(dt) => self.coefficients.vm.iter().map(|vm| vm / dt).collect(),
            None => vec![0.0; self.coefficients.vm.len()],
        }
    }

    /// Face diffusivity of the implicit dispersion correction,
    /// `(α₁α₂)_f [D/(A₁ + K) + D/(A₂ + K)]_f`.
    fn dispersion_diffusivity(&self, dt: f64, a: &[Vec<f64>; 2]) -> Vec<f64> {
        let mesh = &*self.mesh;
        let d = &self.coefficients.dispersion;
        let k: Vec<f64> = self
            .coefficients
            .kd
            .iter()
            .zip(&self.coefficients.vm)
            .map(|(kd, vm)| kd + vm / dt)
            .collect();
        let by_a = |a: &[f64]| -> Vec<f64> {
            let cell: Vec<f64> = (0..d.len()).map(|i| d[i] / (a[i] + k[i])).collect();
            interpolate(mesh, &cell)
        };
        let (by_a1, by_a2) = (by_a(&a[0]), by_a(&a[1]));
        let product: Vec<f64> = self.phases[0]
            .alpha()
            .values()
            .iter()
            .zip(self.phases[1].alpha().values())
            .map(|(a1, a2)| a1 * a2)
            .collect();
        interpolate(mesh, &product)
            .iter()
            .enumerate()
            .map(|(f, p)| p * (by_a1[f] + by_a2[f]))
            .collect()
    }

    /// Face flux of the surface tension force on the mixture,
    /// `σ_f κ_f ∂α₁/∂n |Sf|`, with curvature `κ = -∇·n̂`.
    fn surface_tension_flux(&self) -> Vec<f64> {
        let mesh = &*self.mesh;
        if !self.closures.has_surface_tension() {
            return vec![0.0; mesh.n_faces()];
        }
        let inlet_alpha = self.inlet_alpha();
        let alpha1 = self.phases[0].alpha().values();
        let n_dot_sf: Vec<f64> = interface_normals(mesh, alpha1, &inlet_alpha)
            .iter()
            .zip(mesh.face_areas())
            .map(|(n, sf)| n.dot(*sf))
            .collect();
        let kappa: Vec<f64> = divergence(mesh, &n_dot_sf).iter().map(|d| -d).collect();
        let kappa_f = interpolate(mesh, &kappa);
        let sigma_f = interpolate(mesh, &self.coefficients.sigma);
        let grad = sn_grad(mesh, alpha1, |f| inlet_alpha[f]);
        (0..mesh.n_faces())
            .map(|f| sigma_f[f] * kappa_f[f] * grad[f] * mesh.mag_sf()[f])
            .collect()
    }

    /// Inlet value of `α₁` per face, `None` off inlets.
    fn inlet_alpha(&self) -> Vec<Option<f64>> {
        (0..self.mesh.n_faces())
            .map(|f| self.phases[0].inlet(f).map(|inlet| inlet.alpha))
            .collect()
    }

    fn update_mixture_flux(&mut self) -> Result<(), TwoPhaseError> {
        let mesh = &*self.mesh;
        let alpha_f = self.phases.each_ref().map(|phase| phase.alpha_f(mesh));
        let [phi1, phi2] = self.phases.each_ref().map(|phase| phase.phi().values());
        let mixture = (0..mesh.n_faces())
            .map(|f| alpha_f[0][f] * phi1[f] + alpha_f[1][f] * phi2[f])
            .collect();
        self.phi.assign(mixture)?;
        Ok(())
    }
}

/// Sign that turns `ṁ` into the gain of phase `k`.
fn orientation(k: usize) -> f64 {
    if k == 0 { 1.0 } else { -1.0 }
}

fn complement(alpha: &[f64]) -> Vec<f64> {
    alpha.iter().map(|a| 1.0 - a).collect()
}

/// `[lower, upper]` bounds on `α₁` from the controls and both packing limits.
fn alpha_bounds(controls: &AlphaControls, phases: [&Phase; 2]) -> [f64; 2] {
    [
        controls.alpha_min.max(1.0 - phases[1].alpha_max()),
        controls.alpha_max.min(phases[0].alpha_max()),
    ]
}

fn check_sum(key: &str, alpha1: &[f64], alpha2: &[f64]) -> Result<(), ConfigError> {
    match alpha1
        .iter()
        .zip(alpha2)
        .position(|(a1, a2)| (a1 + a2 - 1.0).abs() > ALPHA_SUM_TOLERANCE)
    {
        Some(cell) => Err(ConfigError::invalid(
            key,
            format!(
                "volume fractions sum to {} in cell {cell}",
                alpha1[cell] + alpha2[cell]
            ),
        )),
        None => Ok(()),
    }
}

/// Every species transferred between the phases needs a field on both sides.
fn check_shared_species(phases: [&Phase; 2]) -> Result<(), ConfigError> {
    for (k, phase) in phases.iter().enumerate() {
        let other = phases[1 - k];
        if let Some(specie) = phase.species_names().find(|s| other.species(s).is_none()) {
            return Err(ConfigError::invalid(
                format!("{}.species.{specie}", phase.name()),
                format!(
                    "`{}` exchanges mass with `{}`, which does not carry this species",
                    phase.name(),
                    other.name()
                ),
            ));
        }
    }
    Ok(())
}

/// Inlet volume fraction of both phases on every inlet patch.
fn resolve_inlet_alpha(
    mesh: &Mesh,
    names: &[String; 2],
    configs: [&PhaseConfig; 2],
) -> Result<[BTreeMap<String, f64>; 2], ConfigError> {
    let mut resolved = [BTreeMap::new(), BTreeMap::new()];
    for patch in mesh.patches().iter().filter(|p| p.kind() == PatchKind::Inlet) {
        let given = configs.map(|config| config.inlets.get(patch.name()).and_then(|i| i.alpha));
        let alpha1 = match given {
            [Some(a1), None] => a1,
            [None, Some(a2)] => 1.0 - a2,
            [Some(a1), Some(a2)] => {
                check_sum(
                    &format!("{}.inlets.{}.alpha", names[1], patch.name()),
                    &[a1],
                    &[a2],
                )?;
                a1
            }
            // Reported by the phase that lacks the inlet.
            [None, None] => continue,
        };
        super::config::check_fraction(
            &format!("{}.inlets.{}.alpha", names[0], patch.name()),
            alpha1,
        )?;
        resolved[0].insert(patch.name().to_owned(), alpha1);
        resolved[1].insert(patch.name().to_owned(), 1.0 - alpha1);
    }
    Ok(resolved)
}

fn sized<T>(field: &str, expected: usize, values: Vec<T>) -> Result<Vec<T>, FieldError> {
    if values.len() == expected {
        Ok(values)
    } else {
        Err(FieldError::Size {
            field: field.to_owned(),
            expected,
            found: values.len(),
        })
    }
}

/// A time step in seconds.
fn seconds(dt: Time) -> Result<f64, TwoPhaseError> {
    let dt = dt.get::<second>();
    if dt.is_finite() && dt > 0.0 {
        Ok(dt)
    } else {
        Err(ConfigError::invalid("deltaT", format!("time step {dt} s is not positive")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use serde_json::json;

    use crate::models::multiphase::two_phase::core::test_support::{air_water_dict, box_mesh, system};

    #[test]
    fn missing_fraction_is_the_complement() {
        let system = system(air_water_dict(0.3, 10.0));
        for (a1, a2) in system
            .phase1()
            .alpha()
            .values()
            .iter()
            .zip(system.phase2().alpha().values())
        {
            assert_relative_eq!(a1 + a2, 1.0);
            assert_relative_eq!(*a1, 0.3);
        }
        assert_eq!(system.other_phase(system.phase1()).name(), "water");
        assert_eq!(system.names(), ["air".to_owned(), "water".to_owned()]);
    }

    #[test]
    fn inconsistent_fractions_are_rejected() {
        let mut dict = air_water_dict(0.3, 10.0);
        dict["water"]["alpha"] = json!(0.6);
        let err = TwoPhaseSystem::new(
            Arc::new(box_mesh(2, 2)),
            &dict,
            &ClosureRegistry::with_builtins(),
        )
        .unwrap_err();
        assert!(matches!(err, TwoPhaseError::Config(ConfigError::Invalid { .. })), "{err}");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn heat_exchange_is_conservative_with_mass_transfer() {
        let mut dict = air_water_dict(0.3, 10.0);
        dict["heatTransfer"] = json!({ "air_in_water": { "type": "constant", "h": 1.0e4 } });
        dict["massTransfer"] = json!({ "air,water": { "type": "constant", "dmdt": -0.2 } });
        dict["air"]["temperature"] = json!(350.0);
        let system = system(dict);

        let table = system.heat_transfer();
        let t = [
            system.phase1().temperature().values(),
            system.phase2().temperature().values(),
        ];
        for value in table.imbalance(t) {
            assert!(value.abs() < 1e-6, "{value}");
        }
        // Water is colder, so it gains heat.
        let water = table.get("water").unwrap().value(t[1]);
        assert!(water.iter().all(|q| *q > 0.0));
    }

    #[test]
    fn species_leave_the_donor_and_reach_the_receiver() {
        let mut dict = air_water_dict(0.3, 10.0);
        dict["massTransfer"] = json!({ "air,water": { "type": "constant", "dmdt": 0.5 } });
        dict["air"]["species"] = json!({ "H2O": 0.01, "NaCl": 0.0 });
        dict["water"]["species"] = json!({ "H2O": 0.97, "NaCl": 0.03 });
        let system = system(dict);

        let table = system.mass_transfer();
        for specie in ["H2O", "NaCl"] {
            let y = [
                system.phase1().species(specie).unwrap().values(),
                system.phase2().species(specie).unwrap().values(),
            ];
            for value in table.imbalance(specie, y) {
                assert!(value.abs() < 1e-12, "{specie}: {value}");
            }
        }
        // Water is the donor: implicit loss on its own mass fraction.
        let water = table.get("water").unwrap();
        assert!(water["H2O"].sp.iter().all(|sp| (*sp + 0.5).abs() < 1e-12));
        assert!(water["NaCl"].su.iter().all(|su| *su == 0.0));
        let air = table.get("air").unwrap();
        assert!(air["H2O"].su.iter().all(|su| (*su - 0.485).abs() < 1e-12));
        assert!(air["NaCl"].su.iter().all(|su| (*su - 0.015).abs() < 1e-12));
    }

    #[test]
    fn transferred_species_mass_is_conserved_in_both_directions() {
        for dmdt in [0.5, -0.5] {
            let mut dict = air_water_dict(0.3, 10.0);
            dict["massTransfer"] = json!({ "air,water": { "type": "constant", "dmdt": dmdt } });
            dict["air"]["species"] = json!({ "H2O": 0.2, "N2": 0.8 });
            dict["water"]["species"] = json!({ "H2O": 0.99, "N2": 0.01 });
            let system = system(dict);
            let (donor, receiver) = if dmdt > 0.0 { ("water", "air") } else { ("air", "water") };

            let table = system.mass_transfer();
            let mut lost = 0.0;
            let mut gained = 0.0;
            for specie in ["H2O", "N2"] {
                let y = |phase: &str| system.phase(phase).unwrap().species(specie).unwrap().values();
                let imbalance: f64 = table.imbalance(specie, [y("air"), y("water")]).iter().sum();
                assert_relative_eq!(imbalance, 0.0, epsilon = 1e-12);
                lost += table.get(donor).unwrap()[specie].value(y(donor))[0];
                gained += table.get(receiver).unwrap()[specie].value(y(receiver))[0];
            }
            // All of the donor's species arrive, so the receiver gains |ṁ|.
            assert_relative_eq!(lost, -0.5, epsilon = 1e-12);
            assert_relative_eq!(gained, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn species_missing_from_one_phase_are_rejected_with_mass_transfer() {
        let mut dict = air_water_dict(0.3, 10.0);
        dict["air"]["species"] = json!({ "H2O": 0.01 });
        dict["water"]["species"] = json!({ "H2O": 0.97, "NaCl": 0.03 });
        // Without mass transfer the phases may carry different species.
        system(dict.clone());

        dict["massTransfer"] = json!({ "air,water": { "type": "constant", "dmdt": 0.5 } });
        let err = TwoPhaseSystem::new(
            Arc::new(box_mesh(2, 2)),
            &dict,
            &ClosureRegistry::with_builtins(),
        )
        .unwrap_err();
        match err {
            TwoPhaseError::Config(ConfigError::Invalid { key, .. }) => {
                assert_eq!(key, "water.species.NaCl");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mass_transfer_momentum_goes_to_the_receiver() {
        let mut dict = air_water_dict(0.3, 10.0);
        dict["massTransfer"] = json!({ "air,water": { "type": "constant", "dmdt": 0.5 } });
        dict["water"]["velocity"] = json!([0.0, 0.2, 0.0]);
        let system = system(dict);

        let table = system.momentum_transfer();
        let air = table.get("air").unwrap();
        assert!(air.sp.iter().all(|sp| (*sp + 0.5).abs() < 1e-12));
        assert!(air.su.iter().all(|su| (su.y - 0.1).abs() < 1e-12));
        let water = table.get("water").unwrap();
        assert!(water.sp.iter().all(|sp| *sp == 0.0));
    }

    #[test]
    fn snapshot_load_round_trip() {
        let mut system = system(air_water_dict(0.3, 10.0));
        let mut snapshot = system.snapshot();
        assert!(snapshot.scalar("alpha.air").is_some());
        assert!(snapshot.vector("U.water").is_some());

        let n = system.mesh().n_cells();
        snapshot.scalars.remove("alpha.water");
        snapshot.scalars.insert("alpha.air".to_owned(), vec![0.1; n]);
        system.load(&snapshot).unwrap();
        assert_relative_eq!(system.phase2().alpha().values()[0], 0.9);
        assert_eq!(system.snapshot().scalar("alpha.air"), Some(vec![0.1; n].as_slice()));

        snapshot.scalars.insert("p".to_owned(), vec![1.0e5; n + 1]);
        assert!(matches!(
            system.load(&snapshot),
            Err(TwoPhaseError::Field(FieldError::Size { .. }))
        ));
    }

    #[test]
    fn phase_mass_integrates_density() {
        let system = system(air_water_dict(0.25, 10.0));
        let water = system.phase2();
        let expected = 0.75 * water.rho().values()[0] * system.mesh().total_volume();
        let mass = system.phase_mass("water").unwrap().get::<kilogram>();
        assert_relative_eq!(mass, expected, max_relative = 1e-12);
        assert!(system.phase_mass("oil").is_none());
    }

    #[test]
    fn explicit_drag_helpers_scale_with_the_coefficient() {
        let mut dict = air_water_dict(0.3, 10.0);
        dict["water"]["velocity"] = json!([0.0, 1.0, 0.0]);
        let system = system(dict);
        let n = system.mesh().n_cells();
        let r_au = vec![0.5; n];
        let table = system.kd_u_by_as([&r_au, &r_au]);
        assert_relative_eq!(table.get("air").unwrap().values()[0].y, 5.0);
        assert_relative_eq!(table.get("water").unwrap().values()[0].y, 0.0);

        let r_auf = vec![0.5; system.mesh().n_faces()];
        let d = system.d_by_afs([&r_au, &r_au]);
        assert!(d.get("air").unwrap().values().iter().all(|v| *v == 0.0));
        let phi_fs = system.phi_fs([&r_auf, &r_auf]);
        assert!(phi_fs.get("water").unwrap().values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn continuity_errors_need_a_time_step() {
        let system = system(air_water_dict(0.3, 10.0));
        assert!(system.continuity_errors().is_none());
    }

    #[test]
    fn non_positive_time_step_is_rejected() {
        let mut system = system(air_water_dict(0.3, 10.0));
        let err = system
            .solve(Time::new::<second>(0.0), &PcgConfig::default())
            .unwrap_err();
        assert!(matches!(err, TwoPhaseError::Config(ConfigError::Invalid { .. })));
    }
}
