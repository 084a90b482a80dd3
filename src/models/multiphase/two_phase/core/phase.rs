//! One phase of a two-phase system.
//!
//! A phase owns its volume fraction, velocity, face fluxes, density,
//! temperature, diameter and species mass fractions, together with the old
//! time level of the fields that appear in time derivatives. It assembles
//! its own momentum equation; coupling to the other phase is added by the
//! system.

mod diameter;
mod momentum;

use std::{collections::BTreeMap, ops::Range};

use glam::DVec3;
use uom::si::{
    dynamic_viscosity::pascal_second,
    f64::{DynamicViscosity, Pressure, ThermalConductivity, ThermodynamicTemperature},
    mass_density::kilogram_per_cubic_meter,
    pressure::pascal,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    thermal_conductivity::watt_per_meter_kelvin,
    thermodynamic_temperature::kelvin,
};

use crate::support::{
    closure::PhaseCell,
    constraint::StrictlyPositive,
    field::{
        Dimensions, Field, FieldError, FieldLocation, FieldValue, Location, SurfaceScalarField,
        VolScalarField, VolVectorField,
    },
    fvm::{divergence, flux, interpolate, reconstruct},
    mesh::{Mesh, PatchKind},
    thermo::PhaseThermo,
    units::SpecificEnthalpy,
};

use super::{
    ConfigError, TwoPhaseError,
    config::{PhaseConfig, check, check_fraction},
};

pub(crate) use diameter::DiameterModel;
pub use momentum::{MomentumContext, MomentumEqn};

/// Values a phase carries in through an inlet patch.
#[derive(Debug, Clone, PartialEq)]
pub struct InletValues {
    pub alpha: f64,
    pub velocity: DVec3,
    /// Temperature, K.
    pub temperature: f64,
    pub species: BTreeMap<String, f64>,
}

#[derive(Debug, Clone)]
struct Inlet {
    faces: Range<usize>,
    values: InletValues,
}

/// Fields at the start of the current time step.
#[derive(Debug, Clone)]
struct OldTime {
    alpha: Vec<f64>,
    u: Vec<DVec3>,
    phi: Vec<f64>,
    rho: Vec<f64>,
}

/// One continuous fluid occupying a fraction of every cell.
#[derive(Debug)]
pub struct Phase {
    name: String,
    thermo: Box<dyn PhaseThermo>,
    diameter_model: DiameterModel,
    residual_alpha: f64,
    alpha_max: f64,
    mu: f64,
    kappa: f64,
    cp: f64,
    alpha: VolScalarField,
    u: VolVectorField,
    phi: SurfaceScalarField,
    alpha_phi: SurfaceScalarField,
    alpha_rho_phi: SurfaceScalarField,
    rho: VolScalarField,
    temperature: VolScalarField,
    d: VolScalarField,
    species: BTreeMap<String, VolScalarField>,
    inlets: Vec<Inlet>,
    old: OldTime,
}

impl Phase {
    /// Builds a phase from its sub-dictionary.
    ///
    /// `alpha` is the resolved initial volume fraction and `inlet_alpha` the
    /// resolved inlet volume fraction of every inlet patch, both consistent
    /// with the other phase.
    pub(crate) fn new(
        name: &str,
        config: &PhaseConfig,
        alpha: Vec<f64>,
        inlet_alpha: &BTreeMap<String, f64>,
        mesh: &Mesh,
        p: &[f64],
    ) -> Result<Self, ConfigError> {
        let n = mesh.n_cells();
        let key = |what: &str| format!("{name}.{what}");

        let thermo = config.thermo.build(name)?;
        let diameter_model = DiameterModel::from_config(name, config.diameter_model)?;
        let mu = check::<StrictlyPositive>(&key("viscosity"), config.viscosity)?;
        let kappa = check::<StrictlyPositive>(
            &key("thermalConductivity"),
            config.thermal_conductivity,
        )?;
        let residual_alpha = check_fraction(&key("residualAlpha"), config.residual_alpha)?;
        let alpha_max = check_fraction(&key("alphaMax"), config.alpha_max)?;
        let cp = thermo.cp().get::<joule_per_kilogram_kelvin>();

        let temperature = config.temperature.expand(&key("temperature"), n)?;
        if let Some(t) = temperature.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
            return Err(ConfigError::invalid(
                key("temperature"),
                format!("{t} K is not a valid temperature"),
            ));
        }
        let u = config.velocity.expand(&key("velocity"), n)?;

        let mut species = BTreeMap::new();
        for (specie, init) in &config.species {
            let field_key = key(&format!("species.{specie}"));
            let values = init.expand(&field_key, n)?;
            for y in &values {
                check_fraction(&field_key, *y)?;
            }
            species.insert(
                specie.clone(),
                VolScalarField::new(format!("{specie}.{name}"), Dimensions::NONE, values),
            );
        }

        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len().max(1) as f64;

        let mut inlets = Vec::new();
        for (patch_name, inlet) in &config.inlets {
            let inlet_key = key(&format!("inlets.{patch_name}"));
            let patch = mesh
                .patch(patch_name)
                .ok_or_else(|| ConfigError::invalid(&inlet_key, "no such patch"))?;
            if patch.kind() != PatchKind::Inlet {
                return Err(ConfigError::invalid(&inlet_key, "patch is not an inlet"));
            }
            let alpha = *inlet_alpha
                .get(patch_name)
                .ok_or_else(|| ConfigError::Missing {
                    key: format!("{inlet_key}.alpha"),
                })?;
            if let Some(unknown) = inlet.species.keys().find(|s| !species.contains_key(*s)) {
                return Err(ConfigError::invalid(
                    &inlet_key,
                    format!("species `{unknown}` is not carried by this phase"),
                ));
            }
            let inlet_species = species
                .iter()
                .map(|(specie, field)| {
                    let y = inlet
                        .species
                        .get(specie)
                        .copied()
                        .unwrap_or_else(|| mean(field.values()));
                    (specie.clone(), y)
                })
                .collect();
            inlets.push(Inlet {
                faces: patch.faces(),
                values: InletValues {
                    alpha,
                    velocity: DVec3::from_array(inlet.velocity),
                    temperature: inlet.temperature.unwrap_or_else(|| mean(&temperature)),
                    species: inlet_species,
                },
            });
        }
        if let Some(patch) = mesh
            .patches()
            .iter()
            .find(|p| p.kind() == PatchKind::Inlet && !config.inlets.contains_key(p.name()))
        {
            return Err(ConfigError::Missing {
                key: key(&format!("inlets.{}", patch.name())),
            });
        }

        let zeros = vec![0.0; mesh.n_faces()];
        let mut phase = Self {
            name: name.to_owned(),
            thermo,
            diameter_model,
            residual_alpha,
            alpha_max,
            mu,
            kappa,
            cp,
            alpha: VolScalarField::new(format!("alpha.{name}"), Dimensions::NONE, alpha),
            u: VolVectorField::new(format!("U.{name}"), Dimensions::VELOCITY, u),
            phi: SurfaceScalarField::new(
                format!("phi.{name}"),
                Dimensions::VOLUMETRIC_FLUX,
                zeros.clone(),
            ),
            alpha_phi: SurfaceScalarField::new(
                format!("alphaPhi.{name}"),
                Dimensions::VOLUMETRIC_FLUX,
                zeros.clone(),
            ),
            alpha_rho_phi: SurfaceScalarField::new(
                format!("alphaRhoPhi.{name}"),
                Dimensions::MASS_FLUX,
                zeros,
            ),
            rho: VolScalarField::zeros(format!("rho.{name}"), Dimensions::DENSITY, n),
            temperature: VolScalarField::new(
                format!("T.{name}"),
                Dimensions::TEMPERATURE,
                temperature,
            ),
            d: VolScalarField::zeros(format!("d.{name}"), Dimensions::LENGTH, n),
            species,
            inlets,
            old: OldTime {
                alpha: Vec::new(),
                u: Vec::new(),
                phi: Vec::new(),
                rho: Vec::new(),
            },
        };

        phase.correct_thermo(p).map_err(|err| match err {
            TwoPhaseError::Thermo { source, .. } => ConfigError::Thermo(source),
            other => ConfigError::invalid(name, other.to_string()),
        })?;
        let phi = flux(mesh, &interpolate(mesh, phase.u.values()));
        phase.set_phi(mesh, phi);
        phase.refresh_fluxes(mesh);
        phase.store_old_time();
        Ok(phase)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn alpha(&self) -> &VolScalarField {
        &self.alpha
    }

    #[must_use]
    pub fn u(&self) -> &VolVectorField {
        &self.u
    }

    /// Volumetric face flux of the phase velocity.
    #[must_use]
    pub fn phi(&self) -> &SurfaceScalarField {
        &self.phi
    }

    /// Volumetric face flux of the phase, `α φ`.
    #[must_use]
    pub fn alpha_phi(&self) -> &SurfaceScalarField {
        &self.alpha_phi
    }

    /// Face mass flux of the phase, `α ρ φ`.
    #[must_use]
    pub fn alpha_rho_phi(&self) -> &SurfaceScalarField {
        &self.alpha_rho_phi
    }

    #[must_use]
    pub fn rho(&self) -> &VolScalarField {
        &self.rho
    }

    #[must_use]
    pub fn temperature(&self) -> &VolScalarField {
        &self.temperature
    }

    /// Particle or bubble diameter.
    #[must_use]
    pub fn diameter(&self) -> &VolScalarField {
        &self.d
    }

    /// Mass fraction of a species, if the phase carries it.
    #[must_use]
    pub fn species(&self, name: &str) -> Option<&VolScalarField> {
        self.species.get(name)
    }

    pub fn species_names(&self) -> impl Iterator<Item = &str> {
        self.species.keys().map(String::as_str)
    }

    /// Floor used wherever the volume fraction divides or weights a term.
    #[must_use]
    pub fn residual_alpha(&self) -> f64 {
        self.residual_alpha
    }

    /// Maximum packing fraction.
    #[must_use]
    pub fn alpha_max(&self) -> f64 {
        self.alpha_max
    }

    #[must_use]
    pub fn viscosity(&self) -> DynamicViscosity {
        DynamicViscosity::new::<pascal_second>(self.mu)
    }

    #[must_use]
    pub fn thermal_conductivity(&self) -> ThermalConductivity {
        ThermalConductivity::new::<watt_per_meter_kelvin>(self.kappa)
    }

    #[must_use]
    pub fn thermo(&self) -> &dyn PhaseThermo {
        self.thermo.as_ref()
    }

    /// Inlet values on a boundary face, if it belongs to an inlet patch.
    #[must_use]
    pub fn inlet(&self, face: usize) -> Option<&InletValues> {
        self.inlets
            .iter()
            .find(|inlet| inlet.faces.contains(&face))
            .map(|inlet| &inlet.values)
    }

    /// Sensible specific enthalpy per cell.
    #[must_use]
    pub fn enthalpy(&self) -> VolScalarField {
        let values = self
            .temperature
            .values()
            .iter()
            .map(|t| self.specific_enthalpy(*t))
            .collect();
        VolScalarField::new(format!("h.{}", self.name), Dimensions::SPECIFIC_ENERGY, values)
    }

    pub(crate) fn specific_enthalpy(&self, t: f64) -> f64 {
        let h: SpecificEnthalpy = self
            .thermo
            .enthalpy(ThermodynamicTemperature::new::<kelvin>(t));
        h.value
    }

    /// Replaces the temperature, typically after the host's energy solve.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is wrong or a value is not finite.
    pub fn set_temperature(&mut self, values: Vec<f64>) -> Result<(), TwoPhaseError> {
        self.temperature.assign(values)?;
        self.temperature.check_finite()?;
        Ok(())
    }

    /// Replaces a species mass fraction, typically after the host's species solve.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown species, a wrong size or a non-finite value.
    pub fn set_species(&mut self, name: &str, values: Vec<f64>) -> Result<(), TwoPhaseError> {
        let field = self.species.get_mut(name).ok_or_else(|| {
            ConfigError::invalid(format!("{name}.{}", self.name), "unknown species")
        })?;
        field.assign(values)?;
        field.check_finite()?;
        Ok(())
    }

    /// Copies the current fields to the old time level.
    pub fn store_old_time(&mut self) {
        self.old = OldTime {
            alpha: self.alpha.values().to_vec(),
            u: self.u.values().to_vec(),
            phi: self.phi.values().to_vec(),
            rho: self.rho.values().to_vec(),
        };
    }

    /// Updates density and diameter from the pressure.
    ///
    /// # Errors
    ///
    /// Returns [`TwoPhaseError::Thermo`] if the equation of state fails in a cell.
    pub fn correct_thermo(&mut self, p: &[f64]) -> Result<(), TwoPhaseError> {
        let mut rho = Vec::with_capacity(p.len());
        for (cell, (t, p)) in self.temperature.values().iter().zip(p).enumerate() {
            let density = self
                .thermo
                .density(
                    ThermodynamicTemperature::new::<kelvin>(*t),
                    Pressure::new::<pascal>(*p),
                )
                .map_err(|source| TwoPhaseError::Thermo {
                    phase: self.name.clone(),
                    location: Location::Cell(cell),
                    source,
                })?;
            rho.push(density.get::<kilogram_per_cubic_meter>());
        }
        self.rho.assign(rho)?;

        let d = p.iter().map(|p| self.diameter_model.diameter(*p)).collect();
        self.d.assign(d)?;
        self.d.check_finite()?;
        Ok(())
    }

    /// Stores a new face flux and reconstructs the cell velocity from it.
    ///
    /// Wall faces carry no flux and inlet faces their prescribed flux,
    /// whatever `phi` holds there.
    ///
    /// # Errors
    ///
    /// Returns [`TwoPhaseError::NonFinite`] if the flux or velocity is not finite.
    pub fn correct_kinematics(&mut self, mesh: &Mesh, phi: Vec<f64>) -> Result<(), TwoPhaseError> {
        if phi.len() != mesh.n_faces() {
            return Err(FieldError::Size {
                field: self.phi.name().to_owned(),
                expected: mesh.n_faces(),
                found: phi.len(),
            }
            .into());
        }
        self.set_phi(mesh, phi);
        non_finite(&self.phi, "face flux after partial elimination")?;
        self.u.assign(reconstruct(mesh, self.phi.values()))?;
        non_finite(&self.u, "velocity reconstructed from face flux")?;
        Ok(())
    }

    /// Local continuity residual `∂(αρ)/∂t + ∇·(αρφ) - Γ`, kg/m³·s.
    ///
    /// `gain` is the interfacial mass rate into this phase.
    #[must_use]
    pub fn continuity_error(&self, mesh: &Mesh, dt: f64, gain: &[f64]) -> VolScalarField {
        let div = divergence(mesh, self.alpha_rho_phi.values());
        let values = (0..mesh.n_cells())
            .map(|i| {
                let mass = self.alpha.values()[i] * self.rho.values()[i];
                let mass_old = self.old.alpha[i] * self.old.rho[i];
                (mass - mass_old) / dt + div[i] - gain[i]
            })
            .collect();
        VolScalarField::new(
            format!("contErr.{}", self.name),
            Dimensions::VOLUMETRIC_MASS_RATE,
            values,
        )
    }

    /// The closure-relevant state of one cell.
    pub(crate) fn cell(&self, cell: usize) -> PhaseCell {
        PhaseCell {
            alpha: self.alpha.values()[cell],
            rho: self.rho.values()[cell],
            mu: self.mu,
            kappa: self.kappa,
            cp: self.cp,
            d: self.d.values()[cell],
            residual_alpha: self.residual_alpha,
        }
    }

    pub(crate) fn alpha_old(&self) -> &[f64] {
        &self.old.alpha
    }

    pub(crate) fn u_old(&self) -> &[DVec3] {
        &self.old.u
    }

    pub(crate) fn phi_old(&self) -> &[f64] {
        &self.old.phi
    }

    pub(crate) fn rho_old(&self) -> &[f64] {
        &self.old.rho
    }

    /// Face volume fraction: linear inside, the inlet value on inlets and
    /// the owner value on other boundary faces.
    pub(crate) fn alpha_f(&self, mesh: &Mesh) -> Vec<f64> {
        let mut alpha_f = interpolate(mesh, self.alpha.values());
        for inlet in &self.inlets {
            for face in inlet.faces.clone() {
                alpha_f[face] = inlet.values.alpha;
            }
        }
        alpha_f
    }

    pub(crate) fn rho_f(&self, mesh: &Mesh) -> Vec<f64> {
        interpolate(mesh, self.rho.values())
    }

    /// The prescribed flux of a boundary face: zero on walls, `U_in·Sf` on
    /// inlets, `None` on outlets.
    pub(crate) fn boundary_flux(&self, mesh: &Mesh, face: usize) -> Option<f64> {
        match mesh.face_patch(face).map(|patch| patch.kind()) {
            Some(PatchKind::Wall) => Some(0.0),
            Some(PatchKind::Inlet) => self
                .inlet(face)
                .map(|inlet| inlet.velocity.dot(mesh.face_areas()[face])),
            Some(PatchKind::Outlet) | None => None,
        }
    }

    pub(crate) fn set_alpha(&mut self, values: Vec<f64>) -> Result<(), TwoPhaseError> {
        self.alpha.assign(values)?;
        non_finite(&self.alpha, "volume fraction")
    }

    pub(crate) fn set_u(&mut self, values: Vec<DVec3>) -> Result<(), TwoPhaseError> {
        self.u.assign(values)?;
        non_finite(&self.u, "velocity")
    }

    /// Stores the phase volumetric flux `αφ` and derives `αρφ` from it.
    pub(crate) fn set_alpha_phi(
        &mut self,
        mesh: &Mesh,
        alpha_phi: Vec<f64>,
    ) -> Result<(), TwoPhaseError> {
        let rho_f = self.rho_f(mesh);
        let alpha_rho_phi = alpha_phi.iter().zip(&rho_f).map(|(a, r)| a * r).collect();
        self.alpha_phi.assign(alpha_phi)?;
        self.alpha_rho_phi.assign(alpha_rho_phi)?;
        non_finite(&self.alpha_phi, "phase flux")
    }

    /// Recomputes `αφ` and `αρφ` from the current `α` and `φ`.
    pub(crate) fn refresh_fluxes(&mut self, mesh: &Mesh) {
        let alpha_f = self.alpha_f(mesh);
        let rho_f = self.rho_f(mesh);
        for (f, phi) in self.phi.values().iter().enumerate() {
            self.alpha_phi.values_mut()[f] = phi * alpha_f[f];
            self.alpha_rho_phi.values_mut()[f] = phi * alpha_f[f] * rho_f[f];
        }
    }

    /// Stores a face flux, imposing the boundary fluxes.
    pub(crate) fn set_phi(&mut self, mesh: &Mesh, mut phi: Vec<f64>) {
        for face in mesh.n_internal_faces()..mesh.n_faces() {
            if let Some(fixed) = self.boundary_flux(mesh, face) {
                phi[face] = fixed;
            }
        }
        self.phi = SurfaceScalarField::new(
            self.phi.name().to_owned(),
            Dimensions::VOLUMETRIC_FLUX,
            phi,
        );
    }
}

/// Maps a non-finite field value to a recoverable step error.
pub(crate) fn non_finite<T: FieldValue, L: FieldLocation>(
    field: &Field<T, L>,
    reason: &str,
) -> Result<(), TwoPhaseError> {
    field.check_finite().map_err(|err| match err {
        FieldError::NonFinite { field, location } => TwoPhaseError::NonFinite {
            field,
            location,
            reason: reason.to_owned(),
        },
        other => other.into(),
    })
}
