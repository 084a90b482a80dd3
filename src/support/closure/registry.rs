//! Named constructors for closure models.

use std::{collections::BTreeMap, fmt};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::support::constraint::NonNegative;

use super::{
    ClosureError, ClosureKind, DragModel, HeatTransferModel, MassTransferModel, PhasePairKey,
    SurfaceTensionModel, TurbulentDispersionModel, VirtualMassModel, drag, heat_transfer,
    mass_transfer, surface_tension, turbulent_dispersion, virtual_mass,
};

/// Builds a model from its parameter dictionary.
pub type Constructor<M> = Box<dyn Fn(&Value) -> Result<Box<M>, ClosureError> + Send + Sync>;

/// Constructors for one closure kind, keyed by model name.
pub struct Registry<M: ?Sized> {
    kind: ClosureKind,
    constructors: BTreeMap<String, Constructor<M>>,
}

impl<M: ?Sized> Registry<M> {
    #[must_use]
    pub fn new(kind: ClosureKind) -> Self {
        Self {
            kind,
            constructors: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ClosureKind {
        self.kind
    }

    /// Registers a constructor, replacing any previous one with this name.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&Value) -> Result<Box<M>, ClosureError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    /// Registered model names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Constructs the model `name` from `params`.
    ///
    /// # Errors
    ///
    /// Returns [`ClosureError::UnknownModel`] for an unregistered name, or
    /// whatever the constructor reports for bad parameters.
    pub fn build(&self, name: &str, params: &Value) -> Result<Box<M>, ClosureError> {
        let constructor =
            self.constructors
                .get(name)
                .ok_or_else(|| ClosureError::UnknownModel {
                    kind: self.kind,
                    name: name.to_owned(),
                    available: self.names().collect::<Vec<_>>().join(", "),
                })?;
        constructor(params)
    }

    /// Builds every entry of a configuration section.
    ///
    /// The section maps pair keys to `{ "type": <name>, <params> }`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClosureError`] for a malformed section, a bad key, a
    /// missing `type`, an ordered key where only unordered keys are allowed,
    /// a duplicate pair, or a failing constructor.
    pub fn build_section(
        &self,
        section: &Value,
    ) -> Result<Vec<(PhasePairKey, Box<M>)>, ClosureError> {
        let entries = section.as_object().ok_or_else(|| ClosureError::Malformed {
            section: self.kind.section().to_owned(),
        })?;

        let mut models: Vec<(PhasePairKey, Box<M>)> = Vec::with_capacity(entries.len());
        for (text, entry) in entries {
            let key: PhasePairKey = text.parse()?;
            if key.is_ordered() && !self.kind.allows_ordered() {
                return Err(ClosureError::OrderedNotAllowed {
                    kind: self.kind,
                    pair: text.clone(),
                });
            }
            if models.iter().any(|(k, _)| *k == key) {
                return Err(ClosureError::Duplicate {
                    kind: self.kind,
                    pair: text.clone(),
                });
            }
            let name = entry
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| ClosureError::MissingType {
                    kind: self.kind,
                    pair: text.clone(),
                })?;
            models.push((key, self.build(name, entry)?));
        }
        Ok(models)
    }
}

impl<M: ?Sized> fmt::Debug for Registry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Constructors for every closure kind.
#[derive(Debug)]
pub struct ClosureRegistry {
    pub drag: Registry<dyn DragModel>,
    pub virtual_mass: Registry<dyn VirtualMassModel>,
    pub heat_transfer: Registry<dyn HeatTransferModel>,
    pub mass_transfer: Registry<dyn MassTransferModel>,
    pub surface_tension: Registry<dyn SurfaceTensionModel>,
    pub turbulent_dispersion: Registry<dyn TurbulentDispersionModel>,
}

impl ClosureRegistry {
    /// A registry with no models.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            drag: Registry::new(ClosureKind::Drag),
            virtual_mass: Registry::new(ClosureKind::VirtualMass),
            heat_transfer: Registry::new(ClosureKind::HeatTransfer),
            mass_transfer: Registry::new(ClosureKind::MassTransfer),
            surface_tension: Registry::new(ClosureKind::SurfaceTension),
            turbulent_dispersion: Registry::new(ClosureKind::TurbulentDispersion),
        }
    }

    /// A registry with all built-in models.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        drag::register_builtins(&mut registry.drag);
        virtual_mass::register_builtins(&mut registry.virtual_mass);
        heat_transfer::register_builtins(&mut registry.heat_transfer);
        mass_transfer::register_builtins(&mut registry.mass_transfer);
        surface_tension::register_builtins(&mut registry.surface_tension);
        turbulent_dispersion::register_builtins(&mut registry.turbulent_dispersion);
        registry
    }
}

impl Default for ClosureRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Deserializes model parameters, attributing failures to the model.
pub(super) fn parse_params<P: DeserializeOwned>(
    kind: ClosureKind,
    name: &str,
    params: &Value,
) -> Result<P, ClosureError> {
    serde_json::from_value(params.clone()).map_err(|source| ClosureError::InvalidParameters {
        kind,
        name: name.to_owned(),
        source,
    })
}

/// Rejects negative or non-finite coefficients.
pub(super) fn non_negative(
    kind: ClosureKind,
    name: &str,
    what: &str,
    value: f64,
) -> Result<f64, ClosureError> {
    if value.is_finite() && NonNegative::new(value).is_ok() {
        Ok(value)
    } else {
        Err(ClosureError::InvalidValue {
            kind,
            name: name.to_owned(),
            context: format!("{what} must be a non-negative number, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn unknown_names_list_alternatives() {
        let registry = ClosureRegistry::with_builtins();
        match registry.drag.build("Stokes", &json!({})) {
            Err(ClosureError::UnknownModel {
                kind, available, ..
            }) => {
                assert_eq!(kind, ClosureKind::Drag);
                assert!(available.contains("SchillerNaumann"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn builds_a_section() {
        let registry = ClosureRegistry::with_builtins();
        let section = json!({
            "air_in_water": { "type": "SchillerNaumann" },
            "water_in_air": { "type": "constant", "K": 5.0 },
        });
        let models = registry.drag.build_section(&section).unwrap();
        assert_eq!(models.len(), 2);
        assert!(models.iter().all(|(k, _)| k.is_ordered()));
    }

    #[test]
    fn mass_transfer_rejects_ordered_keys() {
        let registry = ClosureRegistry::with_builtins();
        let section = json!({ "air_in_water": { "type": "constant", "dmdt": 1.0 } });
        assert!(matches!(
            registry.mass_transfer.build_section(&section),
            Err(ClosureError::OrderedNotAllowed { .. })
        ));
    }

    #[test]
    fn detects_duplicates_and_missing_type() {
        let registry = ClosureRegistry::with_builtins();
        let duplicate = json!({
            "air,water": { "type": "constant", "sigma": 0.07 },
            "water,air": { "type": "constant", "sigma": 0.07 },
        });
        assert!(matches!(
            registry.surface_tension.build_section(&duplicate),
            Err(ClosureError::Duplicate { .. })
        ));

        let untyped = json!({ "air,water": { "sigma": 0.07 } });
        assert!(matches!(
            registry.surface_tension.build_section(&untyped),
            Err(ClosureError::MissingType { .. })
        ));
    }

    #[test]
    fn custom_models_can_be_registered() {
        #[derive(Debug)]
        struct Doubled;
        impl DragModel for Doubled {
            fn k(&self, cell: &super::super::PairCell) -> f64 {
                2.0 * cell.alpha_d
            }
        }

        let mut registry = ClosureRegistry::empty();
        registry.drag.register("doubled", |_| {
            let model: Box<dyn DragModel> = Box::new(Doubled);
            Ok(model)
        });
        assert_eq!(registry.drag.names().collect::<Vec<_>>(), ["doubled"]);
        assert!(registry.drag.build("doubled", &json!({})).is_ok());
    }
}
