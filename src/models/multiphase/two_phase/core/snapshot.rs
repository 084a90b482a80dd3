//! Named field values exchanged with the host.

use std::collections::BTreeMap;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::support::field::{Field, FieldLocation};

/// Field values keyed by field name, e.g. `alpha.air`, `U.water`, `p`.
///
/// Serializes to a plain JSON object, so a host can persist a time level
/// and resume from it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub scalars: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub vectors: BTreeMap<String, Vec<[f64; 3]>>,
}

impl Snapshot {
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<&[f64]> {
        self.scalars.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn vector(&self, name: &str) -> Option<Vec<DVec3>> {
        self.vectors
            .get(name)
            .map(|values| values.iter().copied().map(DVec3::from_array).collect())
    }

    /// Stores a scalar field under its own name.
    pub fn insert_scalar<L: FieldLocation>(&mut self, field: &Field<f64, L>) {
        self.scalars
            .insert(field.name().to_owned(), field.values().to_vec());
    }

    /// Stores a vector field under its own name.
    pub fn insert_vector<L: FieldLocation>(&mut self, field: &Field<DVec3, L>) {
        self.vectors.insert(
            field.name().to_owned(),
            field.values().iter().map(|v| v.to_array()).collect(),
        );
    }
}
