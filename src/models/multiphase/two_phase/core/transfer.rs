//! Interfacial transfer tables exported to the host's phase equations.
//!
//! Each table has exactly one entry per phase. An entry is a linear source
//! `S = Su + Sp·x` per unit volume, where `x` is the phase's own unknown:
//! velocity for momentum, temperature for heat, mass fraction for species.
//! The host adds `Su` to its right-hand side and `-Sp` to its diagonal.

use std::{collections::BTreeMap, ops::Index};

use crate::support::field::FieldValue;

/// A two-entry map from phase name to a value.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTable<T> {
    names: [String; 2],
    entries: [T; 2],
}

impl<T> PhaseTable<T> {
    #[must_use]
    pub fn new(names: [String; 2], entries: [T; 2]) -> Self {
        Self { names, entries }
    }

    /// The entry of a phase, or `None` for a foreign name.
    #[must_use]
    pub fn get(&self, phase: &str) -> Option<&T> {
        self.names
            .iter()
            .position(|name| name == phase)
            .map(|i| &self.entries[i])
    }

    #[must_use]
    pub fn names(&self) -> [&str; 2] {
        [&self.names[0], &self.names[1]]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.names.iter().map(String::as_str).zip(&self.entries)
    }

    #[must_use]
    pub fn into_entries(self) -> [T; 2] {
        self.entries
    }

    /// Applies `f` to both entries.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PhaseTable<U> {
        PhaseTable {
            names: self.names,
            entries: self.entries.map(f),
        }
    }
}

impl<T> Index<usize> for PhaseTable<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.entries[index]
    }
}

/// A cell-wise linear source `Su + Sp·x`, per unit volume.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSource<T> {
    pub su: Vec<T>,
    pub sp: Vec<f64>,
}

impl<T: FieldValue> LinearSource<T> {
    #[must_use]
    pub fn zeros(n_cells: usize) -> Self {
        Self {
            su: vec![T::ZERO; n_cells],
            sp: vec![0.0; n_cells],
        }
    }

    /// Evaluates the source at `x`.
    #[must_use]
    pub fn value(&self, x: &[T]) -> Vec<T> {
        self.su
            .iter()
            .zip(&self.sp)
            .zip(x)
            .map(|((su, sp), x)| *su + *x * *sp)
            .collect()
    }
}

/// Momentum sources of each phase's velocity equation.
pub type MomentumTransferTable = PhaseTable<LinearSource<glam::DVec3>>;

/// Heat sources of each phase's temperature equation, W/m³.
pub type HeatTransferTable = PhaseTable<LinearSource<f64>>;

/// Species sources of each phase, keyed by species name, kg/m³·s.
pub type MassTransferTable = PhaseTable<BTreeMap<String, LinearSource<f64>>>;

impl PhaseTable<LinearSource<f64>> {
    /// Cell-wise sum over both phases of `Su + Sp·x`.
    ///
    /// Zero for a conservative exchange.
    #[must_use]
    pub fn imbalance(&self, x: [&[f64]; 2]) -> Vec<f64> {
        sum_sources([Some(&self.entries[0]), Some(&self.entries[1])], x)
    }
}

impl PhaseTable<BTreeMap<String, LinearSource<f64>>> {
    /// Cell-wise sum over both phases of the sources of one species, where
    /// `y` holds each phase's own mass fraction of it.
    ///
    /// A phase without the species contributes nothing.
    #[must_use]
    pub fn imbalance(&self, species: &str, y: [&[f64]; 2]) -> Vec<f64> {
        sum_sources(
            [self.entries[0].get(species), self.entries[1].get(species)],
            y,
        )
    }
}

fn sum_sources(sources: [Option<&LinearSource<f64>>; 2], x: [&[f64]; 2]) -> Vec<f64> {
    let n = x[0].len();
    let mut total = vec![0.0; n];
    for (source, x) in sources.into_iter().zip(x) {
        if let Some(source) = source {
            for (t, s) in total.iter_mut().zip(source.value(x)) {
                *t += s;
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> [String; 2] {
        ["air".to_owned(), "water".to_owned()]
    }

    #[test]
    fn lookup_by_name() {
        let table = PhaseTable::new(names(), [1, 2]);
        assert_eq!(table.get("water"), Some(&2));
        assert_eq!(table.get("oil"), None);
        assert_eq!(table[0], 1);
        assert_eq!(table.map(|v| v * 10).into_entries(), [10, 20]);
    }

    #[test]
    fn heat_exchange_cancels() {
        let h = 50.0;
        let (t1, t2) = ([300.0, 310.0], [350.0, 290.0]);
        let table = PhaseTable::new(
            names(),
            [
                LinearSource {
                    su: t2.iter().map(|t| h * t).collect(),
                    sp: vec![-h; 2],
                },
                LinearSource {
                    su: t1.iter().map(|t| h * t).collect(),
                    sp: vec![-h; 2],
                },
            ],
        );
        for value in table.imbalance([&t1, &t2]) {
            assert!(value.abs() < 1e-9);
        }
        assert_eq!(table[0].value(&t1), vec![h * (350.0 - 300.0), h * (290.0 - 310.0)]);
    }
}
