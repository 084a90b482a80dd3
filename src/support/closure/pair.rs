use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use super::ClosureError;

/// Identifies a pair of phases, optionally ordered.
///
/// An ordered key `a_in_b` means phase `a` is dispersed in continuous phase
/// `b`. An unordered key `a,b` names the pair without a dispersed side;
/// unordered keys compare and hash symmetrically.
///
/// ```
/// use twine_two_phase::support::closure::PhasePairKey;
///
/// let k: PhasePairKey = "water,air".parse().unwrap();
/// assert_eq!(k, PhasePairKey::unordered("air", "water"));
///
/// let bubbles: PhasePairKey = "air_in_water".parse().unwrap();
/// assert_eq!(bubbles.dispersed(), Some("air"));
/// assert_ne!(bubbles, "water_in_air".parse().unwrap());
/// ```
#[derive(Debug, Clone, Eq)]
pub struct PhasePairKey {
    first: String,
    second: String,
    ordered: bool,
}

impl PhasePairKey {
    #[must_use]
    pub fn unordered(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            first: a.into(),
            second: b.into(),
            ordered: false,
        }
    }

    /// A key for `dispersed` inside `continuous`.
    #[must_use]
    pub fn ordered(dispersed: impl Into<String>, continuous: impl Into<String>) -> Self {
        Self {
            first: dispersed.into(),
            second: continuous.into(),
            ordered: true,
        }
    }

    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// The phase names in the order they were written.
    #[must_use]
    pub fn phases(&self) -> (&str, &str) {
        (&self.first, &self.second)
    }

    /// The dispersed phase of an ordered key.
    #[must_use]
    pub fn dispersed(&self) -> Option<&str> {
        self.ordered.then_some(self.first.as_str())
    }

    /// The continuous phase of an ordered key.
    #[must_use]
    pub fn continuous(&self) -> Option<&str> {
        self.ordered.then_some(self.second.as_str())
    }

    /// Returns true if the key names this phase.
    #[must_use]
    pub fn contains(&self, phase: &str) -> bool {
        self.first == phase || self.second == phase
    }

    /// The unordered key of the same two phases.
    #[must_use]
    pub fn to_unordered(&self) -> Self {
        Self::unordered(self.first.clone(), self.second.clone())
    }

    fn sorted(&self) -> (&str, &str) {
        if self.ordered || self.first <= self.second {
            (&self.first, &self.second)
        } else {
            (&self.second, &self.first)
        }
    }
}

impl PartialEq for PhasePairKey {
    fn eq(&self, other: &Self) -> bool {
        self.ordered == other.ordered && self.sorted() == other.sorted()
    }
}

impl Hash for PhasePairKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordered.hash(state);
        self.sorted().hash(state);
    }
}

impl fmt::Display for PhasePairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ordered {
            write!(f, "{}_in_{}", self.first, self.second)
        } else {
            write!(f, "{},{}", self.first, self.second)
        }
    }
}

impl FromStr for PhasePairKey {
    type Err = ClosureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClosureError::InvalidPairKey(s.to_owned());
        let valid = |name: &str| !name.is_empty() && !name.contains(char::is_whitespace);

        if let Some((a, b)) = s.split_once(',') {
            let (a, b) = (a.trim(), b.trim());
            if valid(a) && valid(b) && a != b && !b.contains(',') {
                return Ok(Self::unordered(a, b));
            }
            return Err(invalid());
        }
        match s.split_once("_in_") {
            Some((a, b)) if valid(a) && valid(b) && a != b => Ok(Self::ordered(a, b)),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    #[test]
    fn unordered_keys_hash_symmetrically() {
        let mut table = HashMap::new();
        table.insert(PhasePairKey::unordered("air", "water"), 1);
        assert_eq!(table.get(&PhasePairKey::unordered("water", "air")), Some(&1));
        assert_eq!(table.get(&PhasePairKey::ordered("air", "water")), None);
    }

    #[test]
    fn display_round_trips() {
        for text in ["air_in_water", "air,water"] {
            let key: PhasePairKey = text.parse().unwrap();
            assert_eq!(key.to_string(), text);
        }
        assert_eq!(
            PhasePairKey::ordered("air", "water").to_unordered(),
            PhasePairKey::unordered("water", "air")
        );
    }

    #[test]
    fn rejects_malformed_keys() {
        for text in ["air", "air,", "air,air", "_in_water", "a,b,c", "air in water"] {
            match text.parse::<PhasePairKey>() {
                Err(ClosureError::InvalidPairKey(s)) => assert_eq!(s, text),
                other => panic!("`{text}` should be rejected, got {other:?}"),
            }
        }
    }
}
