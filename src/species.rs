//! Animal species and their fixed identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three animal species.
///
/// Each species carries its own thresholds (hunger death, age death,
/// reproduction cooldown, vision radius) in [`crate::config::SpeciesConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Herbivore,
    Carnivore,
    Omnivore,
}

impl Species {
    /// All species, in the fixed order used for iteration and reporting.
    pub const ALL: [Species; 3] = [Species::Herbivore, Species::Carnivore, Species::Omnivore];

    /// Whether this species consumes a plant it stands on or walks into.
    #[inline]
    pub fn eats_plants(self) -> bool {
        matches!(self, Species::Herbivore | Species::Omnivore)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Species::Herbivore => "herbivore",
            Species::Carnivore => "carnivore",
            Species::Omnivore => "omnivore",
        }
    }

    pub fn from_name(name: &str) -> Option<Species> {
        match name {
            "herbivore" => Some(Species::Herbivore),
            "carnivore" => Some(Species::Carnivore),
            "omnivore" => Some(Species::Omnivore),
            _ => None,
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diet() {
        assert!(Species::Herbivore.eats_plants());
        assert!(Species::Omnivore.eats_plants());
        assert!(!Species::Carnivore.eats_plants());
    }

    #[test]
    fn test_name_roundtrip() {
        for species in Species::ALL {
            assert_eq!(Species::from_name(species.as_str()), Some(species));
        }
        assert_eq!(Species::from_name("plant"), None);
    }
}
