//! Gene tables: per-individual policies mapping discretized perception to
//! actions.
//!
//! A table is a dense array with one entry for every possible perception key,
//! `(vision_radius + 1)^4` in total. Tables are generated once per individual
//! (or inherited through [`GeneTable::mix`]) and never change afterwards
//! except through explicit mutation during inheritance.

use crate::species::Species;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What an animal can decide to do on a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MoveToPlant,
    MoveToHerbivore,
    MoveToOmnivore,
    MoveToCarnivore,
    FleeFromHerbivore,
    FleeFromOmnivore,
    FleeFromCarnivore,
    RandomMove,
    Stay,
}

impl Action {
    /// Stable name used in persisted gene files.
    pub fn name(self) -> &'static str {
        match self {
            Action::MoveToPlant => "move_to_plant",
            Action::MoveToHerbivore => "move_to_herbivore",
            Action::MoveToOmnivore => "move_to_omnivore",
            Action::MoveToCarnivore => "move_to_carnivore",
            Action::FleeFromHerbivore => "flee_from_herbivore",
            Action::FleeFromOmnivore => "flee_from_omnivore",
            Action::FleeFromCarnivore => "flee_from_carnivore",
            Action::RandomMove => "random_move",
            Action::Stay => "stay",
        }
    }

    pub fn from_name(name: &str) -> Option<Action> {
        match name {
            "move_to_plant" => Some(Action::MoveToPlant),
            "move_to_herbivore" => Some(Action::MoveToHerbivore),
            "move_to_omnivore" => Some(Action::MoveToOmnivore),
            "move_to_carnivore" => Some(Action::MoveToCarnivore),
            "flee_from_herbivore" => Some(Action::FleeFromHerbivore),
            "flee_from_omnivore" => Some(Action::FleeFromOmnivore),
            "flee_from_carnivore" => Some(Action::FleeFromCarnivore),
            "random_move" => Some(Action::RandomMove),
            "stay" => Some(Action::Stay),
            _ => None,
        }
    }
}

/// Discretized perception: the rounded Euclidean distance to the nearest
/// entity of each type, capped to the vision radius. 0 means "not seen".
///
/// The same tuple is both the result of [`crate::grid::Grid::perceive`] and
/// the lookup key into a gene table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerceptionKey {
    pub plant: u8,
    pub herbivore: u8,
    pub omnivore: u8,
    pub carnivore: u8,
}

impl PerceptionKey {
    pub fn new(plant: u8, herbivore: u8, omnivore: u8, carnivore: u8) -> Self {
        Self {
            plant,
            herbivore,
            omnivore,
            carnivore,
        }
    }

    /// Distance component for the given animal species.
    #[inline]
    pub fn animal_distance(&self, species: Species) -> u8 {
        match species {
            Species::Herbivore => self.herbivore,
            Species::Carnivore => self.carnivore,
            Species::Omnivore => self.omnivore,
        }
    }

    /// Packed index into a dense table for the given vision radius.
    #[inline]
    pub fn index(&self, vision: u8) -> usize {
        let side = vision as usize + 1;
        ((self.plant as usize * side + self.herbivore as usize) * side + self.omnivore as usize)
            * side
            + self.carnivore as usize
    }

    /// Inverse of [`PerceptionKey::index`].
    pub fn from_index(mut index: usize, vision: u8) -> Self {
        let side = vision as usize + 1;
        let carnivore = (index % side) as u8;
        index /= side;
        let omnivore = (index % side) as u8;
        index /= side;
        let herbivore = (index % side) as u8;
        index /= side;
        let plant = (index % side) as u8;
        Self {
            plant,
            herbivore,
            omnivore,
            carnivore,
        }
    }
}

/// Chance that inheritance perturbs a table at all.
const MUTATION_CHANCE: f32 = 0.25;

/// Actions that make sense for `species` at `key`: a random step is always
/// possible, approach/flee need the target in view, and staying put is only
/// meaningful next to a same-species neighbor.
fn candidates(species: Species, key: PerceptionKey) -> Vec<Action> {
    let mut set = Vec::with_capacity(9);
    set.push(Action::RandomMove);
    if key.plant > 0 {
        set.push(Action::MoveToPlant);
    }
    if key.herbivore > 0 {
        set.push(Action::MoveToHerbivore);
        set.push(Action::FleeFromHerbivore);
    }
    if key.omnivore > 0 {
        set.push(Action::MoveToOmnivore);
        set.push(Action::FleeFromOmnivore);
    }
    if key.carnivore > 0 {
        set.push(Action::MoveToCarnivore);
        set.push(Action::FleeFromCarnivore);
    }
    if key.animal_distance(species) == 1 {
        set.push(Action::Stay);
    }
    set
}

/// A complete perception-to-action policy for one individual.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneTable {
    vision: u8,
    actions: Vec<Action>,
}

impl GeneTable {
    /// Generate a fresh table with one uniformly drawn candidate action per
    /// key. Every key is guaranteed to map to a valid action.
    pub fn random<R: Rng>(species: Species, vision: u8, rng: &mut R) -> Self {
        let len = table_len(vision);
        let mut actions = Vec::with_capacity(len);
        for index in 0..len {
            let key = PerceptionKey::from_index(index, vision);
            actions.push(draw(species, key, rng));
        }
        Self { vision, actions }
    }

    /// Biparental inheritance: for each key the child copies parent A or B
    /// with equal probability, then the child may mutate.
    pub fn mix<R: Rng>(a: &GeneTable, b: &GeneTable, species: Species, rng: &mut R) -> GeneTable {
        assert_eq!(a.vision, b.vision, "parents must share a vision radius");
        let actions = a
            .actions
            .iter()
            .zip(&b.actions)
            .map(|(&x, &y)| if rng.gen::<bool>() { x } else { y })
            .collect();
        let mut child = GeneTable {
            vision: a.vision,
            actions,
        };
        child.mutate(species, rng);
        child
    }

    /// With probability 0.25, re-draw ceil(10%) of the keys, sampled without
    /// replacement, using the same candidate rule as generation. Also used by
    /// the evolution loop on single-parent copies.
    pub fn mutate<R: Rng>(&mut self, species: Species, rng: &mut R) {
        if rng.gen::<f32>() >= MUTATION_CHANCE {
            return;
        }
        let count = (self.actions.len() + 9) / 10;
        for index in rand::seq::index::sample(rng, self.actions.len(), count) {
            let key = PerceptionKey::from_index(index, self.vision);
            self.actions[index] = draw(species, key, rng);
        }
    }

    #[inline]
    pub fn lookup(&self, key: PerceptionKey) -> Action {
        self.actions[key.index(self.vision)]
    }

    #[inline]
    pub fn vision(&self) -> u8 {
        self.vision
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All entries in packed-index order.
    pub fn entries(&self) -> impl Iterator<Item = (PerceptionKey, Action)> + '_ {
        self.actions
            .iter()
            .enumerate()
            .map(|(index, &action)| (PerceptionKey::from_index(index, self.vision), action))
    }

    /// Rebuild a table from a full, packed-index-ordered action list.
    /// Callers (the gene-file loader) are responsible for ordering.
    pub fn from_actions(vision: u8, actions: Vec<Action>) -> Self {
        assert_eq!(
            actions.len(),
            table_len(vision),
            "action list does not cover the key space"
        );
        Self { vision, actions }
    }
}

/// Number of entries for a given vision radius: `(vision + 1)^4`.
pub fn table_len(vision: u8) -> usize {
    (vision as usize + 1).pow(4)
}

fn draw<R: Rng>(species: Species, key: PerceptionKey, rng: &mut R) -> Action {
    candidates(species, key)
        .choose(rng)
        .copied()
        .unwrap_or(Action::RandomMove)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn test_key_index_roundtrip() {
        for vision in [1u8, 2, 4] {
            for index in 0..table_len(vision) {
                let key = PerceptionKey::from_index(index, vision);
                assert_eq!(key.index(vision), index);
            }
        }
    }

    #[test]
    fn test_random_table_covers_key_space() {
        let mut rng = rng(1);
        let table = GeneTable::random(Species::Herbivore, 4, &mut rng);
        assert_eq!(table.len(), 625);
        assert_eq!(table.entries().count(), 625);
    }

    #[test]
    fn test_candidate_rule_for_lone_herbivore_neighbor() {
        // Key (0,1,0,0) for a herbivore: only the herbivore component is set,
        // and it is the animal's own species at distance 1.
        let allowed = [
            Action::MoveToHerbivore,
            Action::FleeFromHerbivore,
            Action::RandomMove,
            Action::Stay,
        ];
        let key = PerceptionKey::new(0, 1, 0, 0);
        for seed in 0..50 {
            let mut rng = rng(seed);
            let table = GeneTable::random(Species::Herbivore, 1, &mut rng);
            assert!(allowed.contains(&table.lookup(key)));
        }
    }

    #[test]
    fn test_stay_requires_own_species_adjacency() {
        // A carnivore seeing a herbivore at distance 1 cannot draw Stay.
        let key = PerceptionKey::new(0, 1, 0, 0);
        let set = candidates(Species::Carnivore, key);
        assert!(!set.contains(&Action::Stay));
        // Seeing another carnivore at distance 1, it can.
        let key = PerceptionKey::new(0, 0, 0, 1);
        let set = candidates(Species::Carnivore, key);
        assert!(set.contains(&Action::Stay));
    }

    #[test]
    fn test_blind_key_only_random() {
        let set = candidates(Species::Omnivore, PerceptionKey::new(0, 0, 0, 0));
        assert_eq!(set, vec![Action::RandomMove]);
    }

    #[test]
    fn test_mix_draws_from_parents() {
        let mut rng = rng(3);
        let a = GeneTable::random(Species::Omnivore, 2, &mut rng);
        let b = GeneTable::random(Species::Omnivore, 2, &mut rng);
        let child = GeneTable::mix(&a, &b, Species::Omnivore, &mut rng);

        assert_eq!(child.len(), a.len());
        // Without mutation every entry comes from a parent; with it, at most
        // ceil(10%) of the keys were re-drawn.
        let foreign = child
            .entries()
            .filter(|&(key, action)| action != a.lookup(key) && action != b.lookup(key))
            .count();
        assert!(foreign <= (child.len() + 9) / 10);
    }

    #[test]
    fn test_mutation_bounded() {
        let mut seed_rng = rng(9);
        let original = GeneTable::random(Species::Herbivore, 2, &mut seed_rng);
        for seed in 0..40 {
            let mut rng = rng(seed + 100);
            let mut table = original.clone();
            table.mutate(Species::Herbivore, &mut rng);
            let changed = table
                .entries()
                .filter(|&(key, action)| action != original.lookup(key))
                .count();
            assert!(changed <= (table.len() + 9) / 10);
        }
    }

    #[test]
    fn test_action_name_roundtrip() {
        let all = [
            Action::MoveToPlant,
            Action::MoveToHerbivore,
            Action::MoveToOmnivore,
            Action::MoveToCarnivore,
            Action::FleeFromHerbivore,
            Action::FleeFromOmnivore,
            Action::FleeFromCarnivore,
            Action::RandomMove,
            Action::Stay,
        ];
        for action in all {
            assert_eq!(Action::from_name(action.name()), Some(action));
        }
        assert_eq!(Action::from_name("teleport"), None);
    }
}
