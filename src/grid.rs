//! The cellular world: occupancy, per-species spatial indices, perception
//! queries, movement primitives, and the per-tick update pipeline.
//!
//! All grid operations are total over validated coordinates; out-of-bounds
//! requests are rejected through boolean predicates, never by panicking.
//! Internal index corruption, on the other hand, is a bug and
//! [`Grid::check_consistency`] fails loudly rather than repairing it.

use crate::animal::{Animal, DeathCause};
use crate::config::SpeciesConfig;
use crate::genes::{Action, GeneTable, PerceptionKey};
use crate::species::Species;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashSet;

/// Grid position.
pub type Pos = (i32, i32);

/// Orthogonal neighbor offsets, in the fixed scan order used by reproduction
/// and predation.
const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Search radius for `find_nearest`, independent of species vision.
const NEAREST_RADIUS: i32 = 4;

/// Consecutive ticks without a position change before the movement phase
/// falls back to a random step.
const STATIONARY_LIMIT: u32 = 3;

/// What an observer sees on top of a cell. An animal standing on a plant
/// reports `Animal`; the plant stays tracked underneath.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Plant,
    Animal(Species),
}

/// A target for [`Grid::find_nearest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    Plant,
    Animal(Species),
}

/// Per-animal entry in a renderer snapshot.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct AnimalView {
    pub x: i32,
    pub y: i32,
    pub species: Species,
    pub age: u32,
    pub hunger: u32,
}

/// Read-only view of grid state, sufficient to draw a frame without touching
/// simulation internals.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub width: i32,
    pub height: i32,
    pub plants: Vec<Pos>,
    pub animals: Vec<AnimalView>,
}

/// The cellular world. Owns every plant and animal record.
pub struct Grid {
    width: i32,
    height: i32,
    /// One slot per cell; `Some(index)` points into `animals`. At most one
    /// animal per cell.
    occupancy: Vec<Option<usize>>,
    plants: HashSet<Pos>,
    herbivores: HashSet<Pos>,
    carnivores: HashSet<Pos>,
    omnivores: HashSet<Pos>,
    /// Arena of every animal that ever existed this episode; dead entries are
    /// tombstones.
    animals: Vec<Animal>,
    species_config: SpeciesConfig,
    rng: ChaCha8Rng,
}

impl Grid {
    pub fn new(width: i32, height: i32, species_config: SpeciesConfig, seed: u64) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        Self {
            width,
            height,
            occupancy: vec![None; (width * height) as usize],
            plants: HashSet::new(),
            herbivores: HashSet::new(),
            carnivores: HashSet::new(),
            omnivores: HashSet::new(),
            animals: Vec::new(),
            species_config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    fn cell_index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    /// Bounds check.
    #[inline]
    pub fn is_valid(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// Valid and holding no animal; a plant is fine.
    #[inline]
    pub fn is_empty_for_animal(&self, x: i32, y: i32) -> bool {
        self.is_valid(x, y) && self.occupancy[self.cell_index(x, y)].is_none()
    }

    /// Valid and holding no plant; an animal is fine.
    #[inline]
    pub fn is_empty_for_plant(&self, x: i32, y: i32) -> bool {
        self.is_valid(x, y) && !self.plants.contains(&(x, y))
    }

    /// What sits on top of a cell. Out-of-bounds reads as `Empty`.
    pub fn cell(&self, x: i32, y: i32) -> Cell {
        if !self.is_valid(x, y) {
            return Cell::Empty;
        }
        if let Some(index) = self.occupancy[self.cell_index(x, y)] {
            Cell::Animal(self.animals[index].species)
        } else if self.plants.contains(&(x, y)) {
            Cell::Plant
        } else {
            Cell::Empty
        }
    }

    fn species_set(&self, species: Species) -> &HashSet<Pos> {
        match species {
            Species::Herbivore => &self.herbivores,
            Species::Carnivore => &self.carnivores,
            Species::Omnivore => &self.omnivores,
        }
    }

    fn species_set_mut(&mut self, species: Species) -> &mut HashSet<Pos> {
        match species {
            Species::Herbivore => &mut self.herbivores,
            Species::Carnivore => &mut self.carnivores,
            Species::Omnivore => &mut self.omnivores,
        }
    }

    pub fn add_plant(&mut self, x: i32, y: i32) -> bool {
        if !self.is_empty_for_plant(x, y) {
            return false;
        }
        self.plants.insert((x, y));
        true
    }

    /// Insert an animal, with inherited genes or a fresh random table.
    pub fn add_animal(
        &mut self,
        x: i32,
        y: i32,
        species: Species,
        genes: Option<GeneTable>,
    ) -> bool {
        if !self.is_empty_for_animal(x, y) {
            return false;
        }
        let vision = self.species_config.params(species).vision_radius;
        if let Some(genes) = &genes {
            assert_eq!(
                genes.vision(),
                vision,
                "inherited gene table does not match the species vision radius"
            );
        }
        let genes = genes.unwrap_or_else(|| GeneTable::random(species, vision, &mut self.rng));
        let index = self.animals.len();
        self.animals.push(Animal::new(x, y, species, genes));
        let cell = self.cell_index(x, y);
        self.occupancy[cell] = Some(index);
        self.species_set_mut(species).insert((x, y));
        true
    }

    /// Nearest rounded Euclidean distance per entity type within the species'
    /// vision radius (Chebyshev-bounded square, Euclidean-filtered). 0 means
    /// "not seen". The querying animal's own cell is skipped.
    pub fn perceive(&self, x: i32, y: i32, species: Species) -> PerceptionKey {
        let radius = self.species_config.params(species).vision_radius as i32;
        let limit = (radius * radius) as i64;
        // best squared distance per type: plant, herbivore, omnivore, carnivore
        let mut best: [Option<i64>; 4] = [None; 4];

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (cx, cy) = (x + dx, y + dy);
                if !self.is_valid(cx, cy) {
                    continue;
                }
                let sq = (dx * dx + dy * dy) as i64;
                if sq > limit {
                    continue;
                }
                if self.plants.contains(&(cx, cy)) {
                    record_min(&mut best[0], sq);
                }
                if let Some(index) = self.occupancy[self.cell_index(cx, cy)] {
                    let slot = match self.animals[index].species {
                        Species::Herbivore => 1,
                        Species::Omnivore => 2,
                        Species::Carnivore => 3,
                    };
                    record_min(&mut best[slot], sq);
                }
            }
        }

        PerceptionKey::new(
            rounded_distance(best[0]),
            rounded_distance(best[1]),
            rounded_distance(best[2]),
            rounded_distance(best[3]),
        )
    }

    /// Minimum-Euclidean-distance match within a fixed radius of 4; ties go to
    /// the first cell encountered in row-major offset order. The origin cell
    /// is skipped.
    pub fn find_nearest(&self, x: i32, y: i32, target: TargetKind) -> Option<Pos> {
        let mut best: Option<(i64, Pos)> = None;
        for dy in -NEAREST_RADIUS..=NEAREST_RADIUS {
            for dx in -NEAREST_RADIUS..=NEAREST_RADIUS {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (cx, cy) = (x + dx, y + dy);
                if !self.is_valid(cx, cy) {
                    continue;
                }
                let hit = match target {
                    TargetKind::Plant => self.plants.contains(&(cx, cy)),
                    TargetKind::Animal(species) => self.species_set(species).contains(&(cx, cy)),
                };
                if !hit {
                    continue;
                }
                let sq = (dx * dx + dy * dy) as i64;
                if best.map_or(true, |(b, _)| sq < b) {
                    best = Some((sq, (cx, cy)));
                }
            }
        }
        best.map(|(_, pos)| pos)
    }

    /// Single orthogonal step on the dominant axis toward the target; ties
    /// take the y-axis branch (the `|dx| > |dy|` check is strict). Returns the
    /// original position if the step would leave the grid.
    pub fn move_toward(&self, x: i32, y: i32, tx: i32, ty: i32) -> Pos {
        let dx = tx - x;
        let dy = ty - y;
        let (nx, ny) = if dx.abs() > dy.abs() {
            (x + dx.signum(), y)
        } else {
            (x, y + dy.signum())
        };
        if self.is_valid(nx, ny) {
            (nx, ny)
        } else {
            (x, y)
        }
    }

    /// Mirror of [`Grid::move_toward`], stepping away from the target.
    pub fn move_away(&self, x: i32, y: i32, tx: i32, ty: i32) -> Pos {
        let dx = tx - x;
        let dy = ty - y;
        let (nx, ny) = if dx.abs() > dy.abs() {
            (x - dx.signum(), y)
        } else {
            (x, y - dy.signum())
        };
        if self.is_valid(nx, ny) {
            (nx, ny)
        } else {
            (x, y)
        }
    }

    /// First of the four shuffled orthogonal neighbors that is in bounds and
    /// animal-free; falls back to the original position.
    pub fn random_move(&mut self, x: i32, y: i32) -> Pos {
        let mut dirs = DIRECTIONS;
        dirs.shuffle(&mut self.rng);
        for (dx, dy) in dirs {
            let (nx, ny) = (x + dx, y + dy);
            if self.is_empty_for_animal(nx, ny) {
                return (nx, ny);
            }
        }
        (x, y)
    }

    /// Move the animal at `(x, y)` to `(nx, ny)`.
    ///
    /// The mover's stored coordinates are set to the destination before the
    /// feeding and collision checks; a herbivore or omnivore therefore
    /// consumes a plant on the destination cell (and resets its hunger) even
    /// when the move then fails against another animal. On that failure path
    /// the coordinates are restored and the occupancy map and species sets
    /// stay untouched. Carnivores never consume plants.
    pub fn apply_move(&mut self, x: i32, y: i32, nx: i32, ny: i32) -> bool {
        if !self.is_valid(x, y) || !self.is_valid(nx, ny) {
            return false;
        }
        let src = self.cell_index(x, y);
        let Some(index) = self.occupancy[src] else {
            return false;
        };
        let species = self.animals[index].species;

        self.animals[index].x = nx;
        self.animals[index].y = ny;
        if species.eats_plants() && self.plants.remove(&(nx, ny)) {
            self.animals[index].hunger = 0;
        }

        let dest = self.cell_index(nx, ny);
        if self.occupancy[dest].is_some() {
            self.animals[index].x = x;
            self.animals[index].y = y;
            return false;
        }

        self.occupancy[src] = None;
        self.occupancy[dest] = Some(index);
        let set = self.species_set_mut(species);
        set.remove(&(x, y));
        set.insert((nx, ny));
        true
    }

    fn remove_animal(&mut self, index: usize, cause: DeathCause) {
        let (x, y, species) = {
            let animal = &self.animals[index];
            (animal.x, animal.y, animal.species)
        };
        let cell = self.cell_index(x, y);
        debug_assert_eq!(self.occupancy[cell], Some(index));
        self.occupancy[cell] = None;
        self.species_set_mut(species).remove(&(x, y));
        let animal = &mut self.animals[index];
        animal.alive = false;
        animal.cause_of_death = Some(cause);
    }

    /// Plant spread: each plant picks one empty-for-plant orthogonal neighbor
    /// uniformly at random; all chosen targets sprout after the scan.
    pub fn update_plants(&mut self) {
        let existing: Vec<Pos> = self.plants.iter().copied().collect();
        let mut sprouts = Vec::new();
        for (x, y) in existing {
            let open: Vec<Pos> = DIRECTIONS
                .iter()
                .map(|&(dx, dy)| (x + dx, y + dy))
                .filter(|&(nx, ny)| self.is_empty_for_plant(nx, ny))
                .collect();
            if let Some(&target) = open.choose(&mut self.rng) {
                sprouts.push(target);
            }
        }
        for (x, y) in sprouts {
            self.add_plant(x, y);
        }
    }

    /// One tick of animal behavior: metabolism, death, reproduction, omnivore
    /// predation, carnivore predation, movement — each phase runs over the
    /// same shuffled pass, and every animal's action resolves to completion
    /// before the next is processed.
    pub fn update_animals(&mut self) {
        let mut order: Vec<usize> = (0..self.animals.len())
            .filter(|&i| self.animals[i].alive)
            .collect();
        order.shuffle(&mut self.rng);

        self.metabolism_phase(&order);
        self.death_phase(&order);
        self.reproduction_phase(&order);
        self.hunt_phase(&order, Species::Omnivore, &[Species::Herbivore]);
        self.hunt_phase(
            &order,
            Species::Carnivore,
            &[Species::Herbivore, Species::Omnivore],
        );
        self.movement_phase(&order);

        #[cfg(debug_assertions)]
        self.check_consistency();
    }

    /// Hunger and age advance; herbivores and omnivores standing on a plant
    /// eat it immediately.
    fn metabolism_phase(&mut self, order: &[usize]) {
        for &i in order {
            if !self.animals[i].alive {
                continue;
            }
            let animal = &mut self.animals[i];
            animal.hunger += 1;
            animal.age += 1;
            let pos = (animal.x, animal.y);
            let grazes = animal.species.eats_plants();
            if grazes && self.plants.remove(&pos) {
                self.animals[i].hunger = 0;
            }
        }
    }

    /// Starvation is checked before old age so the reported cause matches.
    fn death_phase(&mut self, order: &[usize]) {
        for &i in order {
            if !self.animals[i].alive {
                continue;
            }
            let params = *self.species_config.params(self.animals[i].species);
            if self.animals[i].hunger >= params.hunger_death {
                self.remove_animal(i, DeathCause::Starvation);
            } else if self.animals[i].age >= params.age_death {
                self.remove_animal(i, DeathCause::OldAge);
            }
        }
    }

    fn reproduction_phase(&mut self, order: &[usize]) {
        for &i in order {
            if !self.animals[i].alive {
                continue;
            }
            let species = self.animals[i].species;
            let params = *self.species_config.params(species);
            if 2 * self.animals[i].hunger >= params.hunger_death {
                continue;
            }
            if self.animals[i].cooldown > 0 {
                self.animals[i].cooldown -= 1;
                continue;
            }
            let (x, y) = self.animals[i].pos();
            if self.perceive(x, y, species).animal_distance(species) != 1 {
                continue;
            }

            // The partner is the first same-species neighbor in scan order;
            // if that one is unwilling, the attempt fails outright.
            let mut partner = None;
            for (dx, dy) in DIRECTIONS {
                let pos = (x + dx, y + dy);
                if self.species_set(species).contains(&pos) {
                    partner = self.occupancy[self.cell_index(pos.0, pos.1)];
                    break;
                }
            }
            let Some(j) = partner else {
                continue;
            };
            if self.animals[j].cooldown > 0 || 2 * self.animals[j].hunger >= params.hunger_death {
                continue;
            }

            let open: Vec<Pos> = DIRECTIONS
                .iter()
                .map(|&(dx, dy)| (x + dx, y + dy))
                .filter(|&(nx, ny)| self.is_empty_for_animal(nx, ny))
                .collect();
            let Some(&(cx, cy)) = open.choose(&mut self.rng) else {
                continue;
            };

            let genes = GeneTable::mix(
                &self.animals[i].genes,
                &self.animals[j].genes,
                species,
                &mut self.rng,
            );
            let child_index = self.animals.len();
            let mut child = Animal::new(cx, cy, species, genes);
            child.cooldown = params.reproduction_cooldown;
            self.animals.push(child);
            let cell = self.cell_index(cx, cy);
            self.occupancy[cell] = Some(child_index);
            self.species_set_mut(species).insert((cx, cy));

            self.animals[i].cooldown = params.reproduction_cooldown;
            self.animals[j].cooldown = params.reproduction_cooldown;
            self.animals[i].offspring_count += 1;
            self.animals[j].offspring_count += 1;
        }
    }

    /// Predators past half hunger consume the first adjacent prey found in
    /// fixed scan order — deliberately not the nearest-distance logic, since
    /// the emergent selection pressure depends on it. Prey types are tried in
    /// the given priority order.
    fn hunt_phase(&mut self, order: &[usize], predator: Species, prey: &[Species]) {
        let hunger_death = self.species_config.params(predator).hunger_death;
        for &i in order {
            if !self.animals[i].alive || self.animals[i].species != predator {
                continue;
            }
            if 2 * self.animals[i].hunger < hunger_death {
                continue;
            }
            let (x, y) = self.animals[i].pos();
            let seen = self.perceive(x, y, predator);

            let mut victim = None;
            'search: for &quarry in prey {
                if seen.animal_distance(quarry) != 1 {
                    continue;
                }
                for (dx, dy) in DIRECTIONS {
                    let pos = (x + dx, y + dy);
                    if self.species_set(quarry).contains(&pos) {
                        victim = self.occupancy[self.cell_index(pos.0, pos.1)];
                        break 'search;
                    }
                }
            }
            if let Some(j) = victim {
                self.remove_animal(j, DeathCause::Predation);
                self.animals[i].hunger = 0;
            }
        }
    }

    fn movement_phase(&mut self, order: &[usize]) {
        for &i in order {
            if !self.animals[i].alive {
                continue;
            }
            let (x, y) = self.animals[i].pos();
            let species = self.animals[i].species;
            let key = self.perceive(x, y, species);
            let mut action = self.animals[i].genes.lookup(key);

            if self.animals[i].stationary_moves >= STATIONARY_LIMIT {
                action = Action::RandomMove;
            }
            if action == Action::Stay && key.animal_distance(species) != 1 {
                action = Action::RandomMove;
            }

            let destination = match action {
                Action::MoveToPlant => self.step_toward(x, y, TargetKind::Plant),
                Action::MoveToHerbivore => {
                    self.step_toward(x, y, TargetKind::Animal(Species::Herbivore))
                }
                Action::MoveToOmnivore => {
                    self.step_toward(x, y, TargetKind::Animal(Species::Omnivore))
                }
                Action::MoveToCarnivore => {
                    self.step_toward(x, y, TargetKind::Animal(Species::Carnivore))
                }
                Action::FleeFromHerbivore => {
                    self.step_away(x, y, TargetKind::Animal(Species::Herbivore))
                }
                Action::FleeFromOmnivore => {
                    self.step_away(x, y, TargetKind::Animal(Species::Omnivore))
                }
                Action::FleeFromCarnivore => {
                    self.step_away(x, y, TargetKind::Animal(Species::Carnivore))
                }
                Action::RandomMove => Some(self.random_move(x, y)),
                Action::Stay => None,
            };

            let moved = match destination {
                Some((nx, ny)) if (nx, ny) != (x, y) => self.apply_move(x, y, nx, ny),
                _ => false,
            };
            if moved {
                self.animals[i].stationary_moves = 0;
            } else {
                self.animals[i].stationary_moves += 1;
            }
        }
    }

    fn step_toward(&self, x: i32, y: i32, target: TargetKind) -> Option<Pos> {
        self.find_nearest(x, y, target)
            .map(|(tx, ty)| self.move_toward(x, y, tx, ty))
    }

    fn step_away(&self, x: i32, y: i32, target: TargetKind) -> Option<Pos> {
        self.find_nearest(x, y, target)
            .map(|(tx, ty)| self.move_away(x, y, tx, ty))
    }

    /// Credit one tick of survival to every live animal.
    pub fn credit_survival(&mut self) {
        for animal in &mut self.animals {
            if animal.alive {
                animal.survival_time += 1;
            }
        }
    }

    /// Every animal that ever existed this episode, tombstones included.
    pub fn animals(&self) -> &[Animal] {
        &self.animals
    }

    pub fn animal_at(&self, x: i32, y: i32) -> Option<&Animal> {
        if !self.is_valid(x, y) {
            return None;
        }
        self.occupancy[self.cell_index(x, y)]
            .map(|index| &self.animals[index])
    }

    pub fn plants(&self) -> &HashSet<Pos> {
        &self.plants
    }

    pub fn plant_count(&self) -> usize {
        self.plants.len()
    }

    pub fn population_of(&self, species: Species) -> usize {
        self.species_set(species).len()
    }

    /// Live animals across all species.
    pub fn population(&self) -> usize {
        self.herbivores.len() + self.carnivores.len() + self.omnivores.len()
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut plants: Vec<Pos> = self.plants.iter().copied().collect();
        plants.sort_unstable();
        let animals = self
            .animals
            .iter()
            .filter(|a| a.alive)
            .map(|a| AnimalView {
                x: a.x,
                y: a.y,
                species: a.species,
                age: a.age,
                hunger: a.hunger,
            })
            .collect();
        Snapshot {
            width: self.width,
            height: self.height,
            plants,
            animals,
        }
    }

    /// Assert the bidirectional occupancy/species-set/liveness invariant.
    /// A violation indicates a bug in the update pipeline and panics rather
    /// than being silently repaired.
    pub fn check_consistency(&self) {
        let mut occupied = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                if let Some(index) = self.occupancy[self.cell_index(x, y)] {
                    occupied += 1;
                    let animal = &self.animals[index];
                    assert!(animal.alive, "occupancy references a dead animal");
                    assert_eq!(
                        animal.pos(),
                        (x, y),
                        "animal coordinates disagree with occupancy"
                    );
                    assert!(
                        self.species_set(animal.species).contains(&(x, y)),
                        "occupied cell missing from its species set"
                    );
                }
            }
        }
        for species in Species::ALL {
            for &(x, y) in self.species_set(species) {
                let index = self.occupancy[self.cell_index(x, y)]
                    .unwrap_or_else(|| panic!("species set references an empty cell ({x},{y})"));
                assert_eq!(
                    self.animals[index].species, species,
                    "species set references an animal of another species"
                );
            }
        }
        assert_eq!(
            occupied,
            self.population(),
            "occupied cell count disagrees with species sets"
        );
    }
}

fn record_min(slot: &mut Option<i64>, sq: i64) {
    if slot.map_or(true, |current| sq < current) {
        *slot = Some(sq);
    }
}

fn rounded_distance(sq: Option<i64>) -> u8 {
    match sq {
        Some(sq) => (sq as f64).sqrt().round() as u8,
        None => 0,
    }
}
