//! Animal state records.

use crate::genes::GeneTable;
use crate::species::Species;
use serde::{Deserialize, Serialize};

/// Cause of death tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Starvation,
    OldAge,
    Predation,
}

/// An animal in the simulation.
///
/// Dead animals stay in the grid's arena as tombstones (`alive == false`) so
/// the episode driver can report a survival time for every animal that ever
/// existed; the occupancy map and species sets only reference live ones.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Animal {
    pub x: i32,
    pub y: i32,
    pub species: Species,
    pub genes: GeneTable,
    /// Ticks since the animal last fed.
    pub hunger: u32,
    /// Ticks alive.
    pub age: u32,
    /// Ticks until the animal may reproduce again.
    pub cooldown: u32,
    /// Consecutive ticks without a position change.
    pub stationary_moves: u32,
    /// Ticks survived, credited once per tick by the driver.
    pub survival_time: u32,
    pub offspring_count: u32,
    pub alive: bool,
    pub cause_of_death: Option<DeathCause>,
}

impl Animal {
    pub fn new(x: i32, y: i32, species: Species, genes: GeneTable) -> Self {
        Self {
            x,
            y,
            species,
            genes,
            hunger: 0,
            age: 0,
            cooldown: 0,
            stationary_moves: 0,
            survival_time: 0,
            offspring_count: 0,
            alive: true,
            cause_of_death: None,
        }
    }

    #[inline]
    pub fn pos(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }
}
