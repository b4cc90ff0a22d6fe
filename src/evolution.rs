//! Evolution across episodes: truncation selection and gene-pool derivation.
//!
//! The trainer runs one episode at a time, keeps the top survivors per
//! species, and re-derives the next episode's gene pools by resampling those
//! survivors' tables and mutating the copies.

use crate::config::Config;
use crate::genes::GeneTable;
use crate::species::Species;
use crate::stats::EpisodeStats;
use crate::world::World;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Per-species gene-table pools, used both as seeding input for an episode
/// and as the persisted champion sets. Plain data: no references into any
/// live grid.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenePools {
    pub herbivore: Vec<GeneTable>,
    pub carnivore: Vec<GeneTable>,
    pub omnivore: Vec<GeneTable>,
}

impl GenePools {
    pub fn tables(&self, species: Species) -> &[GeneTable] {
        match species {
            Species::Herbivore => &self.herbivore,
            Species::Carnivore => &self.carnivore,
            Species::Omnivore => &self.omnivore,
        }
    }

    pub fn set_tables(&mut self, species: Species, tables: Vec<GeneTable>) {
        match species {
            Species::Herbivore => self.herbivore = tables,
            Species::Carnivore => self.carnivore = tables,
            Species::Omnivore => self.omnivore = tables,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.herbivore.is_empty() && self.carnivore.is_empty() && self.omnivore.is_empty()
    }
}

/// What one training episode produced: summary statistics, the top-3 gene
/// tables per species for archival, and the pools seeding the next episode.
#[derive(Clone, Debug)]
pub struct EpisodeReport {
    pub episode: u32,
    pub stats: EpisodeStats,
    pub champions: GenePools,
}

/// Runs episodes and evolves gene pools between them.
pub struct Trainer {
    config: Config,
    master_seed: u64,
    episode: u32,
    pools: Option<GenePools>,
    rng: ChaCha8Rng,
}

impl Trainer {
    pub fn new(config: Config, master_seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(master_seed),
            config,
            master_seed,
            episode: 0,
            pools: None,
        }
    }

    /// Rebuild a trainer mid-run from persisted state.
    pub fn from_state(config: Config, episode: u32, master_seed: u64, pools: Option<GenePools>) -> Self {
        // Skip the RNG ahead so resumed derivations do not replay episode 0's.
        let mut rng = ChaCha8Rng::seed_from_u64(master_seed);
        rng.set_stream(episode as u64);
        Self {
            rng,
            config,
            master_seed,
            episode,
            pools,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn episode(&self) -> u32 {
        self.episode
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn pools(&self) -> Option<&GenePools> {
        self.pools.as_ref()
    }

    /// Run one episode with the current pools, then re-derive them from the
    /// top survivors.
    pub fn run_episode(&mut self) -> EpisodeReport {
        let episode_seed = self.master_seed.wrapping_add(self.episode as u64);
        let mut world = World::with_pools(&self.config, episode_seed, self.pools.as_ref());
        let result = world.run();

        let stats = EpisodeStats::from_result(self.episode, &result);
        let keep = self.config.training.breeding_pool;

        let mut champions = GenePools::default();
        let mut next = GenePools::default();
        for species in Species::ALL {
            let mut ranked: Vec<_> = result.by_species(species).collect();
            ranked.sort_by(|a, b| b.survival_time.cmp(&a.survival_time));
            let pool: Vec<&GeneTable> = ranked.iter().take(keep).map(|o| &o.genes).collect();

            champions.set_tables(species, pool.iter().take(3).map(|g| (*g).clone()).collect());

            let mut derived = Vec::with_capacity(keep);
            for _ in 0..keep {
                let Some(base) = pool.choose(&mut self.rng) else {
                    break;
                };
                let mut table = (*base).clone();
                table.mutate(species, &mut self.rng);
                derived.push(table);
            }
            log::debug!(
                "episode {}: derived {} {} tables from {} survivors",
                self.episode,
                derived.len(),
                species,
                ranked.len()
            );
            next.set_tables(species, derived);
        }

        self.pools = Some(next);
        self.episode += 1;

        EpisodeReport {
            episode: self.episode - 1,
            stats,
            champions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trainer_config() -> Config {
        let mut config = Config::default();
        config.grid.width = 20;
        config.grid.height = 20;
        config.population.plants = 12;
        config.population.herbivores = 20;
        config.population.carnivores = 4;
        config.population.omnivores = 4;
        config.training.steps_per_episode = 40;
        config.training.breeding_pool = 5;
        config
    }

    #[test]
    fn test_pools_refilled_each_episode() {
        let mut trainer = Trainer::new(trainer_config(), 77);
        assert!(trainer.pools().is_none());

        let report = trainer.run_episode();
        assert_eq!(report.episode, 0);
        let pools = trainer.pools().expect("pools derived");
        for species in Species::ALL {
            assert_eq!(pools.tables(species).len(), 5);
        }
        assert_eq!(trainer.episode(), 1);
    }

    #[test]
    fn test_champions_are_top_three() {
        let mut trainer = Trainer::new(trainer_config(), 78);
        let report = trainer.run_episode();
        for species in Species::ALL {
            assert!(report.champions.tables(species).len() <= 3);
            assert!(!report.champions.tables(species).is_empty());
        }
    }

    #[test]
    fn test_empty_species_yields_empty_pool() {
        let mut config = trainer_config();
        config.population.carnivores = 0;
        let mut trainer = Trainer::new(config, 79);
        let report = trainer.run_episode();
        assert!(report.champions.tables(Species::Carnivore).is_empty());
        assert!(trainer
            .pools()
            .unwrap()
            .tables(Species::Carnivore)
            .is_empty());
        // The next episode must still run: that species falls back to random
        // tables (and here, a zero count).
        trainer.run_episode();
    }

    #[test]
    fn test_derived_tables_match_vision() {
        let mut trainer = Trainer::new(trainer_config(), 80);
        let report = trainer.run_episode();
        let vision = trainer.config().species.herbivore.vision_radius;
        for table in report.champions.tables(Species::Herbivore) {
            assert_eq!(table.vision(), vision);
        }
    }

    #[test]
    fn test_training_chain_runs() {
        let mut trainer = Trainer::new(trainer_config(), 81);
        for expected in 0..3 {
            let report = trainer.run_episode();
            assert_eq!(report.episode, expected);
            for species_stats in &report.stats.species {
                assert!(species_stats.top.len() <= 3);
            }
        }
    }
}
