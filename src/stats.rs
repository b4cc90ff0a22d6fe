//! Statistics tracking across episodes.

use crate::species::Species;
use crate::world::EpisodeResult;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Survival summary for one species over one episode.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeciesStats {
    pub species: Species,
    /// Animals of this species that ever existed during the episode.
    pub count: usize,
    pub mean_survival: f32,
    pub max_survival: u32,
    /// Top-3 survival times, descending.
    pub top: Vec<u32>,
}

impl SpeciesStats {
    pub fn from_survivals(species: Species, mut survivals: Vec<u32>) -> Self {
        survivals.sort_unstable_by(|a, b| b.cmp(a));
        let count = survivals.len();
        let mean_survival = if count == 0 {
            0.0
        } else {
            survivals.iter().sum::<u32>() as f32 / count as f32
        };
        let max_survival = survivals.first().copied().unwrap_or(0);
        let top = survivals.into_iter().take(3).collect();
        Self {
            species,
            count,
            mean_survival,
            max_survival,
            top,
        }
    }
}

/// Statistics snapshot for one episode.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EpisodeStats {
    pub episode: u32,
    /// Ticks the episode actually ran.
    pub ticks: u32,
    /// One record per species, in `Species::ALL` order.
    pub species: Vec<SpeciesStats>,
}

impl EpisodeStats {
    pub fn from_result(episode: u32, result: &EpisodeResult) -> Self {
        let species = Species::ALL
            .iter()
            .map(|&species| {
                let survivals = result
                    .by_species(species)
                    .map(|o| o.survival_time)
                    .collect();
                SpeciesStats::from_survivals(species, survivals)
            })
            .collect();
        Self {
            episode,
            ticks: result.ticks,
            species,
        }
    }

    pub fn for_species(&self, species: Species) -> Option<&SpeciesStats> {
        self.species.iter().find(|s| s.species == species)
    }

    /// One-line console summary.
    pub fn summary(&self) -> String {
        let mut line = format!("E:{:4} | T:{:4}", self.episode, self.ticks);
        for stats in &self.species {
            let _ = write!(
                line,
                " | {} n:{:4} avg:{:6.1} max:{:4}",
                &stats.species.as_str()[..4],
                stats.count,
                stats.mean_survival,
                stats.max_survival
            );
        }
        line
    }

    /// Save stats to a JSON file
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load stats from a JSON file
    pub fn load_json(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Per-run history of episode statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub episodes: Vec<EpisodeStats>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stats: EpisodeStats) {
        self.episodes.push(stats);
    }

    /// Mean survival per episode for one species.
    pub fn mean_survival_series(&self, species: Species) -> Vec<(u32, f32)> {
        self.episodes
            .iter()
            .filter_map(|e| {
                e.for_species(species)
                    .map(|s| (e.episode, s.mean_survival))
            })
            .collect()
    }

    /// Max survival per episode for one species.
    pub fn max_survival_series(&self, species: Species) -> Vec<(u32, u32)> {
        self.episodes
            .iter()
            .filter_map(|e| e.for_species(species).map(|s| (e.episode, s.max_survival)))
            .collect()
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_species_stats_ordering() {
        let stats =
            SpeciesStats::from_survivals(Species::Herbivore, vec![5, 40, 12, 40, 3, 7]);
        assert_eq!(stats.count, 6);
        assert_eq!(stats.max_survival, 40);
        assert_eq!(stats.top, vec![40, 40, 12]);
        assert!((stats.mean_survival - 17.833_334).abs() < 1e-3);
    }

    #[test]
    fn test_species_stats_empty() {
        let stats = SpeciesStats::from_survivals(Species::Carnivore, vec![]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean_survival, 0.0);
        assert_eq!(stats.max_survival, 0);
        assert!(stats.top.is_empty());
    }

    #[test]
    fn test_species_stats_fewer_than_three() {
        let stats = SpeciesStats::from_survivals(Species::Omnivore, vec![9, 2]);
        assert_eq!(stats.top, vec![9, 2]);
    }

    #[test]
    fn test_summary_mentions_all_species() {
        let stats = EpisodeStats {
            episode: 3,
            ticks: 300,
            species: Species::ALL
                .iter()
                .map(|&s| SpeciesStats::from_survivals(s, vec![10, 20]))
                .collect(),
        };
        let line = stats.summary();
        assert!(line.contains("herb"));
        assert!(line.contains("carn"));
        assert!(line.contains("omni"));
    }

    #[test]
    fn test_history_series() {
        let mut history = TrainingHistory::new();
        for episode in 0..4 {
            history.record(EpisodeStats {
                episode,
                ticks: 300,
                species: vec![SpeciesStats::from_survivals(
                    Species::Herbivore,
                    vec![episode * 10],
                )],
            });
        }
        let series = history.mean_survival_series(Species::Herbivore);
        assert_eq!(series.len(), 4);
        assert_eq!(series[2], (2, 20.0));
        let max_series = history.max_survival_series(Species::Herbivore);
        assert_eq!(max_series[3], (3, 30));
    }

    #[test]
    fn test_history_json_roundtrip() {
        let mut history = TrainingHistory::new();
        history.record(EpisodeStats {
            episode: 0,
            ticks: 120,
            species: vec![SpeciesStats::from_survivals(Species::Omnivore, vec![4, 8])],
        });
        let path = "/tmp/savanna_test_history.json";
        history.save(path).unwrap();
        let loaded = TrainingHistory::load(path).unwrap();
        assert_eq!(loaded.episodes.len(), 1);
        assert_eq!(loaded.episodes[0].species[0].max_survival, 8);
        std::fs::remove_file(path).ok();
    }
}
