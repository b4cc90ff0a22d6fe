//! Configuration system for the savanna simulation.
//!
//! Supports YAML configuration files with sensible defaults. A file missing a
//! required parameter fails deserialization before any episode runs.

use crate::species::Species;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub grid: GridConfig,
    pub population: PopulationConfig,
    pub species: SpeciesConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// World/grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of cells in width
    pub width: i32,
    /// Number of cells in height
    pub height: i32,
    /// Pixel size of a cell; carried for external renderers, unused by the core
    pub cell_size: u32,
}

/// Initial population counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub plants: usize,
    pub herbivores: usize,
    pub carnivores: usize,
    pub omnivores: usize,
}

impl PopulationConfig {
    pub fn animals(&self, species: Species) -> usize {
        match species {
            Species::Herbivore => self.herbivores,
            Species::Carnivore => self.carnivores,
            Species::Omnivore => self.omnivores,
        }
    }

    pub fn total_animals(&self) -> usize {
        self.herbivores + self.carnivores + self.omnivores
    }
}

/// Per-species behavioral parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpeciesParams {
    /// How far the species can see
    pub vision_radius: u8,
    /// Steps without feeding before death
    pub hunger_death: u32,
    /// Steps alive before death
    pub age_death: u32,
    /// Steps between reproductions
    pub reproduction_cooldown: u32,
}

/// Parameters for all three species
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub herbivore: SpeciesParams,
    pub carnivore: SpeciesParams,
    pub omnivore: SpeciesParams,
}

impl SpeciesConfig {
    pub fn params(&self, species: Species) -> &SpeciesParams {
        match species {
            Species::Herbivore => &self.herbivore,
            Species::Carnivore => &self.carnivore,
            Species::Omnivore => &self.omnivore,
        }
    }
}

/// Episode and evolution-loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Ticks per episode
    pub steps_per_episode: u32,
    /// Episodes per training run
    pub episodes: u32,
    /// Top survivors kept per species as the breeding pool
    pub breeding_pool: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Episodes between console stats lines
    pub stats_interval: u32,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            population: PopulationConfig::default(),
            species: SpeciesConfig::default(),
            training: TrainingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 60,
            height: 30,
            cell_size: 30,
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            plants: 15,
            herbivores: 250,
            carnivores: 60,
            omnivores: 60,
        }
    }
}

impl Default for SpeciesConfig {
    fn default() -> Self {
        Self {
            herbivore: SpeciesParams {
                vision_radius: 4,
                hunger_death: 7,
                age_death: 40,
                reproduction_cooldown: 3,
            },
            carnivore: SpeciesParams {
                vision_radius: 4,
                hunger_death: 40,
                age_death: 50,
                reproduction_cooldown: 6,
            },
            omnivore: SpeciesParams {
                vision_radius: 4,
                hunger_death: 8,
                age_death: 30,
                reproduction_cooldown: 10,
            },
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            steps_per_episode: 300,
            episodes: 20,
            breeding_pool: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 1,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.grid.width <= 0 || self.grid.height <= 0 {
            return Err("grid dimensions must be positive".to_string());
        }
        let cells = self.grid.width as usize * self.grid.height as usize;
        if self.population.total_animals() > cells {
            return Err("initial animal population cannot exceed grid capacity".to_string());
        }
        for species in Species::ALL {
            let params = self.species.params(species);
            if params.vision_radius == 0 {
                return Err(format!("{species}: vision_radius must be >= 1"));
            }
            if params.hunger_death == 0 || params.age_death == 0 {
                return Err(format!("{species}: death thresholds must be > 0"));
            }
        }
        if self.training.steps_per_episode == 0 {
            return Err("steps_per_episode must be > 0".to_string());
        }
        if self.training.breeding_pool == 0 {
            return Err("breeding_pool must be > 0".to_string());
        }
        if self.logging.stats_interval == 0 {
            return Err("stats_interval must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(loaded.grid.width, config.grid.width);
        assert_eq!(
            loaded.species.carnivore.hunger_death,
            config.species.carnivore.hunger_death
        );
        assert_eq!(loaded.training.breeding_pool, config.training.breeding_pool);
    }

    #[test]
    fn test_missing_field_rejected() {
        // A file that drops a required section must fail to parse rather than
        // silently fall back to defaults.
        let yaml = "grid:\n  width: 10\n  height: 10\n  cell_size: 30\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.grid.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.species.herbivore.vision_radius = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.breeding_pool = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overcrowded_grid_rejected() {
        let mut config = Config::default();
        config.grid.width = 5;
        config.grid.height = 5;
        assert!(config.validate().is_err());
    }
}
