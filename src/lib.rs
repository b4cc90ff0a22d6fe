//! # savanna
//!
//! Gene-table artificial-life simulation: a 2D grid of plants and three
//! animal species (herbivore, carnivore, omnivore) whose behavior is driven
//! by per-individual lookup tables mapping discretized perception to actions,
//! evolved across episodes by truncation selection and mutation.
//!
//! ## Features
//!
//! - **Deterministic**: seeded random number generation end to end
//! - **Evolvable**: per-key biparental gene mixing plus mutation
//! - **Configurable**: YAML configuration files
//! - **Persistent**: per-episode statistics and champion gene tables
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use savanna::{Config, World};
//!
//! let config = Config::default();
//! let mut world = World::new(&config);
//! let result = world.run();
//!
//! println!("episode lasted {} ticks", result.ticks);
//! println!("animals seen: {}", result.outcomes.len());
//! ```
//!
//! ## Training
//!
//! ```rust,no_run
//! use savanna::evolution::Trainer;
//! use savanna::Config;
//!
//! let mut trainer = Trainer::new(Config::default(), 42);
//! for _ in 0..20 {
//!     let report = trainer.run_episode();
//!     println!("{}", report.stats.summary());
//! }
//! ```

pub mod animal;
pub mod archive;
pub mod config;
pub mod evolution;
pub mod genes;
pub mod grid;
pub mod species;
pub mod stats;
pub mod world;

// Re-export main types
pub use config::Config;
pub use grid::Grid;
pub use species::Species;
pub use world::World;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark
pub fn benchmark(episodes: u32) -> BenchmarkResult {
    use std::time::Instant;

    let config = Config::default();
    let mut total_ticks = 0u64;
    let mut final_population = 0;

    let start = Instant::now();
    for episode in 0..episodes {
        let mut world = World::new_with_seed(&config, episode as u64);
        world.run();
        total_ticks += world.tick as u64;
        final_population = world.population();
    }
    let elapsed = start.elapsed();

    BenchmarkResult {
        episodes,
        total_ticks,
        final_population,
        elapsed_secs: elapsed.as_secs_f64(),
        ticks_per_second: total_ticks as f64 / elapsed.as_secs_f64(),
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub episodes: u32,
    pub total_ticks: u64,
    pub final_population: usize,
    pub elapsed_secs: f64,
    pub ticks_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Episodes: {}", self.episodes)?;
        writeln!(f, "Ticks: {}", self.total_ticks)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} ticks/s", self.ticks_per_second)?;
        writeln!(f, "Final population: {}", self.final_population)?;
        Ok(())
    }
}
