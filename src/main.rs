//! savanna - CLI entry point
//!
//! Gene-table artificial-life simulation with episode-based evolution.

use clap::{Parser, Subcommand};
use savanna::archive::{Archive, TrainingState};
use savanna::evolution::Trainer;
use savanna::stats::TrainingHistory;
use savanna::{benchmark, Config, Species, World};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "savanna")]
#[command(version)]
#[command(about = "Gene-table artificial-life simulation with episode-based evolution")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train gene pools across simulation episodes
    Train {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of episodes (overrides the config)
        #[arg(short, long)]
        episodes: Option<u32>,

        /// Output directory for run artifacts
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Resume training from a saved state file
    Resume {
        /// Training state file (training_state.bin)
        #[arg(short, long)]
        state: PathBuf,

        /// Number of additional episodes
        #[arg(short, long, default_value = "10")]
        episodes: u32,
    },

    /// Run a single episode and print its statistics
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Seed animals from a persisted gene file
        #[arg(short, long)]
        genes: Option<PathBuf>,
    },

    /// Run a performance benchmark
    Benchmark {
        /// Number of episodes
        #[arg(short, long, default_value = "5")]
        episodes: u32,
    },

    /// Generate a default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Summarize a persisted gene file
    Inspect {
        /// Gene file (genes_NNNN.json)
        genes: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            config,
            episodes,
            output,
            seed,
            quiet,
        } => train(config, episodes, output, seed, quiet),

        Commands::Resume { state, episodes } => resume(state, episodes),

        Commands::Run {
            config,
            seed,
            genes,
        } => run_episode(config, seed, genes),

        Commands::Benchmark { episodes } => run_benchmark(episodes),

        Commands::Init { output } => generate_config(output),

        Commands::Inspect { genes } => inspect_genes(genes),
    }
}

fn load_config(path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        println!("Loading config from: {:?}", path);
        Config::from_file(path)
    } else {
        println!("Using default configuration");
        Ok(Config::default())
    }
}

fn train(
    config_path: PathBuf,
    episodes: Option<u32>,
    output: PathBuf,
    seed: Option<u64>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&config_path)?;
    let episodes = episodes.unwrap_or(config.training.episodes);

    std::fs::create_dir_all(&output)?;
    let archive = Archive::create(&output)?;

    let master_seed = seed.unwrap_or_else(rand::random);
    if seed.is_some() {
        println!("Using seed: {}", master_seed);
    }

    println!("Starting training");
    println!(
        "  Grid: {}x{}",
        config.grid.width, config.grid.height
    );
    println!(
        "  Animals: {} herbivores, {} carnivores, {} omnivores",
        config.population.herbivores, config.population.carnivores, config.population.omnivores
    );
    println!("  Episodes: {}", episodes);
    println!("  Artifacts: {:?}", archive.run_dir());
    println!();

    let mut trainer = Trainer::new(config.clone(), master_seed);
    run_training(&mut trainer, episodes, &archive, quiet)
}

fn resume(state_path: PathBuf, episodes: u32) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading training state: {:?}", state_path);
    let state = TrainingState::load(&state_path)?;

    let run_dir = state_path
        .parent()
        .ok_or("state file has no parent directory")?;
    let archive = Archive::open(run_dir)?;

    println!("Resumed at episode {}", state.episode);
    println!("Running {} additional episodes", episodes);
    println!();

    let mut trainer = Trainer::from_state(
        state.config.clone(),
        state.episode,
        state.master_seed,
        state.pools,
    );
    run_training(&mut trainer, episodes, &archive, false)
}

fn run_training(
    trainer: &mut Trainer,
    episodes: u32,
    archive: &Archive,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let stats_interval = trainer.config().logging.stats_interval;
    let mut history = TrainingHistory::new();
    let start = Instant::now();

    for _ in 0..episodes {
        let report = trainer.run_episode();
        archive.write_episode(&report.stats, &report.champions)?;

        if !quiet && report.episode % stats_interval == 0 {
            println!("{}", report.stats.summary());
        }
        history.record(report.stats);

        let state = TrainingState::new(
            trainer.episode(),
            trainer.master_seed(),
            trainer.config().clone(),
            trainer.pools().cloned(),
        );
        state.save(archive.state_path())?;
    }

    let history_path = archive.run_dir().join("history.json");
    history.save(history_path.to_str().ok_or("non-UTF-8 output path")?)?;

    let elapsed = start.elapsed();
    println!();
    println!("=== Training Complete ===");
    println!("Episodes: {}", episodes);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("History: {:?}", history_path);
    println!("State: {:?}", archive.state_path());

    Ok(())
}

fn run_episode(
    config_path: PathBuf,
    seed: Option<u64>,
    genes: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&config_path)?;
    let seed = seed.unwrap_or_else(rand::random);

    let pools = match genes {
        Some(path) => {
            println!("Seeding from gene file: {:?}", path);
            Some(Archive::load_genes(path)?)
        }
        None => None,
    };
    if let Some(pools) = &pools {
        for species in Species::ALL {
            let expected = config.species.params(species).vision_radius;
            if pools.tables(species).iter().any(|t| t.vision() != expected) {
                return Err(
                    format!("gene file vision radius does not match config for {species}").into(),
                );
            }
        }
    }

    let mut world = World::with_pools(&config, seed, pools.as_ref());
    println!("Initial population: {}", world.population());

    let start = Instant::now();
    let result = world.run();
    let elapsed = start.elapsed();

    let stats = savanna::stats::EpisodeStats::from_result(0, &result);
    println!();
    println!("=== Episode Complete ===");
    println!("Ticks: {}", result.ticks);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Final population: {}", world.population());
    println!("Plants: {}", world.grid.plant_count());
    for species in Species::ALL {
        if let Some(s) = stats.for_species(species) {
            println!(
                "{:10} n:{:5}  avg survival: {:6.1}  max: {:4}  top: {:?}",
                species.as_str(),
                s.count,
                s.mean_survival,
                s.max_survival,
                s.top
            );
        }
    }

    Ok(())
}

fn run_benchmark(episodes: u32) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== savanna Benchmark ===");
    println!("Episodes: {}", episodes);
    println!();

    let result = benchmark(episodes);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn inspect_genes(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Gene File Analysis ===");
    println!("File: {:?}", path);
    println!();

    let pools = Archive::load_genes(&path)?;

    for species in Species::ALL {
        let tables = pools.tables(species);
        println!("{}: {} table(s)", species, tables.len());

        for (index, table) in tables.iter().enumerate() {
            use std::collections::BTreeMap;
            let mut histogram: BTreeMap<&str, usize> = BTreeMap::new();
            for (_, action) in table.entries() {
                *histogram.entry(action.name()).or_insert(0) += 1;
            }
            println!(
                "  #{} vision: {}  entries: {}",
                index,
                table.vision(),
                table.len()
            );
            for (name, count) in histogram {
                println!("      {:20} {:5}", name, count);
            }
        }
        println!();
    }

    Ok(())
}
